//! Fixed little-endian layouts of the sensor's data frames.
//!
//! Every routine here takes the payload of exactly one frame. A payload of
//! the wrong size is a [`FrameError::PayloadLength`]; nothing is padded or
//! truncated.

use bytes::Buf;

use crate::error::{ExpectedLength, FrameError, Result};
use crate::tag::Tag;

/// Samples per half-buffer in `RADC` and bins per half in `RFFT`.
pub const SAMPLES_PER_HALF: usize = 256;
/// ADC channels in a `RADC` frame.
pub const RAW_ADC_CHANNELS: usize = 3;
/// `RADC` payload: 1536 × u16.
pub const RAW_ADC_PAYLOAD_SIZE: usize = RAW_ADC_CHANNELS * 2 * SAMPLES_PER_HALF * 2;
/// `RFFT` payload: 512 × u16.
pub const RAW_FFT_PAYLOAD_SIZE: usize = 2 * SAMPLES_PER_HALF * 2;
/// One `PDAT`/`TDAT` target record: u16, i16, i16, u16.
pub const TARGET_RECORD_SIZE: usize = 8;
/// `DDAT` payload: six flag bytes.
pub const DETECTION_PAYLOAD_SIZE: usize = 6;

/// A target reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Target {
    /// Distance in meters.
    pub distance: f64,
    /// Speed in km/h. Positive is receding, negative is approaching.
    pub speed: f64,
    /// Angle in degrees.
    pub angle: f64,
    /// Signal magnitude, unscaled.
    pub magnitude: f64,
}

impl Target {
    /// Build a target from its packed record fields.
    ///
    /// Distance, speed and angle are stored in hundredths.
    pub fn from_raw(distance: u16, speed: i16, angle: i16, magnitude: u16) -> Self {
        Self {
            distance: f64::from(distance) / 100.0,
            speed: f64::from(speed) / 100.0,
            angle: f64::from(angle) / 100.0,
            magnitude: f64::from(magnitude),
        }
    }

    pub fn is_approaching(&self) -> bool {
        self.speed < 0.0
    }
}

/// Which side of the sensor axis a detection is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Side {
    Left,
    Right,
}

/// Direction of travel relative to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Direction {
    Approaching,
    Receding,
}

/// The six `DDAT` detection flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Detection {
    /// A target passed the detection filters.
    pub detection: bool,
    /// Micro (small movement) detection.
    pub micro_detection: bool,
    /// Angle flag: false = left, true = right.
    pub angle: bool,
    /// Direction flag: false = approaching, true = receding.
    pub direction: bool,
    /// Range threshold flag.
    pub range: bool,
    /// Speed threshold flag.
    pub speed: bool,
}

impl Detection {
    pub fn side(&self) -> Side {
        if self.angle {
            Side::Right
        } else {
            Side::Left
        }
    }

    pub fn direction_of_travel(&self) -> Direction {
        if self.direction {
            Direction::Receding
        } else {
            Direction::Approaching
        }
    }
}

/// Raw ADC samples: 3 channels × 2 half-buffers × 256 samples.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RawAdcFrame {
    #[cfg_attr(feature = "serde", serde(with = "grid3"))]
    pub channels: [[[u16; SAMPLES_PER_HALF]; 2]; RAW_ADC_CHANNELS],
}

impl RawAdcFrame {
    pub fn sample(&self, channel: usize, half: usize, index: usize) -> u16 {
        self.channels[channel][half][index]
    }
}

impl std::fmt::Debug for RawAdcFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawAdcFrame")
            .field("channels", &RAW_ADC_CHANNELS)
            .field("samples_per_half", &SAMPLES_PER_HALF)
            .finish()
    }
}

/// Raw FFT output: 2 halves × 256 bins.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RawFftFrame {
    #[cfg_attr(feature = "serde", serde(with = "grid2"))]
    pub halves: [[u16; SAMPLES_PER_HALF]; 2],
}

impl RawFftFrame {
    pub fn bin(&self, half: usize, index: usize) -> u16 {
        self.halves[half][index]
    }
}

impl std::fmt::Debug for RawFftFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFftFrame")
            .field("bins_per_half", &SAMPLES_PER_HALF)
            .finish()
    }
}

fn check_len(tag: Tag, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() != expected {
        return Err(FrameError::PayloadLength {
            tag,
            expected: ExpectedLength::Exact(expected),
            actual: payload.len(),
        });
    }
    Ok(())
}

fn read_half(src: &mut &[u8]) -> [u16; SAMPLES_PER_HALF] {
    let mut half = [0u16; SAMPLES_PER_HALF];
    for slot in half.iter_mut() {
        *slot = src.get_u16_le();
    }
    half
}

/// Unpack a `RADC` payload.
pub fn unpack_raw_adc(payload: &[u8]) -> Result<Box<RawAdcFrame>> {
    check_len(Tag::RADC, payload, RAW_ADC_PAYLOAD_SIZE)?;
    let mut src = payload;
    let mut frame = Box::new(RawAdcFrame {
        channels: [[[0; SAMPLES_PER_HALF]; 2]; RAW_ADC_CHANNELS],
    });
    for channel in frame.channels.iter_mut() {
        for half in channel.iter_mut() {
            *half = read_half(&mut src);
        }
    }
    Ok(frame)
}

/// Unpack a `RFFT` payload.
pub fn unpack_raw_fft(payload: &[u8]) -> Result<Box<RawFftFrame>> {
    check_len(Tag::RFFT, payload, RAW_FFT_PAYLOAD_SIZE)?;
    let mut src = payload;
    let first = read_half(&mut src);
    let second = read_half(&mut src);
    Ok(Box::new(RawFftFrame {
        halves: [first, second],
    }))
}

fn read_target(src: &mut &[u8]) -> Target {
    let distance = src.get_u16_le();
    let speed = src.get_i16_le();
    let angle = src.get_i16_le();
    let magnitude = src.get_u16_le();
    Target::from_raw(distance, speed, angle, magnitude)
}

/// Unpack a `PDAT` payload: zero or more target records.
pub fn unpack_targets(payload: &[u8]) -> Result<Vec<Target>> {
    if payload.len() % TARGET_RECORD_SIZE != 0 {
        return Err(FrameError::PayloadLength {
            tag: Tag::PDAT,
            expected: ExpectedLength::MultipleOf(TARGET_RECORD_SIZE),
            actual: payload.len(),
        });
    }
    let mut src = payload;
    let mut targets = Vec::with_capacity(payload.len() / TARGET_RECORD_SIZE);
    while src.has_remaining() {
        targets.push(read_target(&mut src));
    }
    Ok(targets)
}

/// Unpack a `TDAT` payload: no target, or exactly one.
pub fn unpack_tracked_target(payload: &[u8]) -> Result<Option<Target>> {
    if payload.is_empty() {
        return Ok(None);
    }
    check_len(Tag::TDAT, payload, TARGET_RECORD_SIZE)?;
    let mut src = payload;
    Ok(Some(read_target(&mut src)))
}

/// Unpack a `DDAT` payload.
pub fn unpack_detection(payload: &[u8]) -> Result<Detection> {
    check_len(Tag::DDAT, payload, DETECTION_PAYLOAD_SIZE)?;
    Ok(Detection {
        detection: payload[0] != 0,
        micro_detection: payload[1] != 0,
        angle: payload[2] != 0,
        direction: payload[3] != 0,
        range: payload[4] != 0,
        speed: payload[5] != 0,
    })
}

#[cfg(feature = "serde")]
mod grid2 {
    use serde::ser::{SerializeSeq, Serializer};

    pub fn serialize<S: Serializer>(grid: &[[u16; 256]; 2], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(grid.len()))?;
        for half in grid {
            seq.serialize_element(&half[..])?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
mod grid3 {
    use serde::ser::{SerializeSeq, Serializer};

    pub fn serialize<S: Serializer>(grid: &[[[u16; 256]; 2]; 3], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(grid.len()))?;
        for channel in grid {
            let halves: [&[u16]; 2] = [&channel[0][..], &channel[1][..]];
            seq.serialize_element(&halves)?;
        }
        seq.end()
    }
}
