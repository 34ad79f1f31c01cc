use bytes::Bytes;

use crate::codec::Packet;
use crate::error::{FrameError, Result};
use crate::layout::{
    unpack_detection, unpack_raw_adc, unpack_raw_fft, unpack_targets, unpack_tracked_target,
    Detection, RawAdcFrame, RawFftFrame, Target,
};
use crate::tag::Tag;

/// A decoded packet, typed by its tag.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameData {
    /// `RADC`: raw ADC samples.
    RawAdc(Box<RawAdcFrame>),
    /// `RFFT`: raw FFT output.
    RawFft(Box<RawFftFrame>),
    /// `PDAT`: candidate targets, possibly none.
    Targets(Vec<Target>),
    /// `TDAT`: the tracked target, or `None` when nothing is tracked.
    TrackedTarget(Option<Target>),
    /// `DDAT`: detection flags.
    Detection(Detection),
    /// `DONE`: end-of-cycle marker; payload left uninterpreted.
    Done(Bytes),
    /// `RESP` or `RPST`, passed through untouched.
    Other(Packet),
}

impl FrameData {
    /// Tag of the packet this value came from.
    pub fn tag(&self) -> Tag {
        match self {
            FrameData::RawAdc(_) => Tag::RADC,
            FrameData::RawFft(_) => Tag::RFFT,
            FrameData::Targets(_) => Tag::PDAT,
            FrameData::TrackedTarget(_) => Tag::TDAT,
            FrameData::Detection(_) => Tag::DDAT,
            FrameData::Done(_) => Tag::DONE,
            FrameData::Other(packet) => packet.tag,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, FrameData::Done(_))
    }
}

/// Decode a packet payload according to its tag.
///
/// Data frame tags are unpacked into typed values. `RESP`, `RPST` and
/// `DONE` are handed back with their payload unmodified. Any other tag has
/// no known layout and is rejected.
pub fn decode_frame(tag: Tag, payload: Bytes) -> Result<FrameData> {
    let data = match tag {
        Tag::RADC => FrameData::RawAdc(unpack_raw_adc(&payload)?),
        Tag::RFFT => FrameData::RawFft(unpack_raw_fft(&payload)?),
        Tag::PDAT => FrameData::Targets(unpack_targets(&payload)?),
        Tag::TDAT => FrameData::TrackedTarget(unpack_tracked_target(&payload)?),
        Tag::DDAT => FrameData::Detection(unpack_detection(&payload)?),
        Tag::DONE => FrameData::Done(payload),
        Tag::RESP | Tag::RPST => FrameData::Other(Packet { tag, payload }),
        other => return Err(FrameError::UnsupportedFrameTag(other)),
    };
    Ok(data)
}

impl TryFrom<Packet> for FrameData {
    type Error = FrameError;

    fn try_from(packet: Packet) -> Result<Self> {
        decode_frame(packet.tag, packet.payload)
    }
}
