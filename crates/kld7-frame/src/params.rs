//! Layout of the radar parameter structure (`RPST` payload).
//!
//! The record is 42 bytes: a 19-byte version string followed by 22
//! parameter slots of one or two bytes each. The slot table is an explicit
//! constant; nothing depends on declaration order elsewhere.

use crate::error::{ExpectedLength, FrameError, Result};
use crate::tag::Tag;

/// Size of the `RPST` payload.
pub const PARAM_RECORD_SIZE: usize = 42;
/// Size of the leading version field.
pub const VERSION_FIELD_SIZE: usize = 19;
/// Number of named parameters.
pub const PARAM_COUNT: usize = 22;

/// Storage width and signedness of a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U8,
    I8,
    U16,
}

impl FieldWidth {
    pub const fn size(self) -> usize {
        match self {
            FieldWidth::U8 | FieldWidth::I8 => 1,
            FieldWidth::U16 => 2,
        }
    }
}

/// One named slot of the parameter structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamField {
    /// Four-letter name, identical to the command that sets it.
    pub name: &'static str,
    pub description: &'static str,
    /// Byte offset within the `RPST` record.
    pub offset: usize,
    pub width: FieldWidth,
}

impl ParamField {
    const fn new(name: &'static str, description: &'static str, offset: usize, width: FieldWidth) -> Self {
        Self {
            name,
            description,
            offset,
            width,
        }
    }

    /// Command tag that writes this parameter.
    pub fn command(&self) -> Tag {
        Tag::from_bytes(*self.name.as_bytes().first_chunk::<4>().unwrap_or(b"????"))
    }

    fn read(&self, record: &[u8; PARAM_RECORD_SIZE]) -> i32 {
        let at = self.offset;
        match self.width {
            FieldWidth::U8 => i32::from(record[at]),
            FieldWidth::I8 => i32::from(record[at] as i8),
            FieldWidth::U16 => i32::from(u16::from_le_bytes([record[at], record[at + 1]])),
        }
    }
}

/// The parameter slots in record order.
pub const PARAM_FIELDS: [ParamField; PARAM_COUNT] = [
    ParamField::new("RBFR", "Base frequency", 19, FieldWidth::U8),
    ParamField::new("RSPI", "Maximum speed", 20, FieldWidth::U8),
    ParamField::new("RRAI", "Maximum range", 21, FieldWidth::U8),
    ParamField::new("THOF", "Threshold offset", 22, FieldWidth::U8),
    ParamField::new("TRFT", "Tracking filter type", 23, FieldWidth::U8),
    ParamField::new("VISU", "Vibration suppression", 24, FieldWidth::U8),
    ParamField::new("MIRA", "Min detection distance", 25, FieldWidth::U8),
    ParamField::new("MARA", "Max detection distance", 26, FieldWidth::U8),
    ParamField::new("MIAN", "Min detection angle", 27, FieldWidth::I8),
    ParamField::new("MAAN", "Max detection angle", 28, FieldWidth::I8),
    ParamField::new("MISP", "Min detection speed", 29, FieldWidth::U8),
    ParamField::new("MASP", "Max detection speed", 30, FieldWidth::U8),
    ParamField::new("DEDI", "Detection direction", 31, FieldWidth::U8),
    ParamField::new("RATH", "Range threshold", 32, FieldWidth::U8),
    ParamField::new("ANTH", "Angle threshold", 33, FieldWidth::I8),
    ParamField::new("SPTH", "Speed threshold", 34, FieldWidth::U8),
    ParamField::new("DIG1", "Digital output 1", 35, FieldWidth::U8),
    ParamField::new("DIG2", "Digital output 2", 36, FieldWidth::U8),
    ParamField::new("DIG3", "Digital output 3", 37, FieldWidth::U8),
    ParamField::new("HOLD", "Hold time", 38, FieldWidth::U16),
    ParamField::new("MIDE", "Micro detection retrigger", 40, FieldWidth::U8),
    ParamField::new("MIDS", "Micro detection sensitivity", 41, FieldWidth::U8),
];

/// Index of a parameter by name (case-insensitive).
pub fn field_index(name: &str) -> Option<usize> {
    PARAM_FIELDS
        .iter()
        .position(|field| field.name.eq_ignore_ascii_case(name))
}

/// Decoded radar parameter structure.
///
/// The default value is an all-zero record with an empty version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadarParameters {
    version: String,
    values: [i32; PARAM_COUNT],
}

impl RadarParameters {
    /// Decode an `RPST` payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let record: &[u8; PARAM_RECORD_SIZE] =
            payload
                .try_into()
                .map_err(|_| FrameError::PayloadLength {
                    tag: Tag::RPST,
                    expected: ExpectedLength::Exact(PARAM_RECORD_SIZE),
                    actual: payload.len(),
                })?;

        let version_bytes = &record[..VERSION_FIELD_SIZE];
        let end = version_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_FIELD_SIZE);
        let version = String::from_utf8_lossy(&version_bytes[..end]).into_owned();

        let values = PARAM_FIELDS.map(|field| field.read(record));
        Ok(Self { version, values })
    }

    /// Version string from the leading field, NUL padding stripped.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Value of a parameter by name.
    pub fn get(&self, name: &str) -> Option<i32> {
        field_index(name).map(|i| self.values[i])
    }

    /// Overwrite a cached value. Returns false for an unknown name.
    pub fn set(&mut self, name: &str, value: i32) -> bool {
        match field_index(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// All fields with their values, in record order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static ParamField, i32)> + '_ {
        PARAM_FIELDS.iter().zip(self.values.iter().copied())
    }
}
