use bytes::{BufMut, Bytes, BytesMut};

use crate::tag::Tag;

/// Packet header: tag (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Default maximum accepted payload size: 8 KiB.
///
/// The largest defined frame (`RADC`) is 3072 bytes, so anything much
/// bigger is line noise rather than a frame.
pub const DEFAULT_MAX_PAYLOAD: usize = 8 * 1024;

/// A tagged packet as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The packet tag.
    pub tag: Tag,
    /// The packet payload.
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(tag: Tag, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }
}

/// Payload of an outgoing command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandPayload {
    /// No payload; the header carries length 0.
    #[default]
    Empty,
    /// A 32-bit value, sent little-endian.
    U32(u32),
    /// Raw payload bytes.
    Bytes(Bytes),
}

impl CommandPayload {
    fn len(&self) -> usize {
        match self {
            CommandPayload::Empty => 0,
            CommandPayload::U32(_) => 4,
            CommandPayload::Bytes(bytes) => bytes.len(),
        }
    }
}

impl From<u32> for CommandPayload {
    fn from(value: u32) -> Self {
        CommandPayload::U32(value)
    }
}

/// Signed values travel as their two's-complement 32-bit pattern.
impl From<i32> for CommandPayload {
    fn from(value: i32) -> Self {
        CommandPayload::U32(value as u32)
    }
}

impl From<Bytes> for CommandPayload {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            CommandPayload::Empty
        } else {
            CommandPayload::Bytes(bytes)
        }
    }
}

impl From<&[u8]> for CommandPayload {
    fn from(bytes: &[u8]) -> Self {
        Bytes::copy_from_slice(bytes).into()
    }
}

impl From<()> for CommandPayload {
    fn from(_: ()) -> Self {
        CommandPayload::Empty
    }
}

/// Encode a command packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────────┐
/// │ Tag (4B)     │ Length       │ Payload          │
/// │ ASCII, upper │ (4B LE)      │ (Length bytes)   │
/// └──────────────┴──────────────┴──────────────────┘
/// ```
pub fn encode_command(tag: Tag, payload: &CommandPayload, dst: &mut BytesMut) {
    let len = payload.len();
    dst.reserve(HEADER_SIZE + len);
    dst.put_slice(tag.as_bytes());
    dst.put_u32_le(len as u32);
    match payload {
        CommandPayload::Empty => {}
        CommandPayload::U32(value) => dst.put_u32_le(*value),
        CommandPayload::Bytes(bytes) => dst.put_slice(bytes),
    }
}

/// Split an 8-byte header into its tag and declared payload length.
pub fn decode_header(header: &[u8; HEADER_SIZE]) -> (Tag, u32) {
    let tag = Tag::from_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (tag, length)
}

/// Configuration for packet reading.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted payload size in bytes. Default: 8 KiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
