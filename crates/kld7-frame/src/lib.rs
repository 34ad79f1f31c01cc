//! Packet framing and frame decoding for the K-LD7 radar sensor.
//!
//! Every packet on the wire, in either direction, is:
//! - A 4-byte ASCII tag (`INIT`, `RESP`, `PDAT`, ...)
//! - A 4-byte little-endian payload length
//! - `length` bytes of payload
//!
//! This crate owns that codec, the fixed little-endian layouts of each data
//! frame and of the radar parameter structure, and the tag-driven decoder
//! that turns a raw packet into a typed value.

pub mod codec;
pub mod decode;
pub mod error;
pub mod kind;
pub mod layout;
pub mod params;
pub mod reader;
pub mod tag;
pub mod writer;

pub use codec::{
    decode_header, encode_command, CommandPayload, FrameConfig, Packet, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE,
};
pub use decode::{decode_frame, FrameData};
pub use error::{ExpectedLength, FrameError, Result};
pub use kind::{FrameKind, FrameKinds};
pub use layout::{Detection, Direction, RawAdcFrame, RawFftFrame, Side, Target};
pub use params::{FieldWidth, ParamField, RadarParameters, PARAM_COUNT, PARAM_FIELDS};
pub use reader::PacketReader;
pub use tag::Tag;
pub use writer::PacketWriter;
