use std::fmt;
use std::str::FromStr;

use crate::error::FrameError;

/// A 4-byte packet tag.
///
/// Command tags are upper-cased when built from a name; tags read off the
/// wire are kept byte-for-byte and compared exactly.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag([u8; 4]);

impl Tag {
    // Commands sent by the host.
    pub const INIT: Tag = Tag(*b"INIT");
    pub const GRPS: Tag = Tag(*b"GRPS");
    pub const GNFD: Tag = Tag(*b"GNFD");
    pub const GBYE: Tag = Tag(*b"GBYE");

    // Packets sent by the sensor.
    pub const RESP: Tag = Tag(*b"RESP");
    pub const RPST: Tag = Tag(*b"RPST");
    pub const RADC: Tag = Tag(*b"RADC");
    pub const RFFT: Tag = Tag(*b"RFFT");
    pub const PDAT: Tag = Tag(*b"PDAT");
    pub const TDAT: Tag = Tag(*b"TDAT");
    pub const DDAT: Tag = Tag(*b"DDAT");
    pub const DONE: Tag = Tag(*b"DONE");

    /// Wrap raw tag bytes as received.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Raw tag bytes.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Build a command tag from a name, upper-casing it.
    pub fn command(name: &str) -> Result<Self, FrameError> {
        let bytes: [u8; 4] = name
            .as_bytes()
            .try_into()
            .map_err(|_| FrameError::InvalidTag(name.to_string()))?;
        if !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(FrameError::InvalidTag(name.to_string()));
        }
        Ok(Self(bytes.map(|b| b.to_ascii_uppercase())))
    }
}

impl FromStr for Tag {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::command(s)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
