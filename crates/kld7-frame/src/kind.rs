//! Data frame kinds and the request bitmask sent with `GNFD`.
//!
//! The sensor answers a `GNFD` request with one packet per requested kind,
//! in bit order, optionally ending early with a `DONE` marker.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::error::FrameError;
use crate::tag::Tag;

/// A single kind of data frame the sensor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Raw ADC samples (`RADC`).
    RawAdc,
    /// Raw FFT output (`RFFT`).
    RawFft,
    /// Candidate target list (`PDAT`).
    Targets,
    /// Tracked, most significant target (`TDAT`).
    TrackedTarget,
    /// Detection flags (`DDAT`).
    Detection,
    /// End-of-cycle marker with frame counter (`DONE`).
    Done,
}

impl FrameKind {
    /// All kinds in wire bit order.
    pub const ALL: [FrameKind; 6] = [
        FrameKind::RawAdc,
        FrameKind::RawFft,
        FrameKind::Targets,
        FrameKind::TrackedTarget,
        FrameKind::Detection,
        FrameKind::Done,
    ];

    /// Bit of this kind in the `GNFD` request mask.
    pub const fn bit(self) -> u32 {
        match self {
            FrameKind::RawAdc => 1 << 0,
            FrameKind::RawFft => 1 << 1,
            FrameKind::Targets => 1 << 2,
            FrameKind::TrackedTarget => 1 << 3,
            FrameKind::Detection => 1 << 4,
            FrameKind::Done => 1 << 5,
        }
    }

    /// Tag of the packet carrying this kind.
    pub const fn tag(self) -> Tag {
        match self {
            FrameKind::RawAdc => Tag::RADC,
            FrameKind::RawFft => Tag::RFFT,
            FrameKind::Targets => Tag::PDAT,
            FrameKind::TrackedTarget => Tag::TDAT,
            FrameKind::Detection => Tag::DDAT,
            FrameKind::Done => Tag::DONE,
        }
    }

    /// Kind carried by a packet tag, if any.
    pub fn from_tag(tag: Tag) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for FrameKind {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = Tag::command(s.trim())?;
        Self::from_tag(tag).ok_or_else(|| FrameError::UnsupportedFrameTag(tag))
    }
}

/// A set of [`FrameKind`]s, encoded as the `GNFD` request bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameKinds(u32);

impl FrameKinds {
    /// The empty set.
    pub const EMPTY: FrameKinds = FrameKinds(0);

    /// Build a set from raw mask bits, ignoring bits with no defined kind.
    pub fn from_bits_truncate(bits: u32) -> Self {
        let defined = FrameKind::ALL.iter().fold(0, |acc, kind| acc | kind.bit());
        Self(bits & defined)
    }

    /// Raw mask bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Number of packets the sensor sends for this request.
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, kind: FrameKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: FrameKind) {
        self.0 |= kind.bit();
    }

    /// Kinds in this set, in wire order.
    pub fn iter(self) -> impl Iterator<Item = FrameKind> {
        FrameKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl From<FrameKind> for FrameKinds {
    fn from(kind: FrameKind) -> Self {
        Self(kind.bit())
    }
}

impl FromIterator<FrameKind> for FrameKinds {
    fn from_iter<I: IntoIterator<Item = FrameKind>>(iter: I) -> Self {
        let mut kinds = FrameKinds::EMPTY;
        for kind in iter {
            kinds.insert(kind);
        }
        kinds
    }
}

impl BitOr for FrameKind {
    type Output = FrameKinds;

    fn bitor(self, rhs: FrameKind) -> FrameKinds {
        FrameKinds(self.bit() | rhs.bit())
    }
}

impl BitOr<FrameKind> for FrameKinds {
    type Output = FrameKinds;

    fn bitor(self, rhs: FrameKind) -> FrameKinds {
        FrameKinds(self.0 | rhs.bit())
    }
}

impl BitOrAssign<FrameKind> for FrameKinds {
    fn bitor_assign(&mut self, rhs: FrameKind) {
        self.insert(rhs);
    }
}

/// Parses a comma-separated list of tags, e.g. `pdat,tdat,done`.
impl FromStr for FrameKinds {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<FrameKind>)
            .collect()
    }
}

impl fmt::Display for FrameKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for kind in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{kind}")?;
            first = false;
        }
        Ok(())
    }
}
