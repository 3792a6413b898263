use crate::parse::{bytes::be_u8, combinators::map_res};
use crate::prelude::*;
use crate::serialize;
use bytes::{Bytes, BytesMut};
use num_traits::clamp;
use std::fmt::Display;

const MINUTES_MASK: u8 = 0b1000_0000;
const SECONDS_MASK: u8 = 0b0111_1111;

/// A transition duration that is sent to a device
#[derive(Default, Debug, Clone, Copy)]
pub enum DurationSet {
    Seconds(u8),
    Minutes(u8),
    #[default]
    Default,
}

impl DurationSet {
    /// Picks the most precise encoding for the given number of seconds
    pub fn from_secs(secs: u32) -> Self {
        if secs <= SECONDS_MASK as u32 {
            Self::Seconds(secs as u8)
        } else {
            let minutes = (secs as f32 / 60.0).round() as u32;
            Self::Minutes(clamp(minutes, 1, 127) as u8)
        }
    }
}

impl TryFrom<u8> for DurationSet {
    type Error = TryFromReprError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xff => Ok(Self::Default),
            0..=SECONDS_MASK => Ok(Self::Seconds(value)),
            _ => Ok(Self::Minutes((value & SECONDS_MASK) + 1)),
        }
    }
}

impl From<DurationSet> for u8 {
    fn from(value: DurationSet) -> Self {
        match value.to_canonical() {
            DurationSet::Seconds(seconds) => seconds & SECONDS_MASK,
            DurationSet::Minutes(minutes) => MINUTES_MASK | ((minutes - 1) & SECONDS_MASK),
            DurationSet::Default => 0xff,
        }
    }
}

impl Canonical for DurationSet {
    fn to_canonical(&self) -> Self {
        // 0..127 seconds or 1..127 minutes
        match self {
            Self::Default => Self::Default,
            Self::Minutes(m) => Self::Minutes(clamp(*m, 1, 127)),
            Self::Seconds(s) => Self::from_secs(*s as u32),
        }
    }
}

impl PartialEq for DurationSet {
    fn eq(&self, other: &Self) -> bool {
        u8::from(*self) == u8::from(*other)
    }
}

impl Parsable for DurationSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        map_res(be_u8, Self::try_from).parse(i)
    }
}

impl Serializable for DurationSet {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8((*self).into()).serialize(output)
    }
}

impl Display for DurationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seconds(s) => write!(f, "{}s", s),
            Self::Minutes(m) => write!(f, "{}min", m),
            Self::Default => write!(f, "default"),
        }
    }
}

/// A remaining duration as reported by a device
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum DurationReport {
    Seconds(u8),
    Minutes(u8),
    #[default]
    Unknown,
}

impl DurationReport {
    pub fn as_secs(&self) -> Option<u32> {
        match self {
            Self::Seconds(s) => Some(*s as u32),
            Self::Minutes(m) => Some(*m as u32 * 60),
            Self::Unknown => None,
        }
    }
}

impl TryFrom<u8> for DurationReport {
    type Error = TryFromReprError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xfe => Ok(Self::Unknown),
            // reserved
            0xff => Err(value.into()),
            0..=SECONDS_MASK => Ok(Self::Seconds(value)),
            _ => Ok(Self::Minutes((value & SECONDS_MASK) + 1)),
        }
    }
}

impl Parsable for DurationReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        map_res(be_u8, Self::try_from).parse(i)
    }
}

impl Serializable for DurationReport {
    fn serialize(&self, output: &mut BytesMut) {
        let raw = match self {
            Self::Seconds(s) => *s & SECONDS_MASK,
            Self::Minutes(m) => MINUTES_MASK | ((clamp(*m, 1, 126) - 1) & SECONDS_MASK),
            Self::Unknown => 0xfe,
        };
        serialize::bytes::be_u8(raw).serialize(output)
    }
}

impl Display for DurationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seconds(s) => write!(f, "{}s", s),
            Self::Minutes(m) => write!(f, "{}min", m),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
