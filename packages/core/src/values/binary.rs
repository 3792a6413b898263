use crate::parse::{bytes::be_u8, combinators::map_res};
use crate::prelude::*;
use crate::serialize;
use bytes::{Bytes, BytesMut};
use std::fmt::Display;

// All values from 1 to BINARY_SET_MAX are interpreted as ON in SET commands
pub const BINARY_SET_MAX: u8 = 99;
pub const BINARY_UNKNOWN: u8 = 0xfe;
pub const BINARY_ON: u8 = 0xff;

/// A binary state as reported by a device
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum BinaryReport {
    Off = 0,
    Unknown = BINARY_UNKNOWN,
    On = BINARY_ON,
}

impl TryFrom<u8> for BinaryReport {
    type Error = TryFromReprError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            BINARY_UNKNOWN => Ok(Self::Unknown),
            BINARY_ON => Ok(Self::On),
            _ => Err(value.into()),
        }
    }
}

impl Display for BinaryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::On => write!(f, "on"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl Parsable for BinaryReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        map_res(be_u8, Self::try_from).parse(i)
    }
}

impl Serializable for BinaryReport {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(*self as u8).serialize(output)
    }
}

impl From<bool> for BinaryReport {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<BinaryReport> for Option<bool> {
    fn from(value: BinaryReport) -> Self {
        match value {
            BinaryReport::On => Some(true),
            BinaryReport::Off => Some(false),
            BinaryReport::Unknown => None,
        }
    }
}

/// A binary state that is sent to a device
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum BinarySet {
    Off = 0,
    On = BINARY_ON,
}

impl TryFrom<u8> for BinarySet {
    type Error = TryFromReprError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1..=BINARY_SET_MAX | BINARY_ON => Ok(Self::On),
            _ => Err(value.into()),
        }
    }
}

impl Parsable for BinarySet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        map_res(be_u8, Self::try_from).parse(i)
    }
}

impl Serializable for BinarySet {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(*self as u8).serialize(output)
    }
}

impl From<bool> for BinarySet {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<BinarySet> for bool {
    fn from(value: BinarySet) -> Self {
        matches!(value, BinarySet::On)
    }
}

impl From<LevelReport> for BinaryReport {
    fn from(value: LevelReport) -> Self {
        match value {
            LevelReport::Level(0) => Self::Off,
            LevelReport::Level(_) => Self::On,
            LevelReport::Unknown => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_binary_report() {
        assert_eq!(BinaryReport::try_from(0), Ok(BinaryReport::Off));
        assert_eq!(BinaryReport::try_from(1), Err(TryFromReprError(1)));
        assert_eq!(BinaryReport::try_from(99), Err(TryFromReprError(99)));
        assert_eq!(BinaryReport::try_from(0xfe), Ok(BinaryReport::Unknown));
        assert_eq!(BinaryReport::try_from(0xff), Ok(BinaryReport::On));
    }

    #[test]
    fn test_binary_set() {
        assert_eq!(BinarySet::try_from(0), Ok(BinarySet::Off));
        assert_eq!(BinarySet::try_from(1), Ok(BinarySet::On));
        assert_eq!(BinarySet::try_from(99), Ok(BinarySet::On));
        assert_eq!(BinarySet::try_from(100), Err(TryFromReprError(100)));
        assert_eq!(BinarySet::try_from(0xff), Ok(BinarySet::On));
        assert_eq!(BinarySet::from(true).as_bytes().as_ref(), &[0xff]);
    }

    #[test]
    fn test_level_to_binary() {
        assert_eq!(BinaryReport::from(LevelReport::Level(0)), BinaryReport::Off);
        assert_eq!(BinaryReport::from(LevelReport::Level(42)), BinaryReport::On);
        assert_eq!(
            Option::<bool>::from(BinaryReport::from(LevelReport::Unknown)),
            None
        );
    }
}
