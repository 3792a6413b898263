use crate::parse::{bytes::be_u8, combinators::map_res};
use crate::prelude::*;
use crate::serialize;
use bytes::{Bytes, BytesMut};
use std::fmt::Display;

pub const LEVEL_MAX: u8 = 99;
pub const LEVEL_UNKNOWN: u8 = 0xfe;
pub const LEVEL_ON: u8 = 0xff;

/// A level (0-99) as reported by a device
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelReport {
    Level(u8),
    Unknown,
}

impl TryFrom<u8> for LevelReport {
    type Error = TryFromReprError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            LEVEL_UNKNOWN => Ok(Self::Unknown),
            // Some devices report 0xff for "fully on"
            LEVEL_ON => Ok(Self::Level(LEVEL_MAX)),
            0..=LEVEL_MAX => Ok(Self::Level(value)),
            _ => Err(value.into()),
        }
    }
}

impl Display for LevelReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelReport::Level(level) => write!(f, "{}", level),
            LevelReport::Unknown => write!(f, "unknown"),
        }
    }
}

impl Parsable for LevelReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        map_res(be_u8, Self::try_from).parse(i)
    }
}

impl Serializable for LevelReport {
    fn serialize(&self, output: &mut BytesMut) {
        let val = match self {
            Self::Level(level) => *level,
            Self::Unknown => LEVEL_UNKNOWN,
        };
        serialize::bytes::be_u8(val).serialize(output)
    }
}

/// A level (0-99, 255) that is sent to a device
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelSet {
    Level(u8),
    /// Restore the last non-zero level
    On,
}

impl Canonical for LevelSet {
    fn to_canonical(&self) -> Self {
        match self {
            Self::Level(level) if *level <= LEVEL_MAX => *self,
            Self::Level(LEVEL_ON) => Self::On,
            Self::Level(_) => Self::Level(LEVEL_MAX),
            Self::On => Self::On,
        }
    }
}

impl TryFrom<u8> for LevelSet {
    type Error = TryFromReprError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            LEVEL_ON => Ok(Self::On),
            0..=LEVEL_MAX => Ok(Self::Level(value)),
            _ => Err(value.into()),
        }
    }
}

impl Display for LevelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelSet::Level(level) => write!(f, "{}", level),
            LevelSet::On => write!(f, "restore last level"),
        }
    }
}

impl Parsable for LevelSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        map_res(be_u8, Self::try_from).parse(i)
    }
}

impl Serializable for LevelSet {
    fn serialize(&self, output: &mut BytesMut) {
        let val = match self.to_canonical() {
            Self::Level(level) => level,
            Self::On => LEVEL_ON,
        };
        serialize::bytes::be_u8(val).serialize(output)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_level_report() {
        assert_eq!(LevelReport::try_from(0), Ok(LevelReport::Level(0)));
        assert_eq!(LevelReport::try_from(99), Ok(LevelReport::Level(99)));
        assert_eq!(LevelReport::try_from(100), Err(TryFromReprError(100)));
        assert_eq!(LevelReport::try_from(0xfe), Ok(LevelReport::Unknown));
        assert_eq!(LevelReport::try_from(0xff), Ok(LevelReport::Level(99)));
    }

    #[test]
    fn test_level_set_is_clamped() {
        assert_eq!(LevelSet::Level(150).as_bytes().as_ref(), &[99]);
        assert_eq!(LevelSet::Level(0xff).as_bytes().as_ref(), &[0xff]);
        assert_eq!(LevelSet::try_from(0xfe), Err(TryFromReprError(0xfe)));
    }
}
