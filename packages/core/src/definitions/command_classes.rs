use crate::parse::{
    Parsable, ParseResult, TryFromReprError,
    bytes::be_u8,
    combinators::{context, map_res},
};
use crate::prelude::Parser;
use crate::serialize::{self, Serializable};
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use std::{fmt::Display, str::FromStr};

/// The command classes this engine knows about. Others are passed through as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive)]
#[repr(u8)]
pub enum CommandClasses {
    NoOperation = 0x00,
    Basic = 0x20,
    BinarySwitch = 0x25,
    MultilevelSwitch = 0x26,
    SceneActivation = 0x2b,
    BinarySensor = 0x30,
    CentralScene = 0x5b,
    MultiChannel = 0x60,
    DoorLock = 0x62,
    Configuration = 0x70,
    Notification = 0x71,
    ManufacturerSpecific = 0x72,
    Battery = 0x80,
    WakeUp = 0x84,
    Association = 0x85,
    Version = 0x86,
    MultiChannelAssociation = 0x8e,
    Security = 0x98,
}

const NAMES: &[(CommandClasses, &str)] = &[
    (CommandClasses::NoOperation, "NoOperation"),
    (CommandClasses::Basic, "Basic"),
    (CommandClasses::BinarySwitch, "BinarySwitch"),
    (CommandClasses::MultilevelSwitch, "MultilevelSwitch"),
    (CommandClasses::SceneActivation, "SceneActivation"),
    (CommandClasses::BinarySensor, "BinarySensor"),
    (CommandClasses::CentralScene, "CentralScene"),
    (CommandClasses::MultiChannel, "MultiChannel"),
    (CommandClasses::DoorLock, "DoorLock"),
    (CommandClasses::Configuration, "Configuration"),
    (CommandClasses::Notification, "Notification"),
    (CommandClasses::ManufacturerSpecific, "ManufacturerSpecific"),
    (CommandClasses::Battery, "Battery"),
    (CommandClasses::WakeUp, "WakeUp"),
    (CommandClasses::Association, "Association"),
    (CommandClasses::Version, "Version"),
    (CommandClasses::MultiChannelAssociation, "MultiChannelAssociation"),
    (CommandClasses::Security, "Security"),
];

impl CommandClasses {
    pub fn name(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(cc, _)| cc == self)
            .map(|(_, name)| *name)
            .unwrap_or("Unknown")
    }

    /// Classes that only manage the transport or the node itself and are never
    /// represented by fields
    pub fn is_management(&self) -> bool {
        matches!(
            self,
            Self::NoOperation
                | Self::MultiChannel
                | Self::Configuration
                | Self::ManufacturerSpecific
                | Self::WakeUp
                | Self::Association
                | Self::Version
                | Self::MultiChannelAssociation
                | Self::Security
        )
    }
}

impl From<CommandClasses> for u8 {
    fn from(cc: CommandClasses) -> Self {
        cc as u8
    }
}

impl Display for CommandClasses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown command class name: {0}")]
pub struct UnknownCommandClass(pub String);

impl FromStr for CommandClasses {
    type Err = UnknownCommandClass;

    /// Accepts the class name (case-insensitive) or its id in hex notation (`0x25`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u8::from_str_radix(hex, 16)
                .ok()
                .and_then(|id| Self::try_from(id).ok())
                .ok_or_else(|| UnknownCommandClass(s.to_string()));
        }
        NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(cc, _)| *cc)
            .ok_or_else(|| UnknownCommandClass(s.to_string()))
    }
}

impl Parsable for CommandClasses {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        context(
            "CommandClasses",
            map_res(be_u8, |x| {
                CommandClasses::try_from(x).map_err(TryFromReprError::from)
            }),
        )
        .parse(i)
    }
}

impl Serializable for CommandClasses {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(*self as u8).serialize(output)
    }
}
