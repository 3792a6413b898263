use thiserror::Error;
use zwave_core::parse::ParseError;
use zwave_core::prelude::*;
use zwave_serial::error::CodecError;

/// A send or wait did not complete. These are expected and absorbed by the back-off schedules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransmitError {
    #[error("Operation timed out")]
    Timeout,
    #[error("The node did not acknowledge the message")]
    NoAck,
    #[error("The node did not reply")]
    NoReply,
    #[error("The controller is not connected")]
    Disconnected,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Conditions that need an administrator's attention
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("A unit named {0:?} already exists")]
    DuplicateName(String),
    #[error("{0} is already tracked")]
    DuplicateNodeId(NodeId),
    #[error("{0} is not tracked")]
    UnknownUnit(NodeId),
    #[error("Unknown unit handler {0:?}")]
    UnknownHandler(String),
    #[error("Unknown command class {0:?}")]
    UnknownClass(String),
    #[error("{0} is readable, but cannot be queried")]
    NoQuery(CommandClasses),
    #[error("{handler} requires the {class} command class")]
    MissingClass {
        handler: &'static str,
        class: CommandClasses,
    },
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("Unknown option {0:?}")]
    UnknownOption(String),
    #[error("No device info for manufacturer ids {0}")]
    NoDeviceInfo(String),
    #[error("Device catalog: {0}")]
    Catalog(String),
}

/// Persisted data could not be read back
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    #[error("Expected marker {expected:#04x}, found {found:#04x}")]
    BadMarker { expected: u8, found: u8 },
    #[error("Format version {found} is newer than the supported version {max}")]
    VersionTooHigh { found: u16, max: u16 },
    #[error("Invalid data: {0}")]
    Invalid(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Transmit(#[from] TransmitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

pub type Result<T> = std::result::Result<T, Error>;
