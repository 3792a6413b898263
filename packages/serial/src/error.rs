use thiserror::Error;
use zwave_core::parse::ParseError;

/// Failures of the message codec. Malformed frames never get this far,
/// they are rejected while parsing [`CommandRaw`](crate::command_raw::CommandRaw).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Parser error: {0}")]
    Parse(#[from] ParseError),
    #[error("message does not carry a command class")]
    NotACcMessage,
    #[error("S0 decryption failed: {0}")]
    DecryptFailed(String),
    #[error("no network key is set")]
    NoNetworkKey,
    #[error("S0 encryption failed: {0}")]
    EncryptFailed(String),
    #[error("invalid message state: {0}")]
    InvalidState(&'static str),
}

pub type Result<T> = std::result::Result<T, CodecError>;
