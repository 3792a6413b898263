pub use crate::definitions::*;
pub use crate::log::{
    FlattenLog, LogPayload, LogPayloadDict, LogPayloadText, Loglevel, ToLogPayload,
};
pub use crate::parse::{Parsable, ParseError, ParseResult, Parser, TryFromReprError};
pub use crate::serialize::Serializable;
pub use crate::values::*;
