pub use crate::command_raw::CommandRaw;
pub use crate::error::*;
pub use crate::frame::{SerialControlByte, SerialFrame};
pub use crate::message::*;
