pub mod command_raw;
pub mod error;
pub mod frame;
pub mod message;

pub mod prelude;
