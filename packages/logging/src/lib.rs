mod definitions;
pub use definitions::*;

pub mod formatters;
pub mod loggers;

pub use zwave_core::log::Loglevel;
