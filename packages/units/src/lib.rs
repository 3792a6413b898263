pub mod awaited;
pub mod ccimpl;
pub mod channel;
pub mod config_store;
pub mod controller;
pub mod device_info;
pub mod engine;
pub mod error;
pub mod fields;
pub mod options;
pub mod persist;
pub mod prelude;
pub mod transmit;
pub mod unit;
pub mod unit_info;
mod util;

#[cfg(test)]
pub(crate) mod testing;
