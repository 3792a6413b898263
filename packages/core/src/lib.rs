pub mod checksum;
pub mod clock;
pub mod definitions;
pub mod log;
pub mod parse;
pub mod prelude;
pub mod security;
pub mod serialize;
pub mod util;
pub mod values;
pub mod wrapping_counter;
