pub mod commandclass;
pub mod commandclass_raw;
pub mod prelude;
