//! Domain types and error taxonomy shared by every gas station crate.

pub mod domain;
pub mod errors;

pub use domain::*;
pub use errors::GasStationError;
