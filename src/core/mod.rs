//! Core types and constants for the beacon positioning system

pub mod types;
pub mod constants;
pub mod floor;

pub use types::*;
pub use constants::*;
pub use floor::Floor;
