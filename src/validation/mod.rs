//! Reading validation and error types

pub mod data;
pub mod error;

pub use data::{ReadingValidator, RejectionReason, ValidationReport};
pub use error::{AlgorithmFailure, PositioningError, PositioningResult};
