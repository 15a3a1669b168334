//! Positioning API
//!
//! `PositionEstimator` owns the active algorithm set and turns one cycle's
//! readings into a single trust-weighted position.

pub mod estimator;
pub mod types;

pub use estimator::PositionEstimator;
pub use types::{
    AlgorithmContribution, AlgorithmSet, AlgorithmWeight, Dispatch, EstimatorState,
    PositionEstimate,
};
