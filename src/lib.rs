//! Indoor Beacon Positioning
//!
//! Multilateration core that turns ranged distances to fixed indoor beacons
//! into a 2-D position, combining any number of pluggable estimation
//! algorithms through configurable trust weights.

pub mod core;
pub mod algorithms;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{BeaconReading, Floor, Point2, RangeMeasurement};
pub use algorithms::{
    AlgorithmKind, Confidence, Estimate, EstimationAlgorithm, IterativeLeastSquares,
    LeastSquaresSettings, SphereIntersection, WeightedCentroid,
};
pub use validation::{AlgorithmFailure, PositioningError, PositioningResult, ReadingValidator};
pub use utils::{AlgorithmEntry, ConfigError, EstimatorConfig};
pub use api::{Dispatch, EstimatorState, PositionEstimate, PositionEstimator};
