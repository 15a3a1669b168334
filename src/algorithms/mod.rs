//! Position estimation algorithms
//!
//! Every algorithm maps one cycle's beacon readings to a single 2-D estimate.
//! Implementations are stateless across calls so one instance can be shared
//! between threads and invoked in any order relative to the others.

pub mod sphere_intersection;
pub mod centroid;
pub mod least_squares;

pub use sphere_intersection::SphereIntersection;
pub use centroid::WeightedCentroid;
pub use least_squares::{IterativeLeastSquares, LeastSquaresSettings};

use crate::core::{BeaconReading, Point2};
use crate::validation::{PositioningError, PositioningResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much an estimate can be relied on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Single-beacon fallback
    Minimal,
    /// Documented fallback for an under-determined beacon set
    Degraded,
    Full,
}

/// Single algorithm output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub point: Point2,
    pub confidence: Confidence,
    pub beacon_count: usize,
}

impl Estimate {
    pub fn new(point: Point2, confidence: Confidence, beacon_count: usize) -> Self {
        Self {
            point,
            confidence,
            beacon_count,
        }
    }
}

/// Capability shared by all estimation algorithms
pub trait EstimationAlgorithm: Send + Sync + fmt::Debug {
    /// Stable name used in logs and failure reports
    fn name(&self) -> &str;

    /// Fewest readings this algorithm accepts
    fn min_beacons(&self) -> usize;

    /// Report every failure as an `Err`. Estimators contain errors but not
    /// panics: a panic aborts the whole positioning cycle.
    fn estimate(&self, readings: &[BeaconReading]) -> PositioningResult<Estimate>;
}

/// Built-in algorithm selection, as stored in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    SphereIntersection,
    WeightedCentroid,
    LeastSquares,
}

impl AlgorithmKind {
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::SphereIntersection => sphere_intersection::NAME,
            AlgorithmKind::WeightedCentroid => centroid::NAME,
            AlgorithmKind::LeastSquares => least_squares::NAME,
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reject readings an algorithm cannot do arithmetic on
pub(crate) fn check_finite(readings: &[BeaconReading]) -> PositioningResult<()> {
    for reading in readings {
        if !reading.location().is_finite() {
            return Err(PositioningError::InvalidInput {
                beacon_id: reading.id().to_string(),
                reason: format!("non-finite location {:?}", reading.location()),
            });
        }
        if !reading.has_valid_distance() {
            return Err(PositioningError::InvalidInput {
                beacon_id: reading.id().to_string(),
                reason: format!("distance {} is not a finite non-negative value", reading.distance()),
            });
        }
    }
    Ok(())
}

pub(crate) fn require_beacons(readings: &[BeaconReading], required: usize) -> PositioningResult<()> {
    if readings.len() < required {
        return Err(PositioningError::InsufficientBeacons {
            available: readings.len(),
            required,
        });
    }
    Ok(())
}
