//! Common API types and data structures

use crate::algorithms::{Confidence, EstimationAlgorithm};
use crate::core::Point2;
use crate::validation::AlgorithmFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One active algorithm and the trust placed in it
#[derive(Debug, Clone)]
pub struct AlgorithmWeight {
    pub algorithm: Arc<dyn EstimationAlgorithm>,
    /// Positive relative trust; normalized at combination time
    pub weight: f64,
}

impl AlgorithmWeight {
    pub fn new(algorithm: Arc<dyn EstimationAlgorithm>, weight: f64) -> Self {
        Self { algorithm, weight }
    }
}

/// Immutable set of active algorithms.
///
/// Estimators swap whole sets rather than editing one in place, so a
/// positioning cycle always sees a complete configuration.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmSet {
    entries: Vec<AlgorithmWeight>,
}

impl AlgorithmSet {
    pub fn new(entries: Vec<AlgorithmWeight>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AlgorithmWeight] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and raw weights, in dispatch order
    pub fn weights(&self) -> Vec<(String, f64)> {
        self.entries
            .iter()
            .map(|e| (e.algorithm.name().to_string(), e.weight))
            .collect()
    }
}

/// Estimator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimatorState {
    Unconfigured,
    Configured,
}

/// How algorithms are invoked within one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    #[default]
    Sequential,
    /// One scoped thread per algorithm
    Parallel,
}

/// A successful algorithm's share of the final estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmContribution {
    pub algorithm: String,
    pub point: Point2,
    /// Weight after renormalizing over the successful algorithms
    pub weight: f64,
    pub confidence: Confidence,
}

/// Final result of one positioning cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEstimate {
    pub point: Point2,
    /// Lowest confidence among the contributing algorithms
    pub confidence: Confidence,
    /// Readings left after validation
    pub beacon_count: usize,
    pub contributions: Vec<AlgorithmContribution>,
    /// Algorithms that failed this cycle and were left out
    pub failures: Vec<AlgorithmFailure>,
}

impl PositionEstimate {
    pub fn xy(&self) -> (f64, f64) {
        (self.point.x, self.point.y)
    }
}

impl fmt::Display for PositionEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:?}, {} beacons, {}/{} algorithms]",
            self.point,
            self.confidence,
            self.beacon_count,
            self.contributions.len(),
            self.contributions.len() + self.failures.len()
        )
    }
}
