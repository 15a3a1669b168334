//! Trust-weighted position estimator
//!
//! The estimator keeps its active algorithms in an immutable `AlgorithmSet`
//! behind an `Arc`. Reconfiguration builds a new set and swaps the pointer,
//! and every positioning cycle works on the snapshot it grabbed at the start,
//! so concurrent callers never observe a half-applied update.

use crate::algorithms::{Confidence, Estimate, EstimationAlgorithm};
use crate::api::types::{
    AlgorithmContribution, AlgorithmSet, AlgorithmWeight, Dispatch, EstimatorState, PositionEstimate,
};
use crate::core::{BeaconReading, Floor, Point2, RangeMeasurement};
use crate::utils::config::{ConfigError, EstimatorConfig};
use crate::validation::{AlgorithmFailure, PositioningError, PositioningResult, ReadingValidator};
use log::{debug, warn};
use std::sync::{Arc, RwLock};

/// Combines the outputs of one or more estimation algorithms
#[derive(Debug)]
pub struct PositionEstimator {
    active: RwLock<Arc<AlgorithmSet>>,
    validator: ReadingValidator,
    dispatch: Dispatch,
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionEstimator {
    /// Unconfigured estimator with sequential dispatch
    pub fn new() -> Self {
        Self::with_dispatch(Dispatch::Sequential)
    }

    pub fn with_dispatch(dispatch: Dispatch) -> Self {
        Self {
            active: RwLock::new(Arc::new(AlgorithmSet::default())),
            validator: ReadingValidator::new(),
            dispatch,
        }
    }

    /// Build an estimator with the algorithms and weights described by `config`
    pub fn from_config(config: &EstimatorConfig) -> Result<Self, ConfigError> {
        let estimator = Self::with_dispatch(config.dispatch);
        estimator.apply_config(config)?;
        Ok(estimator)
    }

    /// Replace the active set with the one described by `config`.
    ///
    /// The dispatch mode is fixed at construction; `config.dispatch` only
    /// takes effect through `from_config`.
    pub fn apply_config(&self, config: &EstimatorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.dispatch != self.dispatch {
            debug!(
                "keeping {:?} dispatch, configured {:?} applies only to new estimators",
                self.dispatch, config.dispatch
            );
        }
        self.set_algorithms_with_trust(config.build_algorithms())?;
        Ok(())
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    pub fn state(&self) -> EstimatorState {
        if self.snapshot().is_empty() {
            EstimatorState::Unconfigured
        } else {
            EstimatorState::Configured
        }
    }

    /// Current configuration; later updates do not affect the returned set
    pub fn snapshot(&self) -> Arc<AlgorithmSet> {
        // a poisoned lock still holds a complete set
        let guard = self.active.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn install(&self, set: AlgorithmSet) {
        debug!("installing algorithm set {:?}", set.weights());
        let mut guard = self.active.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(set);
    }

    /// Use a single algorithm at full trust
    pub fn set_active_algorithm(&self, algorithm: Arc<dyn EstimationAlgorithm>) {
        self.install(AlgorithmSet::new(vec![AlgorithmWeight::new(algorithm, 1.0)]));
    }

    /// Trust every algorithm equally. An empty list unconfigures the estimator.
    pub fn set_active_algorithms(&self, algorithms: Vec<Arc<dyn EstimationAlgorithm>>) {
        let weight = 1.0 / algorithms.len() as f64;
        let entries = algorithms
            .into_iter()
            .map(|algorithm| AlgorithmWeight::new(algorithm, weight))
            .collect();
        self.install(AlgorithmSet::new(entries));
    }

    /// Install algorithms with caller-chosen trust.
    ///
    /// Only relative trust matters. On an invalid weight the current
    /// configuration is kept.
    pub fn set_algorithms_with_trust(
        &self,
        algorithms: Vec<(Arc<dyn EstimationAlgorithm>, f64)>,
    ) -> PositioningResult<()> {
        if let Some((algorithm, weight)) = algorithms
            .iter()
            .find(|(_, weight)| !(weight.is_finite() && *weight > 0.0))
        {
            return Err(PositioningError::InvalidWeight {
                algorithm: algorithm.name().to_string(),
                weight: *weight,
            });
        }

        let entries = algorithms
            .into_iter()
            .map(|(algorithm, weight)| AlgorithmWeight::new(algorithm, weight))
            .collect();
        self.install(AlgorithmSet::new(entries));
        Ok(())
    }

    /// Back to the unconfigured state
    pub fn clear(&self) {
        self.install(AlgorithmSet::default());
    }

    /// Run every active algorithm on the validated readings and merge their
    /// estimates by trust.
    pub fn estimate_position(&self, readings: &[BeaconReading]) -> PositioningResult<PositionEstimate> {
        let set = self.snapshot();
        if set.is_empty() {
            return Err(PositioningError::NoAlgorithmConfigured);
        }

        let report = self.validator.validate_for_dispatch(readings)?;
        let outcomes = self.run_all(&set, &report.readings);

        let mut successes: Vec<(&AlgorithmWeight, Estimate)> = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (entry, outcome) in set.entries().iter().zip(outcomes) {
            match outcome {
                Ok(estimate) => {
                    debug!("{} -> {} ({:?})", entry.algorithm.name(), estimate.point, estimate.confidence);
                    successes.push((entry, estimate));
                }
                Err(error) => {
                    warn!("{} excluded this cycle: {}", entry.algorithm.name(), error);
                    failures.push(AlgorithmFailure::new(entry.algorithm.name(), error));
                }
            }
        }

        if successes.is_empty() {
            return Err(PositioningError::EstimationFailed { failures });
        }

        Ok(Self::combine(&successes, failures, report.readings.len()))
    }

    /// Resolve raw ranges through the caller's floor, then estimate
    pub fn estimate_from_ranges(
        &self,
        floor: &Floor,
        ranges: &[RangeMeasurement],
    ) -> PositioningResult<PositionEstimate> {
        let readings = floor.readings(ranges);
        self.estimate_position(&readings)
    }

    fn run_all(&self, set: &AlgorithmSet, readings: &[BeaconReading]) -> Vec<PositioningResult<Estimate>> {
        match self.dispatch {
            Dispatch::Parallel if set.len() > 1 => std::thread::scope(|scope| {
                let handles: Vec<_> = set
                    .entries()
                    .iter()
                    .map(|entry| scope.spawn(move || entry.algorithm.estimate(readings)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                    .collect()
            }),
            _ => set
                .entries()
                .iter()
                .map(|entry| entry.algorithm.estimate(readings))
                .collect(),
        }
    }

    /// Weighted mean over the successful algorithms, weights renormalized
    /// over the successes only
    fn combine(
        successes: &[(&AlgorithmWeight, Estimate)],
        failures: Vec<AlgorithmFailure>,
        beacon_count: usize,
    ) -> PositionEstimate {
        let total: f64 = successes.iter().map(|(entry, _)| entry.weight).sum();
        // large finite trusts can overflow the sum; rescale by the largest
        let scale = if total.is_finite() {
            1.0
        } else {
            successes.iter().map(|(entry, _)| entry.weight).fold(0.0, f64::max)
        };
        let total: f64 = successes.iter().map(|(entry, _)| entry.weight / scale).sum();

        let mut x = 0.0;
        let mut y = 0.0;
        let mut confidence = Confidence::Full;
        let mut contributions = Vec::with_capacity(successes.len());
        for (entry, estimate) in successes {
            let weight = entry.weight / scale / total;
            x += weight * estimate.point.x;
            y += weight * estimate.point.y;
            confidence = confidence.min(estimate.confidence);
            contributions.push(AlgorithmContribution {
                algorithm: entry.algorithm.name().to_string(),
                point: estimate.point,
                weight,
                confidence: estimate.confidence,
            });
        }

        PositionEstimate {
            point: Point2::new(x, y),
            confidence,
            beacon_count,
            contributions,
            failures,
        }
    }
}
