use crate::algorithms::{
    AlgorithmKind, EstimationAlgorithm, IterativeLeastSquares, LeastSquaresSettings, SphereIntersection,
    WeightedCentroid,
};
use crate::api::Dispatch;
use crate::core::{Floor, DEFAULT_DEGENERACY_TOLERANCE};
use crate::validation::PositioningError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// One configured algorithm and the trust placed in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmEntry {
    pub kind: AlgorithmKind,
    #[serde(default = "default_trust")]
    pub trust: f64,
}

fn default_trust() -> f64 {
    1.0
}

impl AlgorithmEntry {
    pub fn new(kind: AlgorithmKind, trust: f64) -> Self {
        Self { kind, trust }
    }
}

/// Estimator configuration as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Active algorithms in dispatch order
    pub algorithms: Vec<AlgorithmEntry>,
    /// Determinant threshold below which beacon geometry counts as degenerate
    pub degeneracy_tolerance: f64,
    pub dispatch: Dispatch,
    pub least_squares: LeastSquaresSettings,
    /// Beacon map used to resolve raw ranges
    pub floor: Option<Floor>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            algorithms: vec![AlgorithmEntry::new(AlgorithmKind::SphereIntersection, 1.0)],
            degeneracy_tolerance: DEFAULT_DEGENERACY_TOLERANCE,
            dispatch: Dispatch::Sequential,
            least_squares: LeastSquaresSettings::default(),
            floor: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Positioning(#[from] PositioningError),
}

impl ConfigError {
    fn invalid(parameter: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl EstimatorConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path)?;
        let config = Self::from_json_str(&content)?;
        debug!(
            "loaded estimator config from '{}' ({} algorithms)",
            path.as_ref().display(),
            config.algorithms.len()
        );
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Check numeric parameters. Trust weights are checked when the
    /// algorithm set is installed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.degeneracy_tolerance.is_finite() && self.degeneracy_tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "degeneracy_tolerance",
                self.degeneracy_tolerance,
                "Degeneracy tolerance must be a positive finite number",
            ));
        }

        if self.least_squares.max_iterations == 0 {
            return Err(ConfigError::invalid(
                "least_squares.max_iterations",
                self.least_squares.max_iterations,
                "At least one iteration is required",
            ));
        }

        let tolerance = self.least_squares.convergence_tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "least_squares.convergence_tolerance",
                tolerance,
                "Convergence tolerance must be a positive finite number",
            ));
        }

        if let Some(floor) = &self.floor {
            if let Some((id, location)) = floor.beacons.iter().find(|(_, location)| !location.is_finite()) {
                return Err(ConfigError::invalid(
                    format!("floor.beacons.{}", id),
                    location,
                    "Beacon location must be finite",
                ));
            }
        }

        Ok(())
    }

    /// Instantiate one built-in algorithm with this configuration's settings
    pub fn build_algorithm(&self, kind: AlgorithmKind) -> Arc<dyn EstimationAlgorithm> {
        match kind {
            AlgorithmKind::SphereIntersection => {
                Arc::new(SphereIntersection::with_tolerance(self.degeneracy_tolerance))
            }
            AlgorithmKind::WeightedCentroid => Arc::new(WeightedCentroid::new()),
            AlgorithmKind::LeastSquares => Arc::new(IterativeLeastSquares::new(
                self.least_squares.clone(),
                self.degeneracy_tolerance,
            )),
        }
    }

    /// Algorithms paired with their trust, in configured order
    pub fn build_algorithms(&self) -> Vec<(Arc<dyn EstimationAlgorithm>, f64)> {
        self.algorithms
            .iter()
            .map(|entry| (self.build_algorithm(entry.kind), entry.trust))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EstimatorState, PositionEstimator};
    use crate::core::{Point2, RangeMeasurement};

    const SAMPLE: &str = r#"{
        "algorithms": [
            { "kind": "sphere_intersection", "trust": 3.0 },
            { "kind": "weighted_centroid", "trust": 1.0 }
        ],
        "degeneracy_tolerance": 1e-9,
        "dispatch": "parallel",
        "least_squares": { "max_iterations": 20, "convergence_tolerance": 1e-8 },
        "floor": {
            "name": "level-2",
            "beacons": {
                "B1": { "x": 0.0, "y": 0.0 },
                "B2": { "x": 10.0, "y": 0.0 },
                "B3": { "x": 0.0, "y": 10.0 }
            }
        }
    }"#;

    #[test]
    fn test_default_config() {
        let config = EstimatorConfig::default();
        assert_eq!(config.algorithms, vec![AlgorithmEntry::new(AlgorithmKind::SphereIntersection, 1.0)]);
        assert_eq!(config.dispatch, Dispatch::Sequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_document() {
        let config = EstimatorConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.algorithms.len(), 2);
        assert_eq!(config.algorithms[0].kind, AlgorithmKind::SphereIntersection);
        assert_eq!(config.algorithms[0].trust, 3.0);
        assert_eq!(config.dispatch, Dispatch::Parallel);
        assert_eq!(config.least_squares.max_iterations, 20);
        let floor = config.floor.unwrap();
        assert_eq!(floor.name, "level-2");
        assert_eq!(floor.location_of("B2"), Some(Point2::new(10.0, 0.0)));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = EstimatorConfig::from_json_str(r#"{ "algorithms": [ { "kind": "least_squares" } ] }"#).unwrap();
        assert_eq!(config.algorithms[0].trust, 1.0);
        assert_eq!(config.degeneracy_tolerance, DEFAULT_DEGENERACY_TOLERANCE);
        assert_eq!(config.least_squares, LeastSquaresSettings::default());
        assert!(config.floor.is_none());
    }

    #[test]
    fn test_unknown_algorithm_kind_is_serialization_error() {
        let result = EstimatorConfig::from_json_str(r#"{ "algorithms": [ { "kind": "kalman" } ] }"#);
        assert!(matches!(result, Err(ConfigError::Serialization(_))));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut config = EstimatorConfig::default();
        config.degeneracy_tolerance = 0.0;
        match config.validate() {
            Err(ConfigError::InvalidParameter { parameter, .. }) => assert_eq!(parameter, "degeneracy_tolerance"),
            other => panic!("unexpected result {:?}", other),
        }

        let mut config = EstimatorConfig::default();
        config.least_squares.max_iterations = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidParameter { .. })));

        let mut config = EstimatorConfig::default();
        config.floor = Some(Floor::new("bad").with_beacon("X", Point2::new(f64::NAN, 0.0)));
        match config.validate() {
            Err(ConfigError::InvalidParameter { parameter, .. }) => assert_eq!(parameter, "floor.beacons.X"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estimator.json");

        let config = EstimatorConfig::from_json_str(SAMPLE).unwrap();
        config.save_to_file(&path).unwrap();
        let loaded = EstimatorConfig::from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EstimatorConfig::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_build_algorithms_in_order() {
        let config = EstimatorConfig::from_json_str(SAMPLE).unwrap();
        let names: Vec<(String, f64)> = config
            .build_algorithms()
            .iter()
            .map(|(algorithm, trust)| (algorithm.name().to_string(), *trust))
            .collect();
        assert_eq!(
            names,
            vec![("sphere_intersection".to_string(), 3.0), ("weighted_centroid".to_string(), 1.0)]
        );
    }

    #[test]
    fn test_estimator_from_config_resolves_floor_ranges() {
        let config = EstimatorConfig::from_json_str(SAMPLE).unwrap();
        let estimator = PositionEstimator::from_config(&config).unwrap();
        assert_eq!(estimator.state(), EstimatorState::Configured);
        assert_eq!(estimator.dispatch(), Dispatch::Parallel);

        let floor = config.floor.as_ref().unwrap();
        let truth = Point2::new(4.0, 4.0);
        let ranges: Vec<RangeMeasurement> = ["B1", "B2", "B3"]
            .iter()
            .map(|id| RangeMeasurement::new(*id, floor.location_of(id).unwrap().distance_to(&truth)))
            .collect();

        let estimate = estimator.estimate_from_ranges(floor, &ranges).unwrap();
        assert_eq!(estimate.contributions.len(), 2);
        assert_eq!(estimate.contributions[0].weight, 0.75);
        assert!(estimate.point.is_finite());
    }

    #[test]
    fn test_apply_config_keeps_construction_dispatch() {
        let estimator = PositionEstimator::new();
        let config = EstimatorConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.dispatch, Dispatch::Parallel);

        estimator.apply_config(&config).unwrap();

        assert_eq!(estimator.dispatch(), Dispatch::Sequential);
        assert_eq!(estimator.snapshot().len(), 2);
    }

    #[test]
    fn test_apply_config_with_bad_trust_keeps_previous_set() {
        let estimator = PositionEstimator::from_config(&EstimatorConfig::default()).unwrap();
        let before = estimator.snapshot().weights();

        let mut config = EstimatorConfig::default();
        config.algorithms.push(AlgorithmEntry::new(AlgorithmKind::WeightedCentroid, -2.0));

        match estimator.apply_config(&config) {
            Err(ConfigError::Positioning(PositioningError::InvalidWeight { algorithm, weight })) => {
                assert_eq!(algorithm, "weighted_centroid");
                assert_eq!(weight, -2.0);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(estimator.snapshot().weights(), before);
    }
}
