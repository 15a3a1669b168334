use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for positioning operations
pub type PositioningResult<T> = Result<T, PositioningError>;

/// Error classification for the positioning core
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PositioningError {
    /// Non-finite coordinate or distance handed to an algorithm
    #[error("invalid input from beacon '{beacon_id}': {reason}")]
    InvalidInput { beacon_id: String, reason: String },

    #[error("insufficient beacons: {available} available, {required} required")]
    InsufficientBeacons { available: usize, required: usize },

    /// Collinear or otherwise ill-conditioned beacon layout
    #[error("degenerate beacon geometry: |det| = {determinant:e} below tolerance {tolerance:e}")]
    DegenerateGeometry { determinant: f64, tolerance: f64 },

    #[error("invalid trust weight {weight} for algorithm '{algorithm}'")]
    InvalidWeight { algorithm: String, weight: f64 },

    #[error("no valid beacon readings ({rejected} rejected)")]
    NoValidBeacons { rejected: usize },

    #[error("no estimation algorithm configured")]
    NoAlgorithmConfigured,

    #[error("all {} algorithms failed: {}", .failures.len(), describe_failures(.failures))]
    EstimationFailed { failures: Vec<AlgorithmFailure> },
}

/// One algorithm's failure, kept for diagnostics when every algorithm fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmFailure {
    pub algorithm: String,
    pub error: PositioningError,
}

impl AlgorithmFailure {
    pub fn new(algorithm: impl Into<String>, error: PositioningError) -> Self {
        Self {
            algorithm: algorithm.into(),
            error,
        }
    }
}

impl PositioningError {
    /// Short stable name of the error kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            PositioningError::InvalidInput { .. } => "InvalidInput",
            PositioningError::InsufficientBeacons { .. } => "InsufficientBeacons",
            PositioningError::DegenerateGeometry { .. } => "DegenerateGeometry",
            PositioningError::InvalidWeight { .. } => "InvalidWeight",
            PositioningError::NoValidBeacons { .. } => "NoValidBeacons",
            PositioningError::NoAlgorithmConfigured => "NoAlgorithmConfigured",
            PositioningError::EstimationFailed { .. } => "EstimationFailed",
        }
    }
}

fn describe_failures(failures: &[AlgorithmFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.algorithm, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimation_failed_lists_every_failure() {
        let error = PositioningError::EstimationFailed {
            failures: vec![
                AlgorithmFailure::new(
                    "sphere_intersection",
                    PositioningError::DegenerateGeometry {
                        determinant: 0.0,
                        tolerance: 1e-9,
                    },
                ),
                AlgorithmFailure::new(
                    "least_squares",
                    PositioningError::InsufficientBeacons {
                        available: 2,
                        required: 3,
                    },
                ),
            ],
        };

        let message = error.to_string();
        assert!(message.starts_with("all 2 algorithms failed"));
        assert!(message.contains("sphere_intersection: degenerate beacon geometry"));
        assert!(message.contains("least_squares: insufficient beacons: 2 available, 3 required"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(PositioningError::NoAlgorithmConfigured.kind(), "NoAlgorithmConfigured");
        assert_eq!(
            PositioningError::NoValidBeacons { rejected: 3 }.kind(),
            "NoValidBeacons"
        );
    }

    #[test]
    fn test_error_serializes_for_diagnostics() {
        let error = PositioningError::InvalidWeight {
            algorithm: "weighted_centroid".to_string(),
            weight: -1.0,
        };
        let json = serde_json::to_string(&error).unwrap();
        let back: PositioningError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
    }
}
