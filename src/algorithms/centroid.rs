//! Inverse-distance weighted centroid of beacon locations

use crate::algorithms::{check_finite, require_beacons, Confidence, Estimate, EstimationAlgorithm};
use crate::core::{BeaconReading, Point2, MIN_TRILATERATION_BEACONS};
use crate::validation::PositioningResult;
use nalgebra::Vector2;

pub const NAME: &str = "weighted_centroid";

/// Pulls the estimate toward beacons that report a short distance.
///
/// Weight per beacon is `1 / max(distance, min_distance)^exponent`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCentroid {
    pub exponent: f64,
    /// Floor applied to distances so a zero reading does not divide by zero
    pub min_distance: f64,
}

impl Default for WeightedCentroid {
    fn default() -> Self {
        Self {
            exponent: 1.0,
            min_distance: 1e-6,
        }
    }
}

impl WeightedCentroid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exponent(exponent: f64) -> Self {
        Self {
            exponent,
            ..Self::default()
        }
    }

    fn weight(&self, distance: f64) -> f64 {
        distance.max(self.min_distance).powf(self.exponent).recip()
    }
}

impl EstimationAlgorithm for WeightedCentroid {
    fn name(&self) -> &str {
        NAME
    }

    fn min_beacons(&self) -> usize {
        1
    }

    fn estimate(&self, readings: &[BeaconReading]) -> PositioningResult<Estimate> {
        require_beacons(readings, self.min_beacons())?;
        check_finite(readings)?;

        let mut weighted_sum = Vector2::<f64>::zeros();
        let mut total_weight = 0.0;
        for reading in readings {
            let w = self.weight(reading.distance());
            weighted_sum += reading.location().to_vector() * w;
            total_weight += w;
        }

        let confidence = match readings.len() {
            1 => Confidence::Minimal,
            n if n < MIN_TRILATERATION_BEACONS => Confidence::Degraded,
            _ => Confidence::Full,
        };

        Ok(Estimate::new(
            Point2::from(weighted_sum / total_weight),
            confidence,
            readings.len(),
        ))
    }
}
