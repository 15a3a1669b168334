//! Geometric least squares refinement
//!
//! Minimizes `Σ (‖p - c_i‖ - r_i)²` with a damped Gauss-Newton
//! (Levenberg-Marquardt) iteration seeded by the closed-form circle
//! intersection, so noisy ranges are fitted in distance rather than in the
//! squared algebraic form.

use crate::algorithms::{
    check_finite, require_beacons, Confidence, Estimate, EstimationAlgorithm, SphereIntersection,
};
use crate::core::{BeaconReading, Point2, COINCIDENT_CENTER_TOLERANCE, DEFAULT_DEGENERACY_TOLERANCE, MIN_TRILATERATION_BEACONS};
use crate::validation::PositioningResult;
use log::trace;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "least_squares";

/// Iteration limits for the refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeastSquaresSettings {
    pub max_iterations: usize,
    /// Stop once a step moves the estimate less than this
    pub convergence_tolerance: f64,
}

impl Default for LeastSquaresSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterativeLeastSquares {
    pub settings: LeastSquaresSettings,
    seed: SphereIntersection,
}

impl Default for IterativeLeastSquares {
    fn default() -> Self {
        Self::new(LeastSquaresSettings::default(), DEFAULT_DEGENERACY_TOLERANCE)
    }
}

impl IterativeLeastSquares {
    pub fn new(settings: LeastSquaresSettings, degeneracy_tolerance: f64) -> Self {
        Self {
            settings,
            seed: SphereIntersection::with_tolerance(degeneracy_tolerance),
        }
    }

    /// Sum of squared range residuals at `p`
    pub fn cost(readings: &[BeaconReading], p: &Vector2<f64>) -> f64 {
        readings
            .iter()
            .map(|r| {
                let residual = (p - r.location().to_vector()).norm() - r.distance();
                residual * residual
            })
            .sum()
    }

    /// Normal equations `JᵀJ` and `Jᵀr` of the range residuals at `p`
    fn linearize(readings: &[BeaconReading], p: &Vector2<f64>) -> (Matrix2<f64>, Vector2<f64>) {
        let mut jtj = Matrix2::<f64>::zeros();
        let mut jtr = Vector2::<f64>::zeros();
        for reading in readings {
            let offset = p - reading.location().to_vector();
            let range = offset.norm();
            if range < COINCIDENT_CENTER_TOLERANCE {
                // gradient undefined on top of the beacon
                continue;
            }
            let gradient = offset / range;
            let residual = range - reading.distance();
            jtj += gradient * gradient.transpose();
            jtr += gradient * residual;
        }
        (jtj, jtr)
    }

    fn refine(&self, readings: &[BeaconReading], start: Vector2<f64>) -> Vector2<f64> {
        let mut estimate = start;
        let mut cost = Self::cost(readings, &estimate);
        let mut lambda = 1e-3;

        for iteration in 0..self.settings.max_iterations {
            let (jtj, jtr) = Self::linearize(readings, &estimate);
            let damped = jtj + Matrix2::from_diagonal(&jtj.diagonal()) * lambda + Matrix2::identity() * 1e-12;

            let step = match damped.try_inverse() {
                Some(inverse) => inverse * jtr,
                None => break,
            };

            let candidate = estimate - step;
            let candidate_cost = Self::cost(readings, &candidate);
            if candidate_cost < cost {
                estimate = candidate;
                cost = candidate_cost;
                lambda = (lambda / 10.0).max(1e-12);
                if step.norm() < self.settings.convergence_tolerance {
                    trace!("least squares converged after {} iterations, cost {:e}", iteration + 1, cost);
                    break;
                }
            } else {
                lambda *= 10.0;
                if lambda > 1e8 {
                    break;
                }
            }
        }

        estimate
    }
}

impl EstimationAlgorithm for IterativeLeastSquares {
    fn name(&self) -> &str {
        NAME
    }

    fn min_beacons(&self) -> usize {
        MIN_TRILATERATION_BEACONS
    }

    fn estimate(&self, readings: &[BeaconReading]) -> PositioningResult<Estimate> {
        require_beacons(readings, self.min_beacons())?;
        check_finite(readings)?;

        let seed = self.seed.estimate(readings)?;
        let refined = self.refine(readings, seed.point.to_vector());

        Ok(Estimate::new(Point2::from(refined), Confidence::Full, readings.len()))
    }
}
