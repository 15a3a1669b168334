//! Sphere (circle) intersection trilateration
//!
//! Each reading defines a circle centred on the beacon with radius equal to
//! the measured distance. Subtracting the reference circle's equation from
//! the others removes the quadratic terms and leaves a linear system in the
//! receiver position:
//!
//! ```text
//! (c_i - c_1) · (p - c_1) = ½ (r_1² - r_i² + |c_i - c_1|²)
//! ```
//!
//! Three beacons give a square 2×2 system solved by elimination. More
//! beacons give an overdetermined system solved through the normal
//! equations; that minimizes the algebraic residuals of the circle
//! equations, which only approximates minimizing distance errors.
//!
//! Under-determined sets fall back instead of failing:
//! - one beacon: its own location, `Confidence::Minimal`
//! - two beacons: the radical-line point between the circles, or a point on
//!   the centre segment split by the radii when the circles miss each other,
//!   `Confidence::Degraded`

use crate::algorithms::{check_finite, require_beacons, Confidence, Estimate, EstimationAlgorithm};
use crate::core::{BeaconReading, Point2, COINCIDENT_CENTER_TOLERANCE, DEFAULT_DEGENERACY_TOLERANCE};
use crate::validation::{PositioningError, PositioningResult};
use log::trace;
use nalgebra::{Matrix2, Vector2};

pub const NAME: &str = "sphere_intersection";

/// Closed-form circle intersection solver
#[derive(Debug, Clone, PartialEq)]
pub struct SphereIntersection {
    /// |det| below this (squared input units) is reported as degenerate geometry
    pub degeneracy_tolerance: f64,
}

impl Default for SphereIntersection {
    fn default() -> Self {
        Self {
            degeneracy_tolerance: DEFAULT_DEGENERACY_TOLERANCE,
        }
    }
}

/// One linearized circle equation: `normal · (p - c_1) = rhs`
#[derive(Debug, Clone, Copy)]
struct LinearRow {
    normal: Vector2<f64>,
    rhs: f64,
}

impl SphereIntersection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(degeneracy_tolerance: f64) -> Self {
        Self { degeneracy_tolerance }
    }

    /// Position from two circles; never fails for finite input
    pub fn intersect_two(&self, first: &BeaconReading, second: &BeaconReading) -> Point2 {
        let c1 = first.location().to_vector();
        let c2 = second.location().to_vector();
        let (r1, r2) = (first.distance(), second.distance());

        let delta = c2 - c1;
        let d = delta.norm();
        if d < COINCIDENT_CENTER_TOLERANCE {
            return first.location();
        }

        if d > r1 + r2 || d < (r1 - r2).abs() {
            // disjoint or nested circles
            let total = r1 + r2;
            let t = if total > 0.0 { r1 / total } else { 0.5 };
            trace!("circles around '{}' and '{}' do not meet, splitting at {:.3}", first.id(), second.id(), t);
            return Point2::from(c1 + delta * t);
        }

        // distance from c1 to the radical line along the centre line
        let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
        Point2::from(c1 + delta * (a / d))
    }

    fn linearize(readings: &[BeaconReading]) -> (Vector2<f64>, Vec<LinearRow>) {
        let reference = readings[0].location().to_vector();
        let r1 = readings[0].distance();

        let rows = readings[1..]
            .iter()
            .map(|reading| {
                let normal = reading.location().to_vector() - reference;
                let ri = reading.distance();
                LinearRow {
                    normal,
                    rhs: 0.5 * (r1 * r1 - ri * ri + normal.norm_squared()),
                }
            })
            .collect();

        (reference, rows)
    }

    fn degenerate(&self, determinant: f64) -> PositioningError {
        PositioningError::DegenerateGeometry {
            determinant,
            tolerance: self.degeneracy_tolerance,
        }
    }

    /// Direct elimination for exactly two equations
    fn solve_exact(&self, rows: &[LinearRow]) -> PositioningResult<Vector2<f64>> {
        let (n1, n2) = (rows[0].normal, rows[1].normal);
        let (b1, b2) = (rows[0].rhs, rows[1].rhs);

        let det = n1.x * n2.y - n1.y * n2.x;
        if det.abs() < self.degeneracy_tolerance {
            return Err(self.degenerate(det));
        }

        Ok(Vector2::new((b1 * n2.y - b2 * n1.y) / det, (n1.x * b2 - n2.x * b1) / det))
    }

    /// `sqrt(det(AᵀA))` from the pairwise cross products of the rows
    /// (Cauchy-Binet), equal to `|det A|` for two rows. Expanding `AᵀA`
    /// first cancels catastrophically on collinear layouts.
    fn gram_determinant(rows: &[LinearRow]) -> f64 {
        let mut sum = 0.0;
        for (i, first) in rows.iter().enumerate() {
            for second in &rows[i + 1..] {
                let cross = first.normal.x * second.normal.y - first.normal.y * second.normal.x;
                sum += cross * cross;
            }
        }
        sum.sqrt()
    }

    /// Normal-equation least squares for three or more equations
    fn solve_least_squares(&self, rows: &[LinearRow]) -> PositioningResult<Vector2<f64>> {
        let mut normal_matrix = Matrix2::<f64>::zeros();
        let mut moment = Vector2::<f64>::zeros();
        for row in rows {
            normal_matrix += row.normal * row.normal.transpose();
            moment += row.normal * row.rhs;
        }

        let gram = Self::gram_determinant(rows);
        if gram < self.degeneracy_tolerance {
            return Err(self.degenerate(gram));
        }

        normal_matrix
            .try_inverse()
            .map(|inverse| inverse * moment)
            .ok_or_else(|| self.degenerate(gram))
    }
}

impl EstimationAlgorithm for SphereIntersection {
    fn name(&self) -> &str {
        NAME
    }

    fn min_beacons(&self) -> usize {
        1
    }

    fn estimate(&self, readings: &[BeaconReading]) -> PositioningResult<Estimate> {
        require_beacons(readings, self.min_beacons())?;
        check_finite(readings)?;

        match readings.len() {
            1 => Ok(Estimate::new(readings[0].location(), Confidence::Minimal, 1)),
            2 => {
                let point = self.intersect_two(&readings[0], &readings[1]);
                Ok(Estimate::new(point, Confidence::Degraded, 2))
            }
            count => {
                let (reference, rows) = Self::linearize(readings);
                let offset = if count == 3 {
                    self.solve_exact(&rows)?
                } else {
                    self.solve_least_squares(&rows)?
                };
                Ok(Estimate::new(Point2::from(reference + offset), Confidence::Full, count))
            }
        }
    }
}
