//! Core data types for the positioning system

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 2-D point in floor-plan units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        (self.to_vector() - other.to_vector()).norm()
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<Vector2<f64>> for Point2 {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// One beacon's fixed location and the receiver's measured distance to it.
///
/// Built fresh on every ranging cycle and never mutated afterwards; the
/// identity is kept for de-duplication and diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconReading {
    id: String,
    location: Point2,
    distance: f64,
}

impl BeaconReading {
    pub fn new(id: impl Into<String>, location: Point2, distance: f64) -> Self {
        Self {
            id: id.into(),
            location,
            distance,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> Point2 {
        self.location
    }

    /// Measured distance ("accuracy") from the receiver
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// True when the distance is finite and non-negative
    pub fn has_valid_distance(&self) -> bool {
        self.distance.is_finite() && self.distance >= 0.0
    }
}

/// Raw ranging output before it is matched against floor metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeMeasurement {
    pub beacon_id: String,
    pub distance: f64,
}

impl RangeMeasurement {
    pub fn new(beacon_id: impl Into<String>, distance: f64) -> Self {
        Self {
            beacon_id: beacon_id.into(),
            distance,
        }
    }
}
