//! Floor metadata: where each beacon is mounted on one mapped level

use crate::core::types::{BeaconReading, Point2, RangeMeasurement};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Beacon identity to fixed location lookup for a single floor.
///
/// Estimators never hold on to a floor; callers pass it in per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub name: String,
    #[serde(default)]
    pub beacons: BTreeMap<String, Point2>,
}

impl Floor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            beacons: BTreeMap::new(),
        }
    }

    /// Builder-style beacon registration
    pub fn with_beacon(mut self, id: impl Into<String>, location: Point2) -> Self {
        self.add_beacon(id, location);
        self
    }

    /// Add or move a beacon, returning its previous location
    pub fn add_beacon(&mut self, id: impl Into<String>, location: Point2) -> Option<Point2> {
        self.beacons.insert(id.into(), location)
    }

    pub fn remove_beacon(&mut self, id: &str) -> Option<Point2> {
        self.beacons.remove(id)
    }

    pub fn location_of(&self, id: &str) -> Option<Point2> {
        self.beacons.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }

    /// Resolve ranging output into readings, in input order.
    /// Ranges for beacons this floor does not know are skipped.
    pub fn readings(&self, ranges: &[RangeMeasurement]) -> Vec<BeaconReading> {
        ranges
            .iter()
            .filter_map(|range| match self.location_of(&range.beacon_id) {
                Some(location) => Some(BeaconReading::new(
                    range.beacon_id.clone(),
                    location,
                    range.distance,
                )),
                None => {
                    debug!(
                        "floor '{}': no beacon '{}', range {:.3} ignored",
                        self.name, range.beacon_id, range.distance
                    );
                    None
                }
            })
            .collect()
    }
}
