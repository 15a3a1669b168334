use crate::core::BeaconReading;
use crate::validation::error::{PositioningError, PositioningResult};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

/// Why a reading was dropped before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    NegativeDistance,
    NonFiniteDistance,
    NonFiniteLocation,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NegativeDistance => write!(f, "negative distance"),
            RejectionReason::NonFiniteDistance => write!(f, "non-finite distance"),
            RejectionReason::NonFiniteLocation => write!(f, "non-finite beacon location"),
        }
    }
}

/// Outcome of validating one cycle's readings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Readings that may be handed to algorithms, one per beacon identity
    pub readings: Vec<BeaconReading>,
    pub rejected: Vec<(BeaconReading, RejectionReason)>,
    /// Number of earlier readings replaced by a later one with the same identity
    pub duplicates: usize,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Filters and de-duplicates readings for a positioning cycle
#[derive(Debug, Clone, Default)]
pub struct ReadingValidator;

impl ReadingValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn check(reading: &BeaconReading) -> Result<(), RejectionReason> {
        let distance = reading.distance();
        if !distance.is_finite() {
            return Err(RejectionReason::NonFiniteDistance);
        }
        if distance < 0.0 {
            return Err(RejectionReason::NegativeDistance);
        }
        if !reading.location().is_finite() {
            return Err(RejectionReason::NonFiniteLocation);
        }
        Ok(())
    }

    /// Drop invalid readings and collapse duplicate identities.
    ///
    /// The last reading for an identity wins but takes the slot of the first
    /// one, so output order follows first appearance.
    pub fn validate(&self, readings: &[BeaconReading]) -> ValidationReport {
        let mut accepted: Vec<BeaconReading> = Vec::with_capacity(readings.len());
        let mut slots: HashMap<&str, usize> = HashMap::with_capacity(readings.len());
        let mut rejected = Vec::new();
        let mut duplicates = 0;

        for reading in readings {
            if let Err(reason) = Self::check(reading) {
                warn!(
                    "rejecting reading from beacon '{}': {} (distance {})",
                    reading.id(),
                    reason,
                    reading.distance()
                );
                rejected.push((reading.clone(), reason));
                continue;
            }

            match slots.get(reading.id()) {
                Some(&slot) => {
                    debug!("beacon '{}' reported twice, keeping latest", reading.id());
                    accepted[slot] = reading.clone();
                    duplicates += 1;
                }
                None => {
                    slots.insert(reading.id(), accepted.len());
                    accepted.push(reading.clone());
                }
            }
        }

        ValidationReport {
            readings: accepted,
            rejected,
            duplicates,
        }
    }

    /// Validate and fail the cycle when nothing usable is left
    pub fn validate_for_dispatch(&self, readings: &[BeaconReading]) -> PositioningResult<ValidationReport> {
        let report = self.validate(readings);
        if report.is_empty() {
            return Err(PositioningError::NoValidBeacons {
                rejected: report.rejected.len(),
            });
        }
        Ok(report)
    }
}
