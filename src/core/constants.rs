//! Solver tolerances and limits

/// Below this |determinant| (squared input units) beacon geometry is treated as collinear
pub const DEFAULT_DEGENERACY_TOLERANCE: f64 = 1e-9;

/// Beacons closer than this are considered to share a centre
pub const COINCIDENT_CENTER_TOLERANCE: f64 = 1e-12;

/// Minimum beacon count for an exact trilateration fix
pub const MIN_TRILATERATION_BEACONS: usize = 3;
