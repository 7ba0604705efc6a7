/// Mean radius of the reference sphere used by the spherical-harmonic models, in km.
pub const EARTH_RADIUS_KM: f64 = 6371.2;

/// Squared WGS84 semi-major axis, km^2.
pub const WGS84_A2: f64 = 40680631.59;
/// Squared WGS84 semi-minor axis, km^2.
pub const WGS84_B2: f64 = 40408299.98;

/// Latitudes closer than this to +-90 degrees are treated as the pole.
pub const POLE_TOLERANCE_DEG: f64 = 0.001;
/// Latitude the Legendre synthesis uses in place of an exact pole.
pub const NUDGED_POLE_LAT_DEG: f64 = 89.999;

/// Fields weaker than this (nT) have no meaningful direction.
pub const WEAK_FIELD_NT: f64 = 1e-4;

/// Horizontal intensity (nT) below which a compass cannot be trusted at all.
pub const COMPASS_UNRELIABLE_NT: f64 = 1000.0;
/// Horizontal intensity (nT) below which a compass may behave erratically.
pub const COMPASS_ERRATIC_NT: f64 = 5000.0;
