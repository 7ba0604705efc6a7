use crate::field::error::FieldError;
use crate::model::coefficients::{term_count, CoefficientVector, MAX_DEGREE};
use crate::utils::constants::{
    EARTH_RADIUS_KM, NUDGED_POLE_LAT_DEG, POLE_TOLERANCE_DEG, WEAK_FIELD_NT, WGS84_A2, WGS84_B2,
};
use std::f64::consts::PI;

/// Slots in the Legendre function tables, including the unused slot 0.
const MAX_TERMS: usize = term_count(MAX_DEGREE) + 1;

/// Coordinate system of the input latitude and altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordMode {
    /// Latitude and altitude relative to the WGS84 ellipsoid
    Geodetic = 1,
    /// Latitude on, and altitude above, a sphere of radius 6371.2 km
    Geocentric = 2,
}

impl TryFrom<i32> for CoordMode {
    type Error = FieldError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CoordMode::Geodetic),
            2 => Ok(CoordMode::Geocentric),
            x => Err(FieldError::InvalidCoordinateMode(x)),
        }
    }
}

/// North (X), east (Y) and down (Z) components in nT.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Angles (radians) and intensities (nT) derived from a [`FieldVector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScalars {
    pub declination: f64,
    pub inclination: f64,
    pub horizontal: f64,
    pub total: f64,
}

/// Sine and cosine of an angle in degrees, exact at multiples of 90.
///
/// The angle is reduced to the nearest quarter turn first, so -180 and 180 give identical
/// results with a sine of exactly zero.
fn sin_cos_deg(deg: f64) -> (f64, f64) {
    let reduced = deg.rem_euclid(360.0);
    let quarter = (reduced / 90.0).round();
    let (s, c) = (reduced - quarter * 90.0).to_radians().sin_cos();
    match (quarter as i64).rem_euclid(4) {
        0 => (s, c),
        1 => (c, -s),
        2 => (-s, -c),
        _ => (-c, s),
    }
}

/// Synthesizes the field vector at one location from a resolved coefficient vector.
///
/// `lat`/`lon` are in degrees and `altitude_km` is height above the ellipsoid (geodetic) or
/// above the reference sphere (geocentric). The associated Legendre functions P(n,m) and
/// their colatitude derivatives Q(n,m) are built by recurrence, one term per iteration, so
/// the whole synthesis runs in a single pass over the coefficients.
pub fn evaluate_vector(
    mode: CoordMode,
    lat: f64,
    lon: f64,
    altitude_km: f64,
    coefficients: &CoefficientVector,
) -> FieldVector {
    let nmax = coefficients.degree();

    // Only the cosine term is moved off the pole; cos(lat) = 0 would divide by zero below
    let mut slat = lat.to_radians().sin();
    let nudged = if 90.0 - lat < POLE_TOLERANCE_DEG {
        NUDGED_POLE_LAT_DEG
    } else if 90.0 + lat < POLE_TOLERANCE_DEG {
        -NUDGED_POLE_LAT_DEG
    } else {
        lat
    };
    let mut clat = nudged.to_radians().cos();

    let mut sl = [0.0; MAX_DEGREE + 1];
    let mut cl = [0.0; MAX_DEGREE + 1];
    let (sin_lon, cos_lon) = sin_cos_deg(lon);
    sl[1] = sin_lon;
    cl[1] = cos_lon;

    // Geodetic to geocentric: radius plus the rotation (sd, cd) between the two verticals
    let mut sd = 0.0;
    let mut cd = 1.0;
    let mut r = EARTH_RADIUS_KM + altitude_km;
    if mode == CoordMode::Geodetic {
        let aa = WGS84_A2 * clat * clat;
        let bb = WGS84_B2 * slat * slat;
        let cc = aa + bb;
        let dd = cc.sqrt();
        r = (altitude_km * (altitude_km + 2.0 * dd) + (WGS84_A2 * aa + WGS84_B2 * bb) / cc).sqrt();
        cd = (altitude_km + dd) / r;
        sd = (WGS84_A2 - WGS84_B2) / dd * slat * clat / r;
        let s = slat;
        slat = slat * cd - clat * sd;
        clat = clat * cd + s * sd;
    }

    let ratio = EARTH_RADIUS_KM / r;
    let sqrt3 = 3.0_f64.sqrt();
    let mut p = [0.0; MAX_TERMS];
    let mut q = [0.0; MAX_TERMS];
    p[1] = 2.0 * slat;
    p[2] = 2.0 * clat;
    p[3] = 4.5 * slat * slat - 1.5;
    p[4] = 3.0 * sqrt3 * clat * slat;
    q[1] = -clat;
    q[2] = slat;
    q[3] = -3.0 * clat * slat;
    q[4] = sqrt3 * (slat * slat - clat * clat);

    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    let mut l = 1; // position in the coefficient vector
    let mut n = 0;
    let mut m = 1;
    let mut rr = 0.0;
    let mut fn_ = 0.0;
    for k in 1..=term_count(nmax) {
        if n < m {
            m = 0;
            n += 1;
            rr = ratio.powi(n as i32 + 2);
            fn_ = n as f64;
        }
        let fm = m as f64;
        if k >= 5 {
            if m == n {
                let aa = (1.0 - 0.5 / fm).sqrt();
                let j = k - n - 1;
                p[k] = (1.0 + 1.0 / fm) * aa * clat * p[j];
                q[k] = aa * (clat * q[j] + slat / fm * p[j]);
                sl[m] = sl[m - 1] * cl[1] + cl[m - 1] * sl[1];
                cl[m] = cl[m - 1] * cl[1] - sl[m - 1] * sl[1];
            } else {
                let aa = (fn_ * fn_ - fm * fm).sqrt();
                let bb = ((fn_ - 1.0) * (fn_ - 1.0) - fm * fm).sqrt() / aa;
                let cc = (2.0 * fn_ - 1.0) / aa;
                let ii = k - n;
                let j = k + 1 - 2 * n;
                p[k] = (fn_ + 1.0) * (cc * slat / fn_ * p[ii] - bb / (fn_ - 1.0) * p[j]);
                q[k] = cc * (slat * q[ii] - clat / fn_ * p[ii]) - bb * q[j];
            }
        }

        let aa = rr * coefficients.get(l);
        if m == 0 {
            x += aa * q[k];
            z -= aa * p[k];
            l += 1;
        } else {
            let bb = rr * coefficients.get(l + 1);
            let cc = aa * cl[m] + bb * sl[m];
            x += cc * q[k];
            z -= cc * p[k];
            if clat > 0.0 {
                y += (aa * sl[m] - bb * cl[m]) * fm * p[k] / ((fn_ + 1.0) * clat);
            } else {
                y += (aa * sl[m] - bb * cl[m]) * q[k] * slat;
            }
            l += 2;
        }
        m += 1;
    }

    FieldVector {
        x: x * cd + z * sd,
        y,
        z: z * cd - x * sd,
    }
}

/// Declination, inclination, horizontal and total intensity of a field vector.
///
/// A field weaker than 1e-4 nT has no direction, so both angles are NaN; a horizontal
/// component below the same floor leaves only the declination undefined. Declination uses
/// the half-angle form `2 atan2(Y, H + X)`, which has no branch cut except due south, where
/// it is pinned to pi.
pub fn derive_scalars(v: &FieldVector) -> FieldScalars {
    let horizontal = v.x.hypot(v.y);
    let total = horizontal.hypot(v.z);
    let (declination, inclination) = if total < WEAK_FIELD_NT || total.is_nan() {
        (f64::NAN, f64::NAN)
    } else {
        let inclination = v.z.atan2(horizontal);
        let declination = if horizontal < WEAK_FIELD_NT || horizontal.is_nan() {
            f64::NAN
        } else if horizontal + v.x < WEAK_FIELD_NT {
            PI
        } else {
            2.0 * v.y.atan2(horizontal + v.x)
        };
        (declination, inclination)
    };
    FieldScalars {
        declination,
        inclination,
        horizontal,
        total,
    }
}
