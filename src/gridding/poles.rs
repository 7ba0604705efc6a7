use crate::field::{CoordMode, Geomag};
use itertools::iproduct;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Where the field points straight down (north) or straight up (south).
#[derive(Debug, Clone, PartialEq)]
pub struct DipPole {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub inclination: f64, // degrees, at the located point
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// Larger is closer to this hemisphere's pole.
    fn score(&self, inclination: f64) -> f64 {
        match self {
            Hemisphere::North => inclination,
            Hemisphere::South => -inclination,
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Hemisphere::North => write!(f, "North dip pole"),
            Hemisphere::South => write!(f, "South dip pole"),
        }
    }
}

/// Tuning of the coarse-to-fine inclination search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoleSearch {
    pub coord_mode: CoordMode,
    pub altitude_km: f64,
    pub coarse_lat_step: f64, // degrees
    pub coarse_lon_step: f64, // degrees
    pub rounds: usize,        // refinement rounds
    pub radius: f64,          // initial half-width of the refinement square, degrees
    pub step: f64,            // initial refinement step, degrees
    pub min_inclination: f64, // |I| a candidate must exceed to be reported
}

impl Default for PoleSearch {
    fn default() -> Self {
        PoleSearch {
            coord_mode: CoordMode::Geodetic,
            altitude_km: 0.0,
            coarse_lat_step: 10.0,
            coarse_lon_step: 20.0,
            rounds: 3,
            radius: 5.0,
            step: 1.0,
            min_inclination: 80.0,
        }
    }
}

impl PoleSearch {
    /// Coarse steps must be positive, finite and no wider than the globe; refinement steps
    /// must not be negative.
    fn has_valid_steps(&self) -> bool {
        let coarse = |step: f64, span: f64| step.is_finite() && step > 0.0 && step <= span;
        coarse(self.coarse_lat_step, 180.0)
            && coarse(self.coarse_lon_step, 360.0)
            && self.step.is_finite()
            && self.step >= 0.0
            && self.radius.is_finite()
    }
}

/// Wraps a longitude into [-180, 180).
fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Offsets `-radius..=radius` in whole multiples of `step`.
fn offsets(radius: f64, step: f64) -> impl Iterator<Item = f64> + Clone {
    let n = if step > 0.0 {
        (radius / step).round() as i64
    } else {
        0
    };
    (-n..=n).map(move |k| k as f64 * step)
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    lat: f64,
    lon: f64,
    inclination: f64,
}

/// Searches for the dip pole of one hemisphere at `date`.
///
/// Returns `None` if no evaluable point was found or the best point's inclination does not
/// exceed `search.min_inclination` in magnitude.
#[instrument(skip(geomag, search))]
pub fn locate_dip_pole(
    geomag: &Geomag,
    date: f64,
    hemisphere: Hemisphere,
    search: &PoleSearch,
) -> Option<DipPole> {
    let inclination = |lat: f64, lon: f64| -> Option<Candidate> {
        let sample = geomag
            .field_components(date, search.coord_mode, search.altitude_km, lat, lon)
            .ok()?;
        sample.i_deg.is_finite().then_some(Candidate {
            lat,
            lon,
            inclination: sample.i_deg,
        })
    };
    let better = |candidate: Candidate, best: Option<Candidate>| match best {
        Some(b) if hemisphere.score(candidate.inclination) <= hemisphere.score(b.inclination) => b,
        _ => candidate,
    };

    if !search.has_valid_steps() {
        warn!(?search, "pole search steps must be positive and finite");
        return None;
    }
    let lat_count = (180.0 / search.coarse_lat_step).floor() as i64;
    let lon_count = (360.0 / search.coarse_lon_step).ceil() as i64;
    let lats = (0..=lat_count).map(|i| -90.0 + i as f64 * search.coarse_lat_step);
    let lons = (0..lon_count)
        .map(|i| -180.0 + i as f64 * search.coarse_lon_step)
        .filter(|&lon| lon < 180.0);
    let mut best = iproduct!(lats, lons)
        .filter_map(|(lat, lon)| inclination(lat, lon))
        .fold(None, |best, c| Some(better(c, best)));
    debug!(?best, "coarse pass");

    let (mut radius, mut step) = (search.radius, search.step);
    for round in 0..search.rounds {
        let Some(centre) = best else { break };
        best = iproduct!(offsets(radius, step), offsets(radius, step))
            .filter_map(|(dlat, dlon)| {
                inclination(
                    (centre.lat + dlat).clamp(-90.0, 90.0),
                    wrap_lon(centre.lon + dlon),
                )
            })
            .fold(best, |best, c| Some(better(c, best)));
        debug!(round, radius, step, ?best, "refined");
        radius /= 2.0;
        step /= 2.0;
    }

    let best = best?;
    if best.inclination.abs() <= search.min_inclination {
        warn!(
            %hemisphere,
            lat = best.lat,
            lon = best.lon,
            inclination = best.inclination,
            "rejecting dip pole candidate"
        );
        return None;
    }
    Some(DipPole {
        name: hemisphere.to_string(),
        lat: best.lat,
        lon: best.lon,
        inclination: best.inclination,
    })
}

/// Both dip poles, north first. Holds 0 to 2 entries.
pub fn locate_dip_poles(geomag: &Geomag, date: f64, search: &PoleSearch) -> Vec<DipPole> {
    [Hemisphere::North, Hemisphere::South]
        .into_iter()
        .filter_map(|hemisphere| locate_dip_pole(geomag, date, hemisphere, search))
        .collect()
}
