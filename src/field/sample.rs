use crate::utils::constants::{COMPASS_ERRATIC_NT, COMPASS_UNRELIABLE_NT};
use clap::ValueEnum;
use std::fmt;

/// The field at one place and time. Angles in degrees, everything else in nT.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample {
    pub model_name: String,
    pub d_deg: f64, // declination, east positive
    pub i_deg: f64, // inclination, down positive
    pub h: f64,     // horizontal intensity
    pub x: f64,     // north component
    pub y: f64,     // east component
    pub z: f64,     // down component
    pub f: f64,     // total intensity
}

impl FieldSample {
    /// A sample with every value NaN, for callers that keep going after a failed evaluation.
    pub fn nan(model_name: impl Into<String>) -> FieldSample {
        FieldSample {
            model_name: model_name.into(),
            d_deg: f64::NAN,
            i_deg: f64::NAN,
            h: f64::NAN,
            x: f64::NAN,
            y: f64::NAN,
            z: f64::NAN,
            f: f64::NAN,
        }
    }

    /// How far a compass can be trusted given the horizontal intensity here.
    pub fn compass_warning(&self) -> Option<CompassWarning> {
        if self.h.is_nan() || self.h < COMPASS_UNRELIABLE_NT {
            Some(CompassWarning::Unreliable)
        } else if self.h < COMPASS_ERRATIC_NT {
            Some(CompassWarning::Erratic)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassWarning {
    /// H < 5000 nT
    Erratic,
    /// H < 1000 nT, or undefined
    Unreliable,
}

impl fmt::Display for CompassWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompassWarning::Erratic => write!(
                f,
                "horizontal intensity below {COMPASS_ERRATIC_NT} nT, compass readings may be erratic"
            ),
            CompassWarning::Unreliable => write!(
                f,
                "horizontal intensity below {COMPASS_UNRELIABLE_NT} nT, compass readings are unreliable"
            ),
        }
    }
}

/// Annual rate of change of a [`FieldSample`]. Angles in arc-minutes per year, intensities in
/// nT per year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldChange {
    pub d_min: f64,
    pub i_min: f64,
    pub h: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub f: f64,
}

impl FieldChange {
    /// Difference between samples one year apart.
    pub fn between(now: &FieldSample, next_year: &FieldSample) -> FieldChange {
        let mut d_deg = next_year.d_deg - now.d_deg;
        if d_deg > 180.0 {
            d_deg -= 360.0;
        }
        if d_deg <= -180.0 {
            d_deg += 360.0;
        }
        FieldChange {
            d_min: d_deg * 60.0,
            i_min: (next_year.i_deg - now.i_deg) * 60.0,
            h: next_year.h - now.h,
            x: next_year.x - now.x,
            y: next_year.y - now.y,
            z: next_year.z - now.z,
            f: next_year.f - now.f,
        }
    }
}

/// The scalar a grid is sampled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FieldParameter {
    #[value(alias = "d")]
    Declination,
    #[value(alias = "i")]
    Inclination,
    #[value(alias = "f")]
    TotalField,
    #[value(alias = "h")]
    Horizontal,
    #[value(alias = "x")]
    North,
    #[value(alias = "y")]
    East,
    #[value(alias = "z")]
    Down,
}

impl FieldParameter {
    pub const ALL: [FieldParameter; 7] = [
        FieldParameter::Declination,
        FieldParameter::Inclination,
        FieldParameter::TotalField,
        FieldParameter::Horizontal,
        FieldParameter::North,
        FieldParameter::East,
        FieldParameter::Down,
    ];

    pub fn value(&self, sample: &FieldSample) -> f64 {
        match self {
            FieldParameter::Declination => sample.d_deg,
            FieldParameter::Inclination => sample.i_deg,
            FieldParameter::TotalField => sample.f,
            FieldParameter::Horizontal => sample.h,
            FieldParameter::North => sample.x,
            FieldParameter::East => sample.y,
            FieldParameter::Down => sample.z,
        }
    }

    /// Unit of the sampled values.
    pub fn unit(&self) -> &'static str {
        match self {
            FieldParameter::Declination | FieldParameter::Inclination => "deg",
            _ => "nT",
        }
    }
}
