//! Geomagnetic field synthesis from spherical-harmonic coefficient files, with whole-globe
//! grids, isolines and dip-pole location built on top.
pub mod error;
pub mod field;
pub mod gridding;
pub mod model;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use error::GeomagError;
pub use field::{CoordMode, FieldChange, FieldError, FieldParameter, FieldSample, Geomag};
pub use gridding::{ContourOptions, ContourSet, DipPole, GridData, GridRequest, GridSpec, PoleSearch};
pub use model::{ModelRecord, ModelTable};
