//! Coefficient-file handling: the model directory and the spherical-harmonic coefficients
//! each model carries.
pub mod coefficients;
pub mod error;
pub mod table;

pub use coefficients::{CoefficientPass, CoefficientVector, ModelCoefficients, Resolution};
pub use error::{CoefficientError, ParseError};
pub use table::{ModelRecord, ModelTable};
