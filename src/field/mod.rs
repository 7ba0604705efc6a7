//! Field synthesis: from a resolved coefficient vector to vector components and the angles
//! and intensities derived from them.
pub mod error;
pub mod evaluator;
pub mod geomag;
pub mod sample;

pub use error::FieldError;
pub use evaluator::{derive_scalars, evaluate_vector, CoordMode, FieldScalars, FieldVector};
pub use geomag::{Geomag, ValidityWarning};
pub use sample::{CompassWarning, FieldChange, FieldParameter, FieldSample};
