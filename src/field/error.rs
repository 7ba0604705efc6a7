use thiserror::Error;

/// Failures of a single field evaluation. Recoverable: callers sampling many points substitute
/// [`crate::field::FieldSample::nan`] and carry on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The selected model, or the model it must be blended with, has no coefficients
    #[error("no model data for date {date}: {reason}")]
    NoModelData { date: f64, reason: String },

    /// Coordinate modes are 1 (geodetic) and 2 (geocentric)
    #[error("invalid coordinate mode {0}, expected 1 (geodetic) or 2 (geocentric)")]
    InvalidCoordinateMode(i32),
}
