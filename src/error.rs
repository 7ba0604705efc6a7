use crate::field::FieldError;
use crate::gridding::grid::GridError;
use crate::model::{CoefficientError, ParseError};
use crate::utils::time::DateError;
use thiserror::Error;

/// Every error the crate can surface to a caller.
#[derive(Error, Debug)]
pub enum GeomagError {
    /// Coefficient file has no usable model directory
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// A model's coefficient block is corrupt
    #[error("{0}")]
    Coefficient(#[from] CoefficientError),

    /// A field query could not be answered
    #[error("{0}")]
    Field(#[from] FieldError),

    /// Invalid grid request
    #[error("{0}")]
    Grid(#[from] GridError),

    /// Unrecognised date
    #[error("{0}")]
    Date(#[from] DateError),
}
