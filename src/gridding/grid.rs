use crate::field::{CoordMode, FieldParameter, FieldSample, Geomag};
use itertools::{Itertools, MinMaxResult};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, instrument};

type Result<T> = std::result::Result<T, GridError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// A grid needs at least two nodes along each axis to span the globe
    #[error("invalid grid dimensions {width}x{height}, both must be at least 2")]
    InvalidDimensions { width: usize, height: usize },

    /// Node count beyond what a single allocation should hold
    #[error("grid of {width}x{height} nodes is too large")]
    TooLarge { width: usize, height: usize },

    /// Step must divide the globe into at least one cell
    #[error("invalid grid step {0} degrees, expected a value in (0, 180]")]
    InvalidStep(f64),
}

/// Largest number of nodes a grid may hold, a 0.05 degree global grid.
pub const MAX_GRID_NODES: usize = 7201 * 3601;

/// Node layout of a global latitude/longitude grid. Longitudes run west to east over
/// [-180, 180] and latitudes north to south over [90, -90], both endpoints included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub width: usize,  // longitude samples
    pub height: usize, // latitude samples
}

impl GridSpec {
    /// # Errors
    /// Will return `Err` if either dimension is below 2 or the grid holds more than
    /// [`MAX_GRID_NODES`] nodes.
    pub fn new(width: usize, height: usize) -> Result<GridSpec> {
        if width < 2 || height < 2 {
            Err(GridError::InvalidDimensions { width, height })?
        }
        if width.checked_mul(height).map_or(true, |n| n > MAX_GRID_NODES) {
            Err(GridError::TooLarge { width, height })?
        }
        Ok(GridSpec { width, height })
    }

    /// A grid with nodes every `step_deg` degrees: `360/step + 1` by `180/step + 1`.
    ///
    /// # Errors
    /// Will return `Err` if `step_deg` is not in (0, 180] or is so fine that the grid would
    /// exceed [`MAX_GRID_NODES`].
    pub fn from_step(step_deg: f64) -> Result<GridSpec> {
        if !(step_deg > 0.0 && step_deg <= 180.0) {
            Err(GridError::InvalidStep(step_deg))?
        }
        let (width, height) = ((360.0 / step_deg).floor() + 1.0, (180.0 / step_deg).floor() + 1.0);
        if width * height > MAX_GRID_NODES as f64 {
            Err(GridError::TooLarge {
                width: width.min(usize::MAX as f64) as usize,
                height: height.min(usize::MAX as f64) as usize,
            })?
        }
        Self::new(width as usize, height as usize)
    }

    /// Longitude of column `x`.
    pub fn lon(&self, x: usize) -> f64 {
        x as f64 / (self.width - 1) as f64 * 360.0 - 180.0
    }

    /// Latitude of row `y`.
    pub fn lat(&self, y: usize) -> f64 {
        90.0 - y as f64 / (self.height - 1) as f64 * 180.0
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sampled values in row-major order, row 0 at 90 degrees north.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl GridData {
    pub fn spec(&self) -> GridSpec {
        GridSpec {
            width: self.width,
            height: self.height,
        }
    }

    /// Value at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get(y * self.width + x).copied()
    }

    /// Smallest and largest finite values, or `None` if there are none.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        match self.values.iter().copied().filter(|v| v.is_finite()).minmax_by(f32::total_cmp) {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some((v, v)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks(self.width)
    }
}

/// What to sample at every node of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRequest {
    pub date: f64,               // decimal year
    pub coord_mode: CoordMode,   // interpretation of latitude and altitude
    pub altitude_km: f64,        // altitude of every node
    pub parameter: FieldParameter,
    pub parallel: bool,          // evaluate rows on the rayon pool
}

impl GridRequest {
    /// A serial, sea-level, geodetic request.
    pub fn new(date: f64, parameter: FieldParameter) -> GridRequest {
        GridRequest {
            date,
            coord_mode: CoordMode::Geodetic,
            altitude_km: 0.0,
            parameter,
            parallel: false,
        }
    }
}

/// Fills one row. Nodes whose value is NaN, or whose evaluation fails, take the value already
/// stored to their west, and 0 in the first column.
fn sample_row(geomag: &Geomag, spec: &GridSpec, request: &GridRequest, y: usize, row: &mut [f32]) {
    let lat = spec.lat(y);
    let mut west = 0.0_f32;
    for (x, cell) in row.iter_mut().enumerate() {
        let sample = geomag
            .field_components(
                request.date,
                request.coord_mode,
                request.altitude_km,
                lat,
                spec.lon(x),
            )
            .unwrap_or_else(|_| FieldSample::nan(""));
        let value = request.parameter.value(&sample);
        *cell = if value.is_nan() { west } else { value as f32 };
        west = *cell;
    }
}

/// Samples `request.parameter` at every node of `spec`.
///
/// Each node depends only on its western neighbour, so rows are independent and the parallel
/// path produces exactly the serial result.
#[instrument(skip_all, fields(width = spec.width, height = spec.height, parameter = ?request.parameter))]
pub fn sample_grid(geomag: &Geomag, spec: &GridSpec, request: &GridRequest) -> GridData {
    let mut values = vec![0.0_f32; spec.len()];
    if request.parallel {
        values
            .par_chunks_mut(spec.width)
            .enumerate()
            .for_each(|(y, row)| sample_row(geomag, spec, request, y, row));
    } else {
        values
            .chunks_mut(spec.width)
            .enumerate()
            .for_each(|(y, row)| sample_row(geomag, spec, request, y, row));
    }
    debug!(nodes = values.len(), parallel = request.parallel, "sampled grid");
    GridData {
        width: spec.width,
        height: spec.height,
        values,
    }
}
