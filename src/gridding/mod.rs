//! Whole-globe products built on point queries: sampled grids, their isolines, and the dip
//! poles.
pub mod contour;
pub mod filter;
pub mod grid;
pub mod poles;

pub use contour::{contour_layer, isolines, levels, ContourOptions, ContourSegment, ContourSet, GeoPoint};
pub use filter::gaussian_blur;
pub use grid::{sample_grid, GridData, GridError, GridRequest, GridSpec, MAX_GRID_NODES};
pub use poles::{locate_dip_pole, locate_dip_poles, DipPole, Hemisphere, PoleSearch};
