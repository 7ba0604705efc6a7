//! Marching-squares isolines over a [`GridData`].
//!
//! Every 2x2 block of nodes is a cell. Its four corners are classified as above or below the
//! level, the resulting 4-bit code picks which cell edges the isoline crosses, and each crossing
//! becomes one segment endpoint. Segments are emitted independently per cell; joining them into
//! polylines is left to the renderer.
use crate::gridding::grid::GridData;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// A point in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourSegment {
    pub start: GeoPoint,
    pub end: GeoPoint,
}

/// All segments of one isoline level.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourSet {
    pub level: f64,
    pub segments: Vec<ContourSegment>,
}

impl ContourSet {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourOptions {
    /// Place crossings by linear interpolation between corner values instead of at edge
    /// midpoints
    pub smoothing: bool,
}

impl Default for ContourOptions {
    fn default() -> Self {
        ContourOptions { smoothing: true }
    }
}

/// A side of a cell, named as seen with north up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,    // nw -> ne
    Right,  // ne -> se
    Bottom, // sw -> se
    Left,   // nw -> sw
}

pub const NW: u8 = 8;
pub const NE: u8 = 4;
pub const SE: u8 = 2;
pub const SW: u8 = 1;

/// Segments crossing a cell for each corner code. The saddles 5 and 10 cut off their two
/// above-level corners separately, as if the cell centre were below the level.
const SEGMENTS: [&[(Edge, Edge)]; 16] = [
    &[],
    &[(Edge::Left, Edge::Bottom)],
    &[(Edge::Bottom, Edge::Right)],
    &[(Edge::Left, Edge::Right)],
    &[(Edge::Top, Edge::Right)],
    &[(Edge::Top, Edge::Right), (Edge::Left, Edge::Bottom)],
    &[(Edge::Top, Edge::Bottom)],
    &[(Edge::Left, Edge::Top)],
    &[(Edge::Left, Edge::Top)],
    &[(Edge::Top, Edge::Bottom)],
    &[(Edge::Left, Edge::Top), (Edge::Bottom, Edge::Right)],
    &[(Edge::Top, Edge::Right)],
    &[(Edge::Left, Edge::Right)],
    &[(Edge::Bottom, Edge::Right)],
    &[(Edge::Left, Edge::Bottom)],
    &[],
];

/// Corner values of one cell.
#[derive(Debug, Clone, Copy)]
struct Cell {
    nw: f64,
    ne: f64,
    se: f64,
    sw: f64,
}

impl Cell {
    fn has_nan(&self) -> bool {
        self.nw.is_nan() || self.ne.is_nan() || self.se.is_nan() || self.sw.is_nan()
    }

    /// Endpoint values of `edge`, in the direction the crossing is measured.
    fn edge_values(&self, edge: Edge) -> (f64, f64) {
        match edge {
            Edge::Top => (self.nw, self.ne),
            Edge::Right => (self.ne, self.se),
            Edge::Bottom => (self.sw, self.se),
            Edge::Left => (self.nw, self.sw),
        }
    }
}

/// Corner code of a cell: one bit per corner strictly above `level`.
pub fn cell_code(nw: f64, ne: f64, se: f64, sw: f64, level: f64) -> u8 {
    let bit = |v: f64, b: u8| if v > level { b } else { 0 };
    bit(nw, NW) | bit(ne, NE) | bit(se, SE) | bit(sw, SW)
}

/// The edge pairs an isoline crosses in a cell with the given corner code.
pub fn cell_segments(code: u8) -> &'static [(Edge, Edge)] {
    SEGMENTS[usize::from(code & 0x0f)]
}

/// Fraction of the way from `v1` to `v2` at which `level` is crossed.
fn crossing(v1: f64, v2: f64, level: f64, smoothing: bool) -> f64 {
    if !smoothing || v1 == v2 {
        0.5
    } else {
        (level - v1) / (v2 - v1)
    }
}

/// Crossing point on `edge` of the cell whose north-west corner is (x, y), in fractional grid
/// coordinates.
fn edge_point(x: usize, y: usize, edge: Edge, t: f64) -> (f64, f64) {
    let (x, y) = (x as f64, y as f64);
    match edge {
        Edge::Top => (x + t, y),
        Edge::Right => (x + 1.0, y + t),
        Edge::Bottom => (x + t, y + 1.0),
        Edge::Left => (x, y + t),
    }
}

fn to_geo(grid: &GridData, (fx, fy): (f64, f64)) -> GeoPoint {
    GeoPoint {
        lon: fx / (grid.width - 1) as f64 * 360.0 - 180.0,
        lat: 90.0 - fy / (grid.height - 1) as f64 * 180.0,
    }
}

/// Extracts the isoline at `level`.
///
/// Cells with a NaN corner are skipped, as are segments spanning more than 180 degrees of
/// longitude.
#[instrument(skip(grid, options), fields(width = grid.width, height = grid.height))]
pub fn isolines(grid: &GridData, level: f64, options: &ContourOptions) -> ContourSet {
    let mut segments = vec![];
    if grid.width < 2 || grid.height < 2 || grid.values.len() != grid.width * grid.height {
        return ContourSet { level, segments };
    }
    let at = |x: usize, y: usize| f64::from(grid.values[y * grid.width + x]);

    for y in 0..grid.height - 1 {
        for x in 0..grid.width - 1 {
            let cell = Cell {
                nw: at(x, y),
                ne: at(x + 1, y),
                se: at(x + 1, y + 1),
                sw: at(x, y + 1),
            };
            if cell.has_nan() {
                continue;
            }
            let code = cell_code(cell.nw, cell.ne, cell.se, cell.sw, level);
            for &(a, b) in cell_segments(code) {
                let point = |edge: Edge| {
                    let (v1, v2) = cell.edge_values(edge);
                    to_geo(grid, edge_point(x, y, edge, crossing(v1, v2, level, options.smoothing)))
                };
                let segment = ContourSegment {
                    start: point(a),
                    end: point(b),
                };
                if (segment.start.lon - segment.end.lon).abs() > 180.0 {
                    continue;
                }
                segments.push(segment);
            }
        }
    }
    debug!(segments = segments.len(), "extracted isoline");
    ContourSet { level, segments }
}

/// Isolines for several levels, one set per level in the order given.
pub fn contour_layer(grid: &GridData, levels: &[f64], options: &ContourOptions) -> Vec<ContourSet> {
    levels
        .par_iter()
        .map(|&level| isolines(grid, level, options))
        .collect()
}

/// Every multiple of `interval` within `[min, max]`, ascending. Empty when `interval` is not a
/// positive finite number.
pub fn levels(min: f64, max: f64, interval: f64) -> Vec<f64> {
    if !(interval > 0.0 && interval.is_finite() && min.is_finite() && max.is_finite()) {
        return vec![];
    }
    let first = (min / interval).ceil() as i64;
    let last = (max / interval).floor() as i64;
    (first..=last).map(|k| k as f64 * interval).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_unordered::assert_eq_unordered;
    use std::collections::HashSet;

    fn crosses(code: u8, edge: Edge) -> bool {
        let above = |bit: u8| code & bit != 0;
        match edge {
            Edge::Top => above(NW) != above(NE),
            Edge::Right => above(NE) != above(SE),
            Edge::Bottom => above(SW) != above(SE),
            Edge::Left => above(NW) != above(SW),
        }
    }

    #[test]
    fn lookup_table_covers_every_code() {
        let all = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];
        for code in 0..16u8 {
            let segments = cell_segments(code);
            let used: Vec<Edge> = segments.iter().flat_map(|&(a, b)| [a, b]).collect();
            let unique: HashSet<Edge> = used.iter().copied().collect();
            assert_eq!(used.len(), unique.len(), "code {code} reuses an edge");
            let crossed: HashSet<Edge> = all.iter().copied().filter(|&e| crosses(code, e)).collect();
            assert_eq!(unique, crossed, "code {code}");
            let expected = match code {
                0 | 15 => 0,
                5 | 10 => 2,
                _ => 1,
            };
            assert_eq!(segments.len(), expected, "code {code}");
        }
    }

    #[test]
    fn saddles_cut_off_high_corners() {
        assert_eq!(
            cell_segments(NE | SW),
            &[(Edge::Top, Edge::Right), (Edge::Left, Edge::Bottom)]
        );
        assert_eq!(
            cell_segments(NW | SE),
            &[(Edge::Left, Edge::Top), (Edge::Bottom, Edge::Right)]
        );
    }

    #[test]
    fn codes_use_strict_comparison() {
        assert_eq!(cell_code(1.0, 1.0, 1.0, 1.0, 1.0), 0);
        assert_eq!(cell_code(2.0, 0.0, 0.0, 0.0, 1.0), NW);
        assert_eq!(cell_code(2.0, 2.0, 2.0, 2.0, 1.0), 15);
        assert_eq!(cell_code(0.0, 0.0, 2.0, 2.0, 1.0), SE | SW);
    }

    fn grid(width: usize, height: usize, values: &[f32]) -> GridData {
        GridData {
            width,
            height,
            values: values.to_vec(),
        }
    }

    #[test]
    fn interpolates_crossings() {
        // Nodes every 90 degrees, one high node on the equator at -180
        let g = grid(5, 3, &[0.0, 0.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let set = isolines(&g, 1.0, &ContourOptions::default());
        assert_eq!(set.level, 1.0);
        assert_eq!(
            set.segments,
            vec![
                ContourSegment {
                    start: GeoPoint { lon: -180.0, lat: 67.5 },
                    end: GeoPoint { lon: -112.5, lat: 0.0 },
                },
                ContourSegment {
                    start: GeoPoint { lon: -180.0, lat: -67.5 },
                    end: GeoPoint { lon: -112.5, lat: 0.0 },
                },
            ]
        );
    }

    #[test]
    fn midpoints_without_smoothing() {
        let g = grid(3, 2, &[0.0, 0.0, 0.0, 0.0, 4.0, 0.0]);
        let set = isolines(&g, 1.0, &ContourOptions { smoothing: false });
        // The high node is shared by two cells, giving a wedge of two segments
        assert_eq_unordered!(
            set.segments,
            vec![
                ContourSegment {
                    start: GeoPoint { lon: 0.0, lat: 0.0 },
                    end: GeoPoint { lon: 90.0, lat: -90.0 },
                },
                ContourSegment {
                    start: GeoPoint { lon: -90.0, lat: -90.0 },
                    end: GeoPoint { lon: 0.0, lat: 0.0 },
                },
            ]
        );
    }

    #[test]
    fn drops_segments_across_the_dateline() {
        // A single cell spans all longitudes, so a crossing from its west to east edge wraps
        let g = grid(2, 2, &[0.0, 0.0, 4.0, 4.0]);
        assert!(isolines(&g, 1.0, &ContourOptions::default()).is_empty());
    }

    #[test]
    fn skips_cells_with_nan() {
        let g = grid(3, 2, &[0.0, f32::NAN, 0.0, 4.0, 4.0, 4.0]);
        assert!(isolines(&g, 1.0, &ContourOptions::default()).is_empty());
        let g = grid(3, 3, &[0.0, f32::NAN, 0.0, 0.0, 0.0, 0.0, 4.0, 4.0, 4.0]);
        assert_eq!(isolines(&g, 1.0, &ContourOptions::default()).len(), 2);
    }

    #[test]
    fn flat_edges_cross_at_midpoint() {
        assert_eq!(crossing(3.0, 3.0, 3.0, true), 0.5);
        assert_eq!(crossing(0.0, 4.0, 1.0, true), 0.25);
        assert_eq!(crossing(0.0, 4.0, 1.0, false), 0.5);
    }

    #[test]
    fn layer_keeps_level_order() {
        let g = grid(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let sets = contour_layer(&g, &[2.5, 0.5, 1.5], &ContourOptions::default());
        assert_eq!(sets.iter().map(|s| s.level).collect::<Vec<_>>(), vec![2.5, 0.5, 1.5]);
        for set in &sets {
            assert_eq!(set, &isolines(&g, set.level, &ContourOptions::default()));
        }
        assert_eq!(sets[0].len(), 1);
    }

    #[test]
    fn generates_levels() {
        assert_eq!(levels(-12.0, 12.0, 5.0), vec![-10.0, -5.0, 0.0, 5.0, 10.0]);
        assert_eq!(levels(10.0, 20.0, 10.0), vec![10.0, 20.0]);
        assert!(levels(1.0, 2.0, 0.0).is_empty());
        assert!(levels(3.0, 1.0, 1.0).is_empty());
    }
}
