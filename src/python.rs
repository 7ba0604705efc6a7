use crate::error::GeomagError;
use crate::field::{CoordMode, FieldError, FieldParameter, Geomag};
use crate::gridding::{
    contour_layer, levels, locate_dip_poles, sample_grid, ContourOptions, GridRequest, GridSpec,
    PoleSearch,
};
use clap::ValueEnum;
use indexmap::IndexMap;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::path::PathBuf;

impl From<GeomagError> for PyErr {
    fn from(value: GeomagError) -> Self {
        PyValueError::new_err(value.to_string())
    }
}

impl From<FieldError> for PyErr {
    fn from(value: FieldError) -> Self {
        PyValueError::new_err(value.to_string())
    }
}

fn parse_parameter(name: &str) -> PyResult<FieldParameter> {
    FieldParameter::from_str(name, true).map_err(PyValueError::new_err)
}

/// A parallel request built from the keyword arguments shared by `grid` and `contours`.
fn grid_request(date: f64, parameter: &str, altitude_km: f64, coord_mode: i32) -> PyResult<GridRequest> {
    Ok(GridRequest {
        date,
        coord_mode: CoordMode::try_from(coord_mode)?,
        altitude_km,
        parameter: parse_parameter(parameter)?,
        parallel: true,
    })
}

type Segment = ((f64, f64), (f64, f64));

/// A loaded geomagnetic coefficient file.
#[pyclass(name = "Geomag", frozen)]
struct PyGeomag {
    inner: Geomag,
}

#[pymethods]
impl PyGeomag {
    /// Parses coefficient-file text.
    #[new]
    fn new(text: &str) -> PyResult<Self> {
        Ok(PyGeomag {
            inner: Geomag::parse(text)?,
        })
    }

    /// Loads a coefficient file from disk.
    #[staticmethod]
    fn from_file(path: PathBuf) -> PyResult<Self> {
        Ok(PyGeomag {
            inner: Geomag::from_file(path)?,
        })
    }

    /// Field at one point. `coord_mode` is 1 (geodetic) or 2 (geocentric).
    #[pyo3(signature = (date, lat, lon, altitude_km = 0.0, coord_mode = 1))]
    fn field(
        &self,
        py: Python<'_>,
        date: f64,
        lat: f64,
        lon: f64,
        altitude_km: f64,
        coord_mode: i32,
    ) -> PyResult<IndexMap<&'static str, PyObject>> {
        let mode = CoordMode::try_from(coord_mode)?;
        let (s, change) = self
            .inner
            .field_with_change(date, mode, altitude_km, lat, lon)?;
        let mut fields: IndexMap<&'static str, PyObject> = IndexMap::new();
        fields.insert("model", s.model_name.into_py(py));
        for (key, value) in [
            ("d", s.d_deg),
            ("i", s.i_deg),
            ("h", s.h),
            ("x", s.x),
            ("y", s.y),
            ("z", s.z),
            ("f", s.f),
            ("d_dot", change.d_min),
            ("i_dot", change.i_min),
            ("h_dot", change.h),
            ("x_dot", change.x),
            ("y_dot", change.y),
            ("z_dot", change.z),
            ("f_dot", change.f),
        ] {
            fields.insert(key, value.into_py(py));
        }
        Ok(fields)
    }

    /// Samples a global grid, returning `(width, height, values)` with rows north to south.
    #[pyo3(signature = (date, parameter, step = 1.0, blur = 0.0, altitude_km = 0.0, coord_mode = 1))]
    #[allow(clippy::too_many_arguments)]
    fn grid(
        &self,
        py: Python<'_>,
        date: f64,
        parameter: &str,
        step: f64,
        blur: f64,
        altitude_km: f64,
        coord_mode: i32,
    ) -> PyResult<(usize, usize, Vec<f32>)> {
        let spec = GridSpec::from_step(step).map_err(GeomagError::from)?;
        let request = grid_request(date, parameter, altitude_km, coord_mode)?;
        let mut grid = py.allow_threads(|| sample_grid(&self.inner, &spec, &request));
        grid.blur(blur);
        Ok((grid.width, grid.height, grid.values))
    }

    /// Isolines every `interval` over the sampled range, as `[(level, [((lon, lat), (lon, lat))])]`.
    #[pyo3(signature = (date, parameter, interval, step = 1.0, blur = 0.0, smoothing = true, altitude_km = 0.0, coord_mode = 1))]
    #[allow(clippy::too_many_arguments)]
    fn contours(
        &self,
        py: Python<'_>,
        date: f64,
        parameter: &str,
        interval: f64,
        step: f64,
        blur: f64,
        smoothing: bool,
        altitude_km: f64,
        coord_mode: i32,
    ) -> PyResult<Vec<(f64, Vec<Segment>)>> {
        let spec = GridSpec::from_step(step).map_err(GeomagError::from)?;
        let request = grid_request(date, parameter, altitude_km, coord_mode)?;
        let sets = py.allow_threads(|| {
            let mut grid = sample_grid(&self.inner, &spec, &request);
            grid.blur(blur);
            let thresholds = grid
                .value_range()
                .map(|(min, max)| levels(f64::from(min), f64::from(max), interval))
                .unwrap_or_default();
            contour_layer(&grid, &thresholds, &ContourOptions { smoothing })
        });
        Ok(sets
            .into_iter()
            .map(|set| {
                let segments = set
                    .segments
                    .iter()
                    .map(|s| ((s.start.lon, s.start.lat), (s.end.lon, s.end.lat)))
                    .collect();
                (set.level, segments)
            })
            .collect())
    }

    /// Dip poles as `[(name, lat, lon, inclination)]`, north first.
    fn dip_poles(&self, py: Python<'_>, date: f64) -> Vec<(String, f64, f64, f64)> {
        py.allow_threads(|| locate_dip_poles(&self.inner, date, &PoleSearch::default()))
            .into_iter()
            .map(|p| (p.name, p.lat, p.lon, p.inclination))
            .collect()
    }
}

/// Geomagnetic field synthesis from spherical-harmonic coefficient files.
#[pymodule]
fn geomag(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyGeomag>()?;
    Ok(())
}
