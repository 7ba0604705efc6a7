use crate::error::GeomagError;
use crate::field::error::FieldError;
use crate::field::evaluator::{derive_scalars, evaluate_vector, CoordMode};
use crate::field::sample::{FieldChange, FieldSample};
use crate::model::coefficients::{CoefficientVector, ModelCoefficients, Resolution};
use crate::model::error::CoefficientError;
use crate::model::table::{ModelRecord, ModelTable};
use crate::utils::constants::POLE_TOLERANCE_DEG;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, FieldError>;

/// Conditions under which a result is computed but falls outside what the model claims to
/// describe.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidityWarning {
    /// The date lies outside every model's year range, so the field is extrapolated
    DateOutOfRange { date: f64, min_year: f64, max_year: f64 },
    /// The altitude lies outside the selected model's altitude range
    AltitudeOutOfRange {
        model: String,
        altitude_km: f64,
        min_km: f64,
        max_km: f64,
    },
}

impl fmt::Display for ValidityWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidityWarning::DateOutOfRange {
                date,
                min_year,
                max_year,
            } => write!(
                f,
                "date {date} is outside the model range {min_year} - {max_year}"
            ),
            ValidityWarning::AltitudeOutOfRange {
                model,
                altitude_km,
                min_km,
                max_km,
            } => write!(
                f,
                "altitude {altitude_km} km is outside the {model} range {min_km} - {max_km} km"
            ),
        }
    }
}

/// A loaded coefficient file, ready for point queries.
///
/// Immutable once built: every query resolves coefficients into its own scratch vector, so a
/// shared `&Geomag` can serve any number of threads.
#[derive(Debug, Clone)]
pub struct Geomag {
    table: ModelTable,
    models: Vec<Option<ModelCoefficients>>,
}

impl Geomag {
    /// Reads the coefficient blocks of every model in `table`.
    ///
    /// # Errors
    /// Will return `Err` if any coefficient block is corrupt.
    pub fn new(table: ModelTable) -> std::result::Result<Geomag, CoefficientError> {
        let models = table
            .records()
            .iter()
            .map(|record| ModelCoefficients::read(table.lines(), record))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        info!(
            models = models.len(),
            without_data = models.iter().filter(|m| m.is_none()).count(),
            "read model coefficients"
        );
        Ok(Geomag { table, models })
    }

    /// Parses coefficient-file text.
    ///
    /// # Errors
    /// Will return `Err` if the model directory or any coefficient block is invalid.
    pub fn parse(text: &str) -> std::result::Result<Geomag, GeomagError> {
        Ok(Geomag::new(ModelTable::parse(text)?)?)
    }

    /// Loads a coefficient file from disk.
    ///
    /// # Errors
    /// Will return `Err` if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Geomag, GeomagError> {
        Ok(Geomag::new(ModelTable::from_file(path)?)?)
    }

    pub fn table(&self) -> &ModelTable {
        &self.table
    }

    /// Coefficients of model `index`, if its block was present in the file.
    pub fn coefficients(&self, index: usize) -> Option<&ModelCoefficients> {
        self.models.get(index).and_then(Option::as_ref)
    }

    fn no_data(date: f64, reason: String) -> FieldError {
        FieldError::NoModelData { date, reason }
    }

    /// Chooses the model for `date` and how its coefficients are brought to that date.
    fn resolution(&self, date: f64) -> Result<(&ModelRecord, Resolution<'_>)> {
        let index = self.table.select(date);
        let record = self
            .table
            .record(index)
            .ok_or_else(|| Self::no_data(date, format!("no model at index {index}")))?;
        let coefficients = self.coefficients(index).ok_or_else(|| {
            Self::no_data(date, format!("model {} has no coefficient block", record.name))
        })?;

        if record.max_degree_secular != 0 {
            return Ok((
                record,
                Resolution::Extrapolation {
                    epoch: record.epoch,
                    main: &coefficients.main,
                    secular: &coefficients.secular,
                },
            ));
        }

        let next = self.table.record(index + 1).ok_or_else(|| {
            Self::no_data(
                date,
                format!("model {} has no secular variation and no successor", record.name),
            )
        })?;
        let next_coefficients = self.coefficients(index + 1).ok_or_else(|| {
            Self::no_data(date, format!("model {} has no coefficient block", next.name))
        })?;
        Ok((
            record,
            Resolution::Interpolation {
                epoch_a: record.epoch,
                a: &coefficients.main,
                epoch_b: next.epoch,
                b: &next_coefficients.main,
            },
        ))
    }

    /// The coefficient vector valid at `date`.
    ///
    /// # Errors
    /// Will return `Err` if the model for `date` lacks the data to resolve it.
    pub fn resolve_coefficients(&self, date: f64) -> Result<CoefficientVector> {
        let (_, resolution) = self.resolution(date)?;
        Ok(resolution.resolve(date))
    }

    /// Field at one location. `lat`/`lon` in degrees, `altitude_km` above the ellipsoid
    /// (geodetic) or the reference sphere (geocentric).
    ///
    /// Dates outside every model's range are extrapolated without complaint; see
    /// [`Geomag::validity`] to flag them.
    ///
    /// # Errors
    /// Will return `Err` if the selected model, or the model it must be interpolated
    /// toward, has no coefficients.
    pub fn field_components(
        &self,
        date: f64,
        mode: CoordMode,
        altitude_km: f64,
        lat: f64,
        lon: f64,
    ) -> Result<FieldSample> {
        let (record, resolution) = self.resolution(date)?;
        let coefficients = resolution.resolve(date);
        Ok(sample_at(&record.name, &coefficients, mode, altitude_km, lat, lon))
    }

    /// Field at one location together with its annual rate of change, from a second
    /// evaluation one year later using the same model selection.
    ///
    /// # Errors
    /// Will return `Err` under the same conditions as [`Geomag::field_components`].
    pub fn field_with_change(
        &self,
        date: f64,
        mode: CoordMode,
        altitude_km: f64,
        lat: f64,
        lon: f64,
    ) -> Result<(FieldSample, FieldChange)> {
        let (record, resolution) = self.resolution(date)?;
        let now = resolution.resolve(date);
        let next_year = resolution.resolve(date + 1.0);
        debug!(model = %record.name, date, "evaluating field with annual change");

        let sample = sample_at(&record.name, &now, mode, altitude_km, lat, lon);
        let later = sample_at(&record.name, &next_year, mode, altitude_km, lat, lon);
        let change = FieldChange::between(&sample, &later);
        Ok((sample, change))
    }

    /// Ways in which a query at `date` and `altitude_km` leaves the models' stated ranges.
    pub fn validity(&self, date: f64, altitude_km: f64) -> Vec<ValidityWarning> {
        let mut warnings = vec![];
        if !(date >= self.table.min_year() && date <= self.table.max_year()) {
            warnings.push(ValidityWarning::DateOutOfRange {
                date,
                min_year: self.table.min_year(),
                max_year: self.table.max_year(),
            });
        }
        if let Some(record) = self.table.record(self.table.select(date)) {
            if !record.covers_altitude(altitude_km) {
                warnings.push(ValidityWarning::AltitudeOutOfRange {
                    model: record.name.clone(),
                    altitude_km,
                    min_km: record.altitude_min,
                    max_km: record.altitude_max,
                });
            }
        }
        warnings
    }
}

/// Evaluates one resolved coefficient vector into a sample, blanking the horizontal
/// direction within the pole tolerance.
fn sample_at(
    model_name: &str,
    coefficients: &CoefficientVector,
    mode: CoordMode,
    altitude_km: f64,
    lat: f64,
    lon: f64,
) -> FieldSample {
    let vector = evaluate_vector(mode, lat, lon, altitude_km, coefficients);
    let scalars = derive_scalars(&vector);
    let mut sample = FieldSample {
        model_name: model_name.to_string(),
        d_deg: scalars.declination.to_degrees(),
        i_deg: scalars.inclination.to_degrees(),
        h: scalars.horizontal,
        x: vector.x,
        y: vector.y,
        z: vector.z,
        f: scalars.total,
    };
    if 90.0 - lat.abs() <= POLE_TOLERANCE_DEG {
        sample.x = f64::NAN;
        sample.y = f64::NAN;
        sample.d_deg = f64::NAN;
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    // DIP2000 has no secular variation, so dates before 2005 interpolate toward DIP2005
    const TWO_EPOCHS: &str = concat!(
        "   DIP2000  2000.00  1  0  0 2000.00 2005.00   -1.0  600.0\n",
        " 1  0  -30000.0       0.0        0.0        0.0\n",
        " 1  1   -2000.0    5000.0        0.0        0.0\n",
        "   DIP2005  2005.00  1  1  0 2005.00 2010.00   -1.0  600.0\n",
        " 1  0  -29000.0       0.0       10.0        0.0\n",
        " 1  1   -1900.0    4800.0        5.0      -10.0\n",
    );

    fn geomag() -> Geomag {
        Geomag::parse(TWO_EPOCHS).unwrap()
    }

    #[test]
    fn interpolates_before_last_model() {
        let g = geomag();
        let gh = g.resolve_coefficients(2002.5).unwrap();
        assert_eq!(gh.as_slice(), &[-29500.0, -1950.0, 4900.0]);
    }

    #[test]
    fn extrapolates_with_secular_variation() {
        let g = geomag();
        let gh = g.resolve_coefficients(2007.0).unwrap();
        assert_eq!(gh.as_slice(), &[-28980.0, -1890.0, 4780.0]);
        // Past the end of every range: still the last model, no error
        let gh = g.resolve_coefficients(2020.0).unwrap();
        assert_eq!(gh.as_slice(), &[-28850.0, -1825.0, 4650.0]);
    }

    #[test]
    fn last_model_without_secular_variation_has_no_data() {
        let text = concat!(
            "   ONLY2000  2000.00  1  0  0 2000.00 2005.00   -1.0  600.0\n",
            " 1  0  -30000.0       0.0\n",
            " 1  1   -2000.0    5000.0\n",
        );
        let g = Geomag::parse(text).unwrap();
        assert!(matches!(
            g.field_components(2001.0, CoordMode::Geodetic, 0.0, 10.0, 10.0),
            Err(FieldError::NoModelData { .. })
        ));
    }

    #[test]
    fn missing_block_has_no_data() {
        let text = concat!(
            "   A2000  2000.00  1  1  0 2000.00 2005.00   -1.0  600.0\n",
            " 1  0  -30000.0       0.0        0.0        0.0\n",
            " 1  1   -2000.0    5000.0        0.0        0.0\n",
            "   B2005  2005.00  1  1  0 2005.00 2010.00   -1.0  600.0",
        );
        let g = Geomag::parse(text).unwrap();
        assert!(g.coefficients(1).is_none());
        assert!(g.field_components(2001.0, CoordMode::Geodetic, 0.0, 0.0, 0.0).is_ok());
        assert!(matches!(
            g.field_components(2006.0, CoordMode::Geodetic, 0.0, 0.0, 0.0),
            Err(FieldError::NoModelData { .. })
        ));
    }

    #[test]
    fn corrupt_block_fails_the_load() {
        let text = concat!(
            "   A2000  2000.00  1  1  0 2000.00 2005.00   -1.0  600.0\n",
            " 1  1   -2000.0    5000.0        0.0        0.0\n",
        );
        assert!(matches!(
            Geomag::parse(text),
            Err(GeomagError::Coefficient(CoefficientError::CorruptRecord { line: 2, .. }))
        ));
    }

    #[test]
    fn poles_blank_horizontal_direction() {
        let g = geomag();
        for lat in [90.0, -90.0, 89.9995] {
            let s = g
                .field_components(2000.0, CoordMode::Geodetic, 0.0, lat, 15.0)
                .unwrap();
            assert!(s.x.is_nan() && s.y.is_nan() && s.d_deg.is_nan());
            assert!(s.z.is_finite() && s.i_deg.is_finite() && s.f.is_finite());
        }
        let s = g
            .field_components(2000.0, CoordMode::Geodetic, 0.0, 89.99, 15.0)
            .unwrap();
        assert!(s.x.is_finite() && s.d_deg.is_finite());
    }

    #[test]
    fn annual_change_matches_two_evaluations() {
        let g = geomag();
        let (sample, change) = g
            .field_with_change(2006.0, CoordMode::Geocentric, 0.0, 30.0, 40.0)
            .unwrap();
        let later = g
            .field_components(2007.0, CoordMode::Geocentric, 0.0, 30.0, 40.0)
            .unwrap();
        assert!(is_close!(change.z, later.z - sample.z, abs_tol = 1e-9));
        assert!(is_close!(change.f, later.f - sample.f, abs_tol = 1e-9));
        assert!(is_close!(change.d_min, (later.d_deg - sample.d_deg) * 60.0, abs_tol = 1e-9));
    }

    #[test]
    fn validity_warnings() {
        let g = geomag();
        assert!(g.validity(2003.0, 100.0).is_empty());
        assert_eq!(
            g.validity(2012.0, 0.0),
            vec![ValidityWarning::DateOutOfRange {
                date: 2012.0,
                min_year: 2000.0,
                max_year: 2010.0
            }]
        );
        assert!(matches!(
            g.validity(2003.0, 1000.0).as_slice(),
            [ValidityWarning::AltitudeOutOfRange { .. }]
        ));
    }
}
