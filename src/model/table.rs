use crate::model::error::ParseError;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, ParseError>;

/// Most models a single coefficient file may declare.
pub const MAX_MODELS: usize = 30;

/// One model header from a coefficient file, e.g.
/// `   IGRF2020  2020.00 13  8  0 2020.00 2025.00   -1.0  600.0`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    pub name: String,              // model name
    pub epoch: f64,                // decimal year the coefficients refer to
    pub max_degree_main: usize,    // max1, degree of the main field block
    pub max_degree_secular: usize, // max2, degree of the secular variation block
    pub reserved_degree: usize,    // max3, unused by the synthesis
    pub year_min: f64,             // yrmin
    pub year_max: f64,             // yrmax
    pub altitude_min: f64,         // altmin, km
    pub altitude_max: f64,         // altmax, km
    pub block_start: usize,        // 0-based index of the first coefficient line
}

impl ModelRecord {
    /// Builds a record from a header line. Missing or non-numeric fields read as zero.
    fn from_header(line: &str, block_start: usize) -> ModelRecord {
        let fields: Vec<&str> = line.split_whitespace().take(9).collect();
        let number = |i: usize| -> f64 {
            fields
                .get(i)
                .and_then(|f| f.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        };
        let degree = |i: usize| -> usize {
            let value = number(i);
            if value > 0.0 {
                value as usize
            } else {
                0
            }
        };
        ModelRecord {
            name: fields.first().map(|s| s.to_string()).unwrap_or_default(),
            epoch: number(1),
            max_degree_main: degree(2),
            max_degree_secular: degree(3),
            reserved_degree: degree(4),
            year_min: number(5),
            year_max: number(6),
            altitude_min: number(7),
            altitude_max: number(8),
            block_start,
        }
    }

    /// Whether `date` lies inside the years this model claims to be valid for.
    pub fn covers_date(&self, date: f64) -> bool {
        date >= self.year_min && date <= self.year_max
    }

    /// Whether `altitude_km` lies inside the altitudes this model claims to be valid for.
    pub fn covers_altitude(&self, altitude_km: f64) -> bool {
        altitude_km >= self.altitude_min && altitude_km <= self.altitude_max
    }
}

/// A header is any line opening with at least three whitespace characters.
fn is_header(line: &str) -> bool {
    let mut chars = line.chars();
    (0..3).all(|_| chars.next().is_some_and(char::is_whitespace))
}

/// The model directory of a coefficient file, together with the file's lines so that
/// coefficient blocks can be read back by offset.
#[derive(Debug, Clone)]
pub struct ModelTable {
    records: Vec<ModelRecord>,
    lines: Vec<String>,
    min_year: f64, // minyr
    max_year: f64, // maxyr
}

impl ModelTable {
    /// Scans coefficient-file text for model headers.
    ///
    /// # Errors
    /// Will return `Err` if the text holds no headers, or more than [`MAX_MODELS`].
    pub fn parse(text: &str) -> Result<ModelTable> {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let mut records: Vec<ModelRecord> = vec![];
        for (i, line) in lines.iter().enumerate() {
            if !is_header(line) {
                continue;
            }
            if records.len() == MAX_MODELS {
                Err(ParseError::TooManyModels { max: MAX_MODELS })?
            }
            let record = ModelRecord::from_header(line, i + 1);
            debug!(
                name = %record.name,
                epoch = record.epoch,
                line = i + 1,
                "found model header"
            );
            records.push(record);
        }

        let first = records.first().ok_or(ParseError::NoValidModels)?;
        let (mut min_year, mut max_year) = (first.year_min, first.year_max);
        for record in records.iter().skip(1) {
            min_year = min_year.min(record.year_min);
            max_year = max_year.max(record.year_max);
        }
        info!(
            models = records.len(),
            min_year, max_year, "loaded model table"
        );

        Ok(ModelTable {
            records,
            lines,
            min_year,
            max_year,
        })
    }

    /// Reads and parses a coefficient file from disk.
    ///
    /// # Errors
    /// Will return `Err` if the file cannot be read or [`ModelTable::parse`] rejects it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<ModelTable> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// The models in file order.
    pub fn records(&self) -> &[ModelRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ModelRecord> {
        self.records.get(index)
    }

    /// Number of models found (nmodel).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest `year_min` over all models.
    pub fn min_year(&self) -> f64 {
        self.min_year
    }

    /// Latest `year_max` over all models.
    pub fn max_year(&self) -> f64 {
        self.max_year
    }

    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Index of the model to use for `date`: the first one still valid after `date`, or the
    /// last model when `date` is past every model's range.
    pub fn select(&self, date: f64) -> usize {
        self.records
            .iter()
            .position(|r| r.year_max > date)
            .unwrap_or(self.records.len().saturating_sub(1))
    }
}
