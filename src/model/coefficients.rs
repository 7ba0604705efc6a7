//! Reading Schmidt quasi-normalized coefficient blocks and combining them into the single
//! coefficient vector that is valid at a requested date.
use crate::model::error::CoefficientError;
use crate::model::table::ModelRecord;

type Result<T> = std::result::Result<T, CoefficientError>;

/// Highest spherical-harmonic degree a coefficient vector can hold.
pub const MAX_DEGREE: usize = 13;

/// Slots in a coefficient vector, including the unused slot 0.
pub const MAX_COEFFICIENTS: usize = MAX_DEGREE * (MAX_DEGREE + 2) + 1;

/// Number of coefficients (g and h together) up to and including `degree`.
pub const fn coefficient_count(degree: usize) -> usize {
    degree * (degree + 2)
}

/// Number of (n, m) terms, i.e. coefficient lines, up to and including `degree`.
pub const fn term_count(degree: usize) -> usize {
    degree * (degree + 3) / 2
}

/// Which pair of value columns a coefficient line is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientPass {
    /// Main field, columns 2-3
    Main,
    /// Secular variation, columns 4-5
    Secular,
}

/// Coefficients stored 1-indexed and interleaved: g(1,0), g(1,1), h(1,1), g(2,0), ...
///
/// The array has a fixed capacity so a resolved vector lives on the caller's stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientVector {
    degree: usize,
    values: [f64; MAX_COEFFICIENTS],
}

impl CoefficientVector {
    /// An all-zero vector of the given degree, clamped to [`MAX_DEGREE`].
    pub fn zeros(degree: usize) -> CoefficientVector {
        CoefficientVector {
            degree: degree.min(MAX_DEGREE),
            values: [0.0; MAX_COEFFICIENTS],
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of meaningful coefficients, `degree * (degree + 2)`.
    pub fn len(&self) -> usize {
        coefficient_count(self.degree)
    }

    pub fn is_empty(&self) -> bool {
        self.degree == 0
    }

    /// Coefficient at 1-based position `index`; zero outside the stored range.
    pub fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    /// The meaningful coefficients, starting at position 1.
    pub fn as_slice(&self) -> &[f64] {
        &self.values[1..=self.len()]
    }

    /// Position of g(n, m).
    pub fn g_index(n: usize, m: usize) -> usize {
        if m == 0 {
            n * n
        } else {
            n * n + 2 * m - 1
        }
    }

    /// Position of h(n, m), m >= 1.
    pub fn h_index(n: usize, m: usize) -> usize {
        n * n + 2 * m
    }

    pub fn g(&self, n: usize, m: usize) -> f64 {
        self.get(Self::g_index(n, m))
    }

    pub fn h(&self, n: usize, m: usize) -> f64 {
        if m == 0 {
            0.0
        } else {
            self.get(Self::h_index(n, m))
        }
    }

    fn set(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }
}

/// The fields of one coefficient line after the optional `g`/`h` tag.
struct CoefficientLine {
    n: usize,
    m: usize,
    columns: [f64; 4], // g, h, g_sv, h_sv
}

impl CoefficientLine {
    fn parse(line: &str) -> Option<CoefficientLine> {
        let mut tokens = line.split_whitespace().peekable();
        if matches!(tokens.peek(), Some(&"g") | Some(&"h")) {
            tokens.next();
        }
        let n = tokens.next()?.parse::<usize>().ok()?;
        let m = tokens.next()?.parse::<usize>().ok()?;
        let mut columns = [0.0; 4];
        for column in columns.iter_mut() {
            match tokens.next().and_then(|t| t.parse::<f64>().ok()) {
                Some(value) => *column = value,
                None => break,
            }
        }
        Some(CoefficientLine { n, m, columns })
    }
}

/// Reads `term_count(max_degree)` coefficient lines beginning at the 0-based line `start_line`.
///
/// # Errors
/// Will return `Err` if `max_degree` exceeds [`MAX_DEGREE`], or if any line is missing or does
/// not hold the (n, m) term expected at its position.
pub fn read_coefficients(
    lines: &[String],
    start_line: usize,
    max_degree: usize,
    pass: CoefficientPass,
) -> Result<CoefficientVector> {
    if max_degree > MAX_DEGREE {
        Err(CoefficientError::DegreeTooLarge {
            model: String::new(),
            degree: max_degree,
            max: MAX_DEGREE,
        })?
    }
    let mut coefficients = CoefficientVector::zeros(max_degree);
    let mut index = 0;
    let mut line_num = start_line;
    for n in 1..=max_degree {
        for m in 0..=n {
            let text = lines.get(line_num).map(String::as_str).unwrap_or("");
            let corrupt = || CoefficientError::CorruptRecord {
                line: line_num + 1,
                expected_n: n,
                expected_m: m,
                found: text.trim().to_string(),
            };
            let row = CoefficientLine::parse(text).ok_or_else(corrupt)?;
            if row.n != n || row.m != m {
                Err(corrupt())?
            }
            let (g, h) = match pass {
                CoefficientPass::Main => (row.columns[0], row.columns[1]),
                CoefficientPass::Secular => (row.columns[2], row.columns[3]),
            };
            index += 1;
            coefficients.set(index, g);
            if m != 0 {
                index += 1;
                coefficients.set(index, h);
            }
            line_num += 1;
        }
    }
    Ok(coefficients)
}

/// Main field and secular variation of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCoefficients {
    pub main: CoefficientVector,
    pub secular: CoefficientVector,
}

impl ModelCoefficients {
    /// Reads both blocks of `record`. Returns `Ok(None)` if the block would start past the end
    /// of the file, which leaves the model without data rather than failing the load.
    ///
    /// # Errors
    /// Will return `Err` if the block is present but corrupt.
    pub fn read(lines: &[String], record: &ModelRecord) -> Result<Option<ModelCoefficients>> {
        if record.block_start >= lines.len() {
            return Ok(None);
        }
        let with_name = |e: CoefficientError| match e {
            CoefficientError::DegreeTooLarge { degree, max, .. } => {
                CoefficientError::DegreeTooLarge {
                    model: record.name.clone(),
                    degree,
                    max,
                }
            }
            other => other,
        };
        let main = read_coefficients(
            lines,
            record.block_start,
            record.max_degree_main,
            CoefficientPass::Main,
        )
        .map_err(with_name)?;
        let secular = read_coefficients(
            lines,
            record.block_start,
            record.max_degree_secular,
            CoefficientPass::Secular,
        )
        .map_err(with_name)?;
        Ok(Some(ModelCoefficients { main, secular }))
    }
}

/// Linear extrapolation of a main field by its secular variation:
/// `main + (date - epoch) * secular`.
///
/// Beyond the smaller of the two degrees the main field is copied unchanged when it is the
/// larger one, and the secular term alone is used when that is the larger one. The result has
/// the larger of the two degrees.
pub fn extrapolate(
    date: f64,
    epoch: f64,
    main: &CoefficientVector,
    secular: &CoefficientVector,
) -> CoefficientVector {
    let factor = date - epoch;
    let (nmax1, nmax2) = (main.degree(), secular.degree());
    let mut resolved = CoefficientVector::zeros(nmax1.max(nmax2));

    let k = coefficient_count(nmax1.min(nmax2));
    if nmax1 > nmax2 {
        for i in k + 1..=coefficient_count(nmax1) {
            resolved.set(i, main.get(i));
        }
    } else if nmax2 > nmax1 {
        for i in k + 1..=coefficient_count(nmax2) {
            resolved.set(i, factor * secular.get(i));
        }
    }
    for i in 1..=k {
        resolved.set(i, main.get(i) + factor * secular.get(i));
    }
    resolved
}

/// Linear interpolation between two models at epochs `epoch_a` and `epoch_b`.
///
/// Terms only one model has are faded linearly toward the model lacking them: `a` fades out as
/// `a + factor * (-a)`, `b` fades in as `factor * b`. The result has the larger degree.
pub fn interpolate(
    date: f64,
    epoch_a: f64,
    a: &CoefficientVector,
    epoch_b: f64,
    b: &CoefficientVector,
) -> CoefficientVector {
    let span = epoch_b - epoch_a;
    // Two models at the same epoch: stay on the first rather than divide by zero
    let factor = if span == 0.0 {
        0.0
    } else {
        (date - epoch_a) / span
    };
    let (nmax1, nmax2) = (a.degree(), b.degree());
    let mut resolved = CoefficientVector::zeros(nmax1.max(nmax2));

    let k = coefficient_count(nmax1.min(nmax2));
    if nmax1 > nmax2 {
        for i in k + 1..=coefficient_count(nmax1) {
            resolved.set(i, a.get(i) + factor * -a.get(i));
        }
    } else if nmax2 > nmax1 {
        for i in k + 1..=coefficient_count(nmax2) {
            resolved.set(i, factor * b.get(i));
        }
    }
    for i in 1..=k {
        resolved.set(i, a.get(i) + factor * (b.get(i) - a.get(i)));
    }
    resolved
}

/// How the coefficients of the active model are turned into a vector for a given date.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// The active model carries its own secular variation
    Extrapolation {
        epoch: f64,
        main: &'a CoefficientVector,
        secular: &'a CoefficientVector,
    },
    /// The active model has none, so blend toward the following model
    Interpolation {
        epoch_a: f64,
        a: &'a CoefficientVector,
        epoch_b: f64,
        b: &'a CoefficientVector,
    },
}

impl Resolution<'_> {
    /// The coefficient vector valid at `date`.
    pub fn resolve(&self, date: f64) -> CoefficientVector {
        match *self {
            Resolution::Extrapolation {
                epoch,
                main,
                secular,
            } => extrapolate(date, epoch, main, secular),
            Resolution::Interpolation {
                epoch_a,
                a,
                epoch_b,
                b,
            } => interpolate(date, epoch_a, a, epoch_b, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(degree: usize, values: &[f64]) -> CoefficientVector {
        let mut v = CoefficientVector::zeros(degree);
        for (i, &value) in values.iter().enumerate() {
            v.set(i + 1, value);
        }
        v
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn index_layout() {
        assert_eq!(CoefficientVector::g_index(1, 0), 1);
        assert_eq!(CoefficientVector::g_index(1, 1), 2);
        assert_eq!(CoefficientVector::h_index(1, 1), 3);
        assert_eq!(CoefficientVector::g_index(2, 0), 4);
        assert_eq!(CoefficientVector::h_index(2, 2), 8);
        assert_eq!(CoefficientVector::g_index(3, 0), 9);
        assert_eq!(coefficient_count(13) + 1, MAX_COEFFICIENTS);
        assert_eq!(term_count(2), 5);
    }

    #[test]
    fn reads_both_passes() {
        let text = lines(
            " 1  0  -29404.8       0.0        5.7        0.0\n\
             g 1  1   -1450.9    4652.5        7.4      -25.9\n\
             2  0   -2499.6       0.0      -11.0        0.0\n\
             2  1    2982.0   -2991.6       -7.0      -30.2\n\
             2  2    1677.0    -734.6       -2.1      -22.4\n",
        );
        let main = read_coefficients(&text, 0, 2, CoefficientPass::Main).unwrap();
        assert_eq!(main.as_slice(), &[
            -29404.8, -1450.9, 4652.5, -2499.6, 2982.0, -2991.6, 1677.0, -734.6
        ]);
        let secular = read_coefficients(&text, 0, 1, CoefficientPass::Secular).unwrap();
        assert_eq!(secular.degree(), 1);
        assert_eq!(secular.as_slice(), &[5.7, 7.4, -25.9]);
        assert_eq!(secular.g(2, 0), 0.0);
    }

    #[test]
    fn missing_value_columns_read_as_zero() {
        let text = lines("1 0 -30000\n1 1 -2000 5000\n");
        let main = read_coefficients(&text, 0, 1, CoefficientPass::Main).unwrap();
        assert_eq!(main.as_slice(), &[-30000.0, -2000.0, 5000.0]);
        let secular = read_coefficients(&text, 0, 1, CoefficientPass::Secular).unwrap();
        assert_eq!(secular.as_slice(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_order_term_is_corrupt() {
        let text = lines(" 1  0  -29404.8  0.0\n 2  0  -2499.6  0.0\n");
        let err = read_coefficients(&text, 0, 1, CoefficientPass::Main).unwrap_err();
        assert_eq!(
            err,
            CoefficientError::CorruptRecord {
                line: 2,
                expected_n: 1,
                expected_m: 1,
                found: "2  0  -2499.6  0.0".to_string(),
            }
        );
    }

    #[test]
    fn truncated_block_is_corrupt() {
        let text = lines(" 1  0  -29404.8  0.0\n");
        assert!(matches!(
            read_coefficients(&text, 0, 1, CoefficientPass::Main),
            Err(CoefficientError::CorruptRecord { line: 2, .. })
        ));
    }

    #[test]
    fn degree_above_capacity_is_rejected() {
        assert!(matches!(
            read_coefficients(&[], 0, MAX_DEGREE + 1, CoefficientPass::Main),
            Err(CoefficientError::DegreeTooLarge { degree: 14, .. })
        ));
    }

    #[test]
    fn extrapolate_equal_degrees() {
        let main = vector(1, &[-30000.0, -2000.0, 5000.0]);
        let secular = vector(1, &[10.0, 5.0, -10.0]);
        let resolved = extrapolate(2007.5, 2005.0, &main, &secular);
        assert_eq!(resolved.degree(), 1);
        assert_eq!(resolved.as_slice(), &[-29975.0, -1987.5, 4975.0]);
    }

    #[test]
    fn extrapolate_main_larger_keeps_high_terms() {
        let main = vector(2, &[-30000.0, -2000.0, 5000.0, -2500.0, 3000.0, -3000.0, 1700.0, -700.0]);
        let secular = vector(1, &[10.0, 5.0, -10.0]);
        let resolved = extrapolate(2010.0, 2000.0, &main, &secular);
        assert_eq!(resolved.degree(), 2);
        assert_eq!(
            resolved.as_slice(),
            &[-29900.0, -1950.0, 4900.0, -2500.0, 3000.0, -3000.0, 1700.0, -700.0]
        );
    }

    #[test]
    fn extrapolate_secular_larger_extends_range() {
        let main = vector(1, &[-30000.0, -2000.0, 5000.0]);
        let secular = vector(2, &[10.0, 5.0, -10.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let resolved = extrapolate(2002.0, 2000.0, &main, &secular);
        assert_eq!(resolved.degree(), 2);
        assert_eq!(
            resolved.as_slice(),
            &[-29980.0, -1990.0, 4980.0, 2.0, 4.0, 6.0, 8.0, 10.0]
        );
    }

    #[test]
    fn interpolate_equal_degrees_hits_both_ends() {
        let a = vector(1, &[-30000.0, -2000.0, 5000.0]);
        let b = vector(1, &[-29000.0, -1900.0, 4800.0]);
        assert_eq!(interpolate(2000.0, 2000.0, &a, 2005.0, &b), a);
        assert_eq!(interpolate(2005.0, 2000.0, &a, 2005.0, &b), b);
        let mid = interpolate(2002.5, 2000.0, &a, 2005.0, &b);
        assert_eq!(mid.as_slice(), &[-29500.0, -1950.0, 4900.0]);
    }

    #[test]
    fn interpolate_first_larger_fades_out() {
        let a = vector(2, &[-30000.0, -2000.0, 5000.0, 100.0, 200.0, 300.0, 400.0, 500.0]);
        let b = vector(1, &[-29000.0, -1900.0, 4800.0]);
        let quarter = interpolate(2001.25, 2000.0, &a, 2005.0, &b);
        assert_eq!(quarter.degree(), 2);
        assert_eq!(
            quarter.as_slice(),
            &[-29750.0, -1975.0, 4950.0, 75.0, 150.0, 225.0, 300.0, 375.0]
        );
        let end = interpolate(2005.0, 2000.0, &a, 2005.0, &b);
        assert_eq!(&end.as_slice()[..3], b.as_slice());
        assert!(end.as_slice()[3..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn interpolate_second_larger_fades_in() {
        let a = vector(1, &[-30000.0, -2000.0, 5000.0]);
        let b = vector(2, &[-29000.0, -1900.0, 4800.0, 100.0, 200.0, 300.0, 400.0, 500.0]);
        let start = interpolate(2000.0, 2000.0, &a, 2005.0, &b);
        assert_eq!(&start.as_slice()[..3], a.as_slice());
        assert!(start.as_slice()[3..].iter().all(|&v| v == 0.0));
        let end = interpolate(2005.0, 2000.0, &a, 2005.0, &b);
        assert_eq!(end, b);
    }

    #[test]
    fn resolution_dispatches() {
        let main = vector(1, &[-30000.0, -2000.0, 5000.0]);
        let secular = vector(1, &[10.0, 5.0, -10.0]);
        let extrapolation = Resolution::Extrapolation {
            epoch: 2000.0,
            main: &main,
            secular: &secular,
        };
        assert_eq!(extrapolation.resolve(2001.0).as_slice(), &[-29990.0, -1995.0, 4990.0]);
        let interpolation = Resolution::Interpolation {
            epoch_a: 2000.0,
            a: &main,
            epoch_b: 2000.0,
            b: &secular,
        };
        assert_eq!(interpolation.resolve(2003.0), main);
    }
}
