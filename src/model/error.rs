use thiserror::Error;

/// Failures while reading the model directory out of a coefficient file
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file declares more models than a table can hold
    #[error("coefficient file declares more than {max} models")]
    TooManyModels { max: usize },

    /// No header lines were found
    #[error("no model headers found in coefficient file")]
    NoValidModels,

    /// The coefficient file could not be read
    #[error("unable to read coefficient file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while reading a model's coefficient block
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoefficientError {
    /// A line of the block does not hold the (n, m) term expected at that position
    #[error("corrupt coefficient record at line {line}: expected n={expected_n} m={expected_m}, found {found:?}")]
    CorruptRecord {
        line: usize,
        expected_n: usize,
        expected_m: usize,
        found: String,
    },

    /// The header asks for more terms than a coefficient vector can hold
    #[error("model {model} declares degree {degree}, the supported maximum is {max}")]
    DegreeTooLarge {
        model: String,
        degree: usize,
        max: usize,
    },
}
