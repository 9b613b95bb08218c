use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The table axis which a lookup value fell outside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupAxis {
    LogT,
    LogR,
}

impl fmt::Display for LookupAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupAxis::LogT => write!(f, "logT"),
            LookupAxis::LogR => write!(f, "logR"),
        }
    }
}

/// Error type for fatal failures during setup or iteration.
///
/// None of these are recovered from internally. They are propagated to the caller,
/// which is expected to abort the run with [`SnakeError::exit_code`].
#[derive(Error, Debug)]
pub enum SnakeError {
    #[error("Invalid value for {parameter}: {reason}")]
    Configuration { parameter: String, reason: String },
    #[error("Unable to use {}: {reason}", path.display())]
    Resource { path: PathBuf, reason: String },
    #[error("Syntax error on line {line} in {source_name}: {reason}")]
    Format {
        source_name: String,
        line: usize,
        reason: String,
    },
    #[error("Could not allocate memory for {what} of size {requested}")]
    Allocation { what: String, requested: usize },
    #[error("Cell {cell}: {axis} = {value} out of {table} table range [{min}, {max}]")]
    TableBounds {
        cell: usize,
        axis: LookupAxis,
        value: f64,
        min: f64,
        max: f64,
        table: String,
    },
    #[error("Negative opacity {opacity} for cell {cell}")]
    NegativeOpacity { cell: usize, opacity: f64 },
    #[error("logRMO for cell {cell} was not returned by the opacity routine")]
    OpacityNotReturned { cell: usize },
}

impl SnakeError {
    pub fn configuration(parameter: &str, reason: impl Into<String>) -> Self {
        SnakeError::Configuration {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn resource(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SnakeError::Resource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn format(source_name: &str, line: usize, reason: impl Into<String>) -> Self {
        SnakeError::Format {
            source_name: source_name.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Process exit status used when this error aborts a run.
    ///
    /// Every kind of failure has its own status so scripts driving the solver can
    /// tell them apart. Status 2 is left for command line usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            SnakeError::Configuration { .. } => 3,
            SnakeError::Resource { .. } => 4,
            SnakeError::Format { .. } => 5,
            SnakeError::Allocation { .. } => 6,
            SnakeError::TableBounds { .. } => 7,
            SnakeError::NegativeOpacity { .. } => 8,
            SnakeError::OpacityNotReturned { .. } => 9,
        }
    }
}

/// Convenience type for `Result<T, SnakeError>`.
pub type SnakeResult<T> = Result<T, SnakeError>;
