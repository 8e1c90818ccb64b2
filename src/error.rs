use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Anything here aborts the run with a non-zero exit status;
/// per-cell problems never reach this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::IoError {
            path: path.into(),
            source,
        }
    }
}

/// Why a single range cell could not be read. Contained at the cell level:
/// the caller turns it into a missing value and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("not a range literal: {0:?}")]
    Syntax(String),

    #[error("expected 2 elements, found {0}")]
    Arity(usize),

    #[error("element is not a number: {0:?}")]
    NotANumber(String),

    #[error("unexpected key {0:?}")]
    UnknownKey(String),

    #[error("missing key {0:?}")]
    MissingKey(&'static str),

    #[error("duplicate key {0:?}")]
    DuplicateKey(String),
}
