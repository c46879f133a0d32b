use oxiclass_core::MlError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or writing tabular files.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}, column {column:?}: {value:?} is not a number")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("file {0} has a header but no data rows")]
    NoRows(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tensor(#[from] MlError),
}

pub type IoResult<T> = Result<T, IoError>;
