use thiserror::Error;

/// Error type shared by every oxiclass estimator, transformer and tensor op.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MlError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Invalid axis: {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("Invalid value for `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{0} is not fitted yet; call fit() first")]
    NotFitted(&'static str),

    #[error("Empty input: at least one sample is required")]
    EmptyInput,

    #[error("Label count mismatch: {samples} samples but {labels} labels")]
    LabelMismatch { samples: usize, labels: usize },

    #[error("Unknown category {value:?} in column {column}")]
    UnknownCategory { column: usize, value: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type MlResult<T> = Result<T, MlError>;
