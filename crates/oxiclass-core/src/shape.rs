use crate::error::{MlError, MlResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a tensor. Estimators only ever see rank 1 (vectors) and
/// rank 2 (`[samples, features]` matrices).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Size along `axis`.
    pub fn dim(&self, axis: usize) -> MlResult<usize> {
        self.dims.get(axis).copied().ok_or(MlError::InvalidAxis {
            axis,
            ndim: self.ndim(),
        })
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    pub fn is_matrix(&self) -> bool {
        self.dims.len() == 2
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "({})", dims.join(", "))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![150, 4]);
        assert_eq!(s.ndim(), 2);
        assert_eq!(s.numel(), 600);
        assert_eq!(s.dim(0).unwrap(), 150);
        assert_eq!(s.dim(1).unwrap(), 4);
        assert!(s.is_matrix());
        assert_eq!(
            s.dim(2),
            Err(MlError::InvalidAxis { axis: 2, ndim: 2 })
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::new(vec![3, 2]).to_string(), "(3, 2)");
        assert_eq!(Shape::new(vec![7]).to_string(), "(7)");
    }
}
