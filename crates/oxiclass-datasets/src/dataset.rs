use oxiclass_core::{MlError, MlResult, Tensor};
use serde::Serialize;

/// Feature matrix plus class-index labels, ready for splitting and fitting.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Tensor<f64>,
    pub y: Vec<usize>,
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
}

/// Number of samples carrying one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class: String,
    pub count: usize,
}

impl Dataset {
    /// Build a dataset, checking that rows and labels line up and every
    /// label has a class name.
    pub fn new(
        x: Tensor<f64>,
        y: Vec<usize>,
        feature_names: Vec<String>,
        class_names: Vec<String>,
    ) -> MlResult<Self> {
        let n = x.n_rows()?;
        if n != y.len() {
            return Err(MlError::LabelMismatch {
                samples: n,
                labels: y.len(),
            });
        }
        if feature_names.len() != x.n_cols()? {
            return Err(MlError::ShapeMismatch {
                expected: vec![x.n_cols()?],
                got: vec![feature_names.len()],
            });
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= class_names.len()) {
            return Err(MlError::InvalidParameter {
                name: "y",
                reason: format!("label {} has no class name ({} known)", bad, class_names.len()),
            });
        }
        Ok(Dataset {
            x,
            y,
            feature_names,
            class_names,
        })
    }

    /// Generic `x0..xN` / `class 0..K` names.
    pub fn with_default_names(x: Tensor<f64>, y: Vec<usize>, n_classes: usize) -> MlResult<Self> {
        let features = (0..x.n_cols()?).map(|j| format!("x{}", j)).collect();
        let classes = (0..n_classes).map(|k| format!("class {}", k)).collect();
        Dataset::new(x, y, features, classes)
    }

    pub fn n_samples(&self) -> usize {
        self.y.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// How many samples fall in each class, in class-index order.
    pub fn class_counts(&self) -> Vec<ClassCount> {
        let mut counts = vec![0usize; self.n_classes()];
        for &c in &self.y {
            counts[c] += 1;
        }
        self.class_names
            .iter()
            .zip(counts)
            .map(|(class, count)| ClassCount {
                class: class.clone(),
                count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_counts() {
        let x = Tensor::zeros(vec![4, 1]);
        let ds = Dataset::with_default_names(x, vec![0, 2, 2, 0], 3).unwrap();
        let counts: Vec<usize> = ds.class_counts().iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![2, 0, 2]);
        assert_eq!(ds.feature_names, vec!["x0"]);
    }

    #[test]
    fn test_rejects_unnamed_label() {
        let x = Tensor::zeros(vec![2, 1]);
        assert!(Dataset::with_default_names(x, vec![0, 3], 2).is_err());
    }
}
