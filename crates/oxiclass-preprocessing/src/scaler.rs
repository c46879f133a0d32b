use oxiclass_core::validation::check_n_features;
use oxiclass_core::{MlError, MlResult, Tensor, Transformer};
use serde::{Deserialize, Serialize};

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Statistics come only from the matrix passed to `fit`; `transform`
/// applies them unchanged to any later matrix (e.g. the test set).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Option<Vec<f64>>,
    pub std: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Undo the scaling.
    pub fn inverse_transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let (mean, std) = self.params()?;
        check_n_features(x, mean.len())?;
        x.apply_columns(|v, j| v * std[j] + mean[j])
    }

    fn params(&self) -> MlResult<(&[f64], &[f64])> {
        match (&self.mean, &self.std) {
            (Some(m), Some(s)) => Ok((m, s)),
            _ => Err(MlError::NotFitted("StandardScaler")),
        }
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()> {
        let mean = x.mean_axis0()?;
        // Constant columns are only centred.
        let std = x
            .std_axis0()?
            .into_iter()
            .map(|s| if s < f64::EPSILON { 1.0 } else { s })
            .collect();
        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let (mean, std) = self.params()?;
        check_n_features(x, mean.len())?;
        x.apply_columns(|v, j| (v - mean[j]) / std[j])
    }
}

/// Scale each feature linearly so the training minimum maps to
/// `feature_range.0` and the training maximum to `feature_range.1`.
///
/// Test values outside the training range land outside `feature_range`;
/// they are not clipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub feature_range: (f64, f64),
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        MinMaxScaler {
            feature_range: (0.0, 1.0),
            min: None,
            max: None,
        }
    }
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(low: f64, high: f64) -> MlResult<Self> {
        if !(low < high) {
            return Err(MlError::InvalidParameter {
                name: "feature_range",
                reason: format!("({}, {}) must satisfy low < high", low, high),
            });
        }
        Ok(MinMaxScaler {
            feature_range: (low, high),
            ..Self::default()
        })
    }

    fn params(&self) -> MlResult<(&[f64], &[f64])> {
        match (&self.min, &self.max) {
            (Some(lo), Some(hi)) => Ok((lo, hi)),
            _ => Err(MlError::NotFitted("MinMaxScaler")),
        }
    }

    pub fn inverse_transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let (min, max) = self.params()?;
        check_n_features(x, min.len())?;
        let (low, high) = self.feature_range;
        x.apply_columns(|v, j| {
            let range = max[j] - min[j];
            if range.abs() < f64::EPSILON {
                min[j]
            } else {
                (v - low) / (high - low) * range + min[j]
            }
        })
    }
}

impl Transformer for MinMaxScaler {
    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()> {
        self.min = Some(x.min_axis0()?);
        self.max = Some(x.max_axis0()?);
        Ok(())
    }

    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let (min, max) = self.params()?;
        check_n_features(x, min.len())?;
        let (low, high) = self.feature_range;
        x.apply_columns(|v, j| {
            let range = max[j] - min[j];
            // Constant columns map to the lower bound.
            let unit = if range.abs() < f64::EPSILON {
                0.0
            } else {
                (v - min[j]) / range
            };
            low + unit * (high - low)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn train() -> Tensor<f64> {
        Tensor::from_vec2d(&[
            vec![1.0, 10.0, 7.0],
            vec![5.0, 20.0, 7.0],
            vec![3.0, 30.0, 7.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_standard_scaler() {
        let mut scaler = StandardScaler::new();
        let transformed = scaler.fit_transform(&train()).unwrap();

        let mean = transformed.mean_axis0().unwrap();
        let std = transformed.std_axis0().unwrap();
        for j in 0..2 {
            assert_abs_diff_eq!(mean[j], 0.0, epsilon = 1e-10);
            assert_abs_diff_eq!(std[j], 1.0, epsilon = 1e-10);
        }
        // constant column is centred, not blown up
        assert_eq!(transformed.col(2).unwrap(), vec![0.0, 0.0, 0.0]);

        let back = scaler.inverse_transform(&transformed).unwrap();
        for (a, b) in back.data().iter().zip(train().data()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_minmax_scaler_default_range() {
        let mut scaler = MinMaxScaler::new();
        let transformed = scaler.fit_transform(&train()).unwrap();
        assert_eq!(transformed.col(0).unwrap(), vec![0.0, 1.0, 0.5]);
        assert_eq!(transformed.col(1).unwrap(), vec![0.0, 0.5, 1.0]);
        assert_eq!(transformed.col(2).unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_minmax_scaler_symmetric_range() {
        let mut scaler = MinMaxScaler::with_range(-1.0, 1.0).unwrap();
        let transformed = scaler.fit_transform(&train()).unwrap();
        for j in 0..2 {
            let col = transformed.col(j).unwrap();
            let min = col.iter().copied().fold(f64::INFINITY, f64::min);
            let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert_abs_diff_eq!(min, -1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(max, 1.0, epsilon = 1e-12);
        }

        let back = scaler.inverse_transform(&transformed).unwrap();
        assert_abs_diff_eq!(back.get(&[1, 1]).unwrap(), 20.0, epsilon = 1e-10);
    }

    #[test]
    fn test_fit_uses_training_data_only() {
        let mut scaler = MinMaxScaler::with_range(-1.0, 1.0).unwrap();
        scaler.fit(&train()).unwrap();
        let test = Tensor::from_vec2d(&[vec![9.0, 0.0, 7.0]]).unwrap();
        let scaled = scaler.transform(&test).unwrap();
        // 9 is beyond the training max 5: (9-1)/4*2-1 = 3
        assert_abs_diff_eq!(scaled.get(&[0, 0]).unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(scaler.min.as_deref(), Some(&[1.0, 10.0, 7.0][..]));
    }

    #[test]
    fn test_unfitted_and_mismatched() {
        let scaler = StandardScaler::new();
        assert_eq!(
            scaler.transform(&train()).unwrap_err(),
            MlError::NotFitted("StandardScaler")
        );

        let mut fitted = MinMaxScaler::new();
        fitted.fit(&train()).unwrap();
        let narrow = Tensor::zeros(vec![2, 2]);
        assert!(matches!(
            fitted.transform(&narrow),
            Err(MlError::ShapeMismatch { .. })
        ));
        assert!(MinMaxScaler::with_range(1.0, -1.0).is_err());
    }
}
