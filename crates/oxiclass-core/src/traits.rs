use crate::error::{MlError, MlResult};
use crate::tensor::Tensor;

/// Supervised classifier over `f64` feature matrices.
///
/// Labels are class indices `0..n_classes`. `fit` replaces any previously
/// learned state; prediction methods require a fitted model and return
/// [`MlError::NotFitted`] otherwise.
pub trait Classifier {
    /// Short human-readable model name used in reports.
    fn name(&self) -> &str;

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()>;

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>>;

    /// Class membership probabilities, shape `[n_samples, n_classes]`.
    /// Each row sums to one; column `k` is class `k`.
    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>>;

    /// Number of classes seen during fit (0 before fitting).
    fn n_classes(&self) -> usize;

    /// Mean accuracy of `predict(x)` against `y`.
    fn score(&self, x: &Tensor<f64>, y: &[usize]) -> MlResult<f64> {
        let pred = self.predict(x)?;
        if pred.len() != y.len() {
            return Err(MlError::LabelMismatch {
                samples: pred.len(),
                labels: y.len(),
            });
        }
        if y.is_empty() {
            return Err(MlError::EmptyInput);
        }
        let correct = pred.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }
}

/// Unsupervised feature transform (scalers, encoders).
pub trait Transformer {
    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()>;
    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>>;
    fn fit_transform(&mut self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        (**self).fit(x, y)
    }
    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        (**self).predict(x)
    }
    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        (**self).predict_proba(x)
    }
    fn n_classes(&self) -> usize {
        (**self).n_classes()
    }
    fn score(&self, x: &Tensor<f64>, y: &[usize]) -> MlResult<f64> {
        (**self).score(x, y)
    }
}
