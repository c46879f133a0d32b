use oxiclass_core::validation::{argmax, check_n_features, check_xy, n_classes_of, softmax_in_place};
use oxiclass_core::{Classifier, MlError, MlResult, Tensor};
use tracing::debug;

/// Multinomial logistic regression trained by full-batch gradient descent.
///
/// Models `P(y = k | x) = softmax(W x + b)_k` and minimises the mean
/// cross-entropy plus an L2 penalty `||W||² / (2 C n)`. Smaller `c` means
/// stronger regularisation; `f64::INFINITY` disables it.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub c: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
    /// Row-major `[n_classes, n_features]`.
    weights: Option<Vec<f64>>,
    intercepts: Vec<f64>,
    n_features: usize,
    n_classes: usize,
    /// Iterations run by the last fit / partial_fit.
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        LogisticRegression::new(1.0, 0.1, 1000)
    }
}

impl LogisticRegression {
    pub fn new(c: f64, learning_rate: f64, max_iter: usize) -> Self {
        LogisticRegression {
            c,
            learning_rate,
            max_iter,
            tol: 1e-6,
            fit_intercept: true,
            weights: None,
            intercepts: Vec::new(),
            n_features: 0,
            n_classes: 0,
            n_iter: 0,
        }
    }

    fn validate(&self) -> MlResult<()> {
        if !(self.c > 0.0) {
            return Err(MlError::InvalidParameter {
                name: "c",
                reason: format!("{} must be positive", self.c),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(MlError::InvalidParameter {
                name: "learning_rate",
                reason: format!("{} must be positive", self.learning_rate),
            });
        }
        Ok(())
    }

    fn init(&mut self, n_features: usize, n_classes: usize) {
        self.n_features = n_features;
        self.n_classes = n_classes.max(2);
        self.weights = Some(vec![0.0; self.n_classes * n_features]);
        self.intercepts = vec![0.0; self.n_classes];
    }

    /// Continue training from the current weights on a new batch.
    ///
    /// The first call initialises the model; `n_classes` must then cover
    /// every label that later batches will contain (it defaults to the
    /// labels of this first batch).
    pub fn partial_fit(
        &mut self,
        x: &Tensor<f64>,
        y: &[usize],
        n_classes: Option<usize>,
    ) -> MlResult<()> {
        self.validate()?;
        let (_, p) = check_xy(x, y)?;
        if self.weights.is_none() {
            self.init(p, n_classes.unwrap_or_else(|| n_classes_of(y)));
        } else {
            check_n_features(x, self.n_features)?;
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= self.n_classes) {
            return Err(MlError::InvalidParameter {
                name: "y",
                reason: format!(
                    "label {} outside the {} classes seen at first fit",
                    bad, self.n_classes
                ),
            });
        }
        self.descend(x, y)
    }

    /// Raw class scores `W x + b`, shape `[n_samples, n_classes]`.
    pub fn decision_function(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let w = self
            .weights
            .as_ref()
            .ok_or(MlError::NotFitted("LogisticRegression"))?;
        let n = check_n_features(x, self.n_features)?;
        let mut scores = Vec::with_capacity(n * self.n_classes);
        for row in x.rows()? {
            for k in 0..self.n_classes {
                let wk = &w[k * self.n_features..(k + 1) * self.n_features];
                let z: f64 = wk.iter().zip(row).map(|(a, b)| a * b).sum();
                scores.push(z + self.intercepts[k]);
            }
        }
        Tensor::new(scores, vec![n, self.n_classes])
    }

    /// Learned weights as a `[n_classes, n_features]` matrix.
    pub fn coef(&self) -> MlResult<Tensor<f64>> {
        let w = self
            .weights
            .as_ref()
            .ok_or(MlError::NotFitted("LogisticRegression"))?;
        Tensor::new(w.clone(), vec![self.n_classes, self.n_features])
    }

    pub fn intercepts(&self) -> &[f64] {
        &self.intercepts
    }

    fn descend(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        let n = y.len();
        let p = self.n_features;
        let k_classes = self.n_classes;
        let n_f = n as f64;
        let l2 = if self.c.is_finite() {
            1.0 / (self.c * n_f)
        } else {
            0.0
        };

        let mut w = self.weights.take().unwrap_or_else(|| vec![0.0; k_classes * p]);
        let mut b = std::mem::take(&mut self.intercepts);
        b.resize(k_classes, 0.0);

        let mut probs = vec![0.0; k_classes];
        let mut iterations = 0;
        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let mut dw = vec![0.0; k_classes * p];
            let mut db = vec![0.0; k_classes];

            for (row, &label) in x.rows()?.zip(y) {
                for k in 0..k_classes {
                    let wk = &w[k * p..(k + 1) * p];
                    probs[k] = wk.iter().zip(row).map(|(a, v)| a * v).sum::<f64>() + b[k];
                }
                softmax_in_place(&mut probs);
                for k in 0..k_classes {
                    let err = probs[k] - if k == label { 1.0 } else { 0.0 };
                    for (g, &v) in dw[k * p..(k + 1) * p].iter_mut().zip(row) {
                        *g += err * v;
                    }
                    db[k] += err;
                }
            }

            let mut max_grad: f64 = 0.0;
            for (wi, g) in w.iter_mut().zip(&dw) {
                let grad = g / n_f + l2 * *wi;
                *wi -= self.learning_rate * grad;
                max_grad = max_grad.max(grad.abs());
            }
            if self.fit_intercept {
                for (bk, g) in b.iter_mut().zip(&db) {
                    let grad = g / n_f;
                    *bk -= self.learning_rate * grad;
                    max_grad = max_grad.max(grad.abs());
                }
            }

            if max_grad < self.tol {
                break;
            }
        }

        debug!(iterations, classes = k_classes, features = p, "logistic regression trained");
        self.weights = Some(w);
        self.intercepts = b;
        self.n_iter = iterations;
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "Logistic Regression"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        self.validate()?;
        let (_, p) = check_xy(x, y)?;
        self.init(p, n_classes_of(y));
        self.descend(x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let scores = self.decision_function(x)?;
        Ok(scores.rows()?.map(argmax).collect())
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let mut scores = self.decision_function(x)?;
        for row in scores.data_mut().chunks_mut(self.n_classes) {
            softmax_in_place(row);
        }
        Ok(scores)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn separable() -> (Tensor<f64>, Vec<usize>) {
        let x = Tensor::from_vec2d(&[
            vec![0.0, 0.0],
            vec![0.5, 0.5],
            vec![1.0, 1.0],
            vec![5.0, 5.0],
            vec![5.5, 5.5],
            vec![6.0, 6.0],
        ])
        .unwrap();
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_logistic_regression_binary() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(100.0, 0.1, 2000);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        assert_eq!(model.score(&x, &y).unwrap(), 1.0);
        assert_eq!(model.coef().unwrap().shape_vec(), vec![2, 2]);
    }

    #[test]
    fn test_logistic_regression_three_classes() {
        let x = Tensor::from_vec2d(&[
            vec![0.0, 0.0],
            vec![0.3, 0.1],
            vec![0.1, 0.4],
            vec![4.0, 0.0],
            vec![4.2, 0.3],
            vec![3.8, -0.2],
            vec![0.0, 4.0],
            vec![0.2, 4.3],
            vec![-0.3, 3.9],
        ])
        .unwrap();
        let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let mut model = LogisticRegression::new(100.0, 0.2, 3000);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.predict(&x).unwrap(), y);

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.shape_vec(), vec![9, 3]);
        for row in proba.rows().unwrap() {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_partial_fit_continues_training() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(100.0, 0.1, 20);
        model.partial_fit(&x, &y, Some(2)).unwrap();
        let before = model.predict_proba(&x).unwrap().get(&[5, 1]).unwrap();
        model.partial_fit(&x, &y, None).unwrap();
        let after = model.predict_proba(&x).unwrap().get(&[5, 1]).unwrap();
        assert!(after > before, "confidence should grow: {} -> {}", before, after);

        assert!(model.partial_fit(&x, &[0, 0, 0, 1, 1, 2], None).is_err());
    }

    #[test]
    fn test_unfitted_and_bad_params() {
        let (x, y) = separable();
        let model = LogisticRegression::default();
        assert_eq!(
            model.predict(&x).unwrap_err(),
            MlError::NotFitted("LogisticRegression")
        );
        let mut bad = LogisticRegression::new(0.0, 0.1, 10);
        assert!(bad.fit(&x, &y).is_err());
    }
}
