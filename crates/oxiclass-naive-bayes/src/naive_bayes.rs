use oxiclass_core::validation::{argmax, check_n_features, check_xy, n_classes_of};
use oxiclass_core::{Classifier, MlError, MlResult, Tensor};
use tracing::debug;

/// Gaussian naive Bayes classifier.
///
/// Each feature is modelled per class as an independent normal
/// distribution. `var_smoothing` times the largest feature variance is
/// added to every class variance for stability, with a floor of
/// `f64::EPSILON` so all-constant inputs stay finite.
#[derive(Debug, Clone)]
pub struct GaussianNB {
    pub var_smoothing: f64,
    class_counts: Vec<f64>,
    class_means: Vec<Vec<f64>>,
    /// Unsmoothed per-class variances (population, ddof 0).
    class_vars: Vec<Vec<f64>>,
    epsilon: f64,
    n_features: usize,
}

impl Default for GaussianNB {
    fn default() -> Self {
        GaussianNB::new()
    }
}

impl GaussianNB {
    pub fn new() -> Self {
        GaussianNB {
            var_smoothing: 1e-9,
            class_counts: Vec::new(),
            class_means: Vec::new(),
            class_vars: Vec::new(),
            epsilon: 0.0,
            n_features: 0,
        }
    }

    fn is_fitted(&self) -> bool {
        !self.class_counts.is_empty()
    }

    /// Class priors estimated from the training counts.
    pub fn class_priors(&self) -> MlResult<Vec<f64>> {
        if !self.is_fitted() {
            return Err(MlError::NotFitted("GaussianNB"));
        }
        let total: f64 = self.class_counts.iter().sum();
        Ok(self.class_counts.iter().map(|c| c / total).collect())
    }

    pub fn class_means(&self) -> &[Vec<f64>] {
        &self.class_means
    }

    fn reset(&mut self, x: &Tensor<f64>, n_classes: usize) -> MlResult<()> {
        let p = x.n_cols()?;
        let max_var = x.var_axis0()?.into_iter().fold(0.0, f64::max);
        // constant columns everywhere would leave a zero variance
        self.epsilon = (self.var_smoothing * max_var).max(f64::EPSILON);
        self.class_counts = vec![0.0; n_classes];
        self.class_means = vec![vec![0.0; p]; n_classes];
        self.class_vars = vec![vec![0.0; p]; n_classes];
        self.n_features = p;
        Ok(())
    }

    /// Update the per-class statistics with another batch.
    ///
    /// The first call fixes the class count (`n_classes`, or the labels of
    /// this batch). Means and variances are merged exactly, so fitting in
    /// batches matches a single `fit` on all rows.
    pub fn partial_fit(
        &mut self,
        x: &Tensor<f64>,
        y: &[usize],
        n_classes: Option<usize>,
    ) -> MlResult<()> {
        check_xy(x, y)?;
        if !self.is_fitted() {
            self.reset(x, n_classes.unwrap_or_else(|| n_classes_of(y)))?;
        } else {
            check_n_features(x, self.n_features)?;
        }
        let k = self.class_counts.len();
        if let Some(&bad) = y.iter().find(|&&c| c >= k) {
            return Err(MlError::InvalidParameter {
                name: "y",
                reason: format!("label {} outside the {} classes seen at first fit", bad, k),
            });
        }
        self.merge(x, y)
    }

    fn merge(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        let p = self.n_features;
        for class in 0..self.class_counts.len() {
            let rows: Vec<&[f64]> = x
                .rows()?
                .zip(y)
                .filter(|(_, &c)| c == class)
                .map(|(r, _)| r)
                .collect();
            if rows.is_empty() {
                continue;
            }
            let m = rows.len() as f64;
            let mut mean = vec![0.0; p];
            for r in &rows {
                for (mu, v) in mean.iter_mut().zip(*r) {
                    *mu += v / m;
                }
            }
            let mut var = vec![0.0; p];
            for r in &rows {
                for ((s, v), mu) in var.iter_mut().zip(*r).zip(&mean) {
                    *s += (v - mu).powi(2) / m;
                }
            }

            // Chan et al. pairwise combination
            let n_old = self.class_counts[class];
            let n_new = n_old + m;
            for j in 0..p {
                let old_mean = self.class_means[class][j];
                let delta = mean[j] - old_mean;
                let ssd = n_old * self.class_vars[class][j]
                    + m * var[j]
                    + delta * delta * n_old * m / n_new;
                self.class_means[class][j] = old_mean + delta * m / n_new;
                self.class_vars[class][j] = ssd / n_new;
            }
            self.class_counts[class] = n_new;
        }
        debug!(
            classes = self.class_counts.len(),
            seen = self.class_counts.iter().sum::<f64>(),
            "naive bayes updated"
        );
        Ok(())
    }

    /// Joint log-likelihood `ln P(c) + Σ ln N(x_j | μ_cj, σ²_cj)`.
    fn joint_log_likelihood(&self, x: &Tensor<f64>) -> MlResult<Vec<f64>> {
        if !self.is_fitted() {
            return Err(MlError::NotFitted("GaussianNB"));
        }
        let n = check_n_features(x, self.n_features)?;
        let priors = self.class_priors()?;
        let k = priors.len();
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();

        let mut out = Vec::with_capacity(n * k);
        for row in x.rows()? {
            for c in 0..k {
                let mut ll = priors[c].ln();
                let stats = self.class_means[c].iter().zip(&self.class_vars[c]);
                for (v, (mu, var)) in row.iter().zip(stats) {
                    let var = var + self.epsilon;
                    ll -= 0.5 * (ln_2pi + var.ln() + (v - mu).powi(2) / var);
                }
                out.push(ll);
            }
        }
        Ok(out)
    }
}

impl Classifier for GaussianNB {
    fn name(&self) -> &str {
        "Gaussian Naive Bayes"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        check_xy(x, y)?;
        self.reset(x, n_classes_of(y))?;
        self.merge(x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let jll = self.joint_log_likelihood(x)?;
        let k = self.class_counts.len();
        Ok(jll.chunks(k).map(argmax).collect())
    }

    /// Posterior probabilities normalised with log-sum-exp.
    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let mut jll = self.joint_log_likelihood(x)?;
        let k = self.class_counts.len();
        for row in jll.chunks_mut(k) {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lse = max + row.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
            row.iter_mut().for_each(|v| *v = (*v - lse).exp());
        }
        Tensor::new(jll, vec![x.n_rows()?, k])
    }

    fn n_classes(&self) -> usize {
        self.class_counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn clusters() -> (Tensor<f64>, Vec<usize>) {
        let x = Tensor::from_vec2d(&[
            vec![0.0, 0.0],
            vec![0.5, 0.5],
            vec![1.0, 0.0],
            vec![5.0, 5.0],
            vec![5.5, 5.5],
            vec![6.0, 5.0],
        ])
        .unwrap();
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_gaussian_nb() {
        let (x, y) = clusters();
        let mut nb = GaussianNB::new();
        nb.fit(&x, &y).unwrap();
        assert_eq!(nb.predict(&x).unwrap(), y);
        assert_eq!(nb.class_priors().unwrap(), vec![0.5, 0.5]);
        assert_abs_diff_eq!(nb.class_means()[1][0], 5.5, epsilon = 1e-12);

        let proba = nb.predict_proba(&x).unwrap();
        for row in proba.rows().unwrap() {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        assert!(proba.get(&[0, 0]).unwrap() > 0.99);
    }

    #[test]
    fn test_partial_fit_matches_fit() {
        let (x, y) = clusters();
        let mut full = GaussianNB::new();
        full.fit(&x, &y).unwrap();

        let mut batched = GaussianNB::new();
        let first = x.select_rows(&[0, 3, 4]).unwrap();
        let second = x.select_rows(&[1, 2, 5]).unwrap();
        batched.partial_fit(&first, &[0, 1, 1], Some(2)).unwrap();
        batched.partial_fit(&second, &[0, 0, 1], None).unwrap();

        for c in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(
                    full.class_means[c][j],
                    batched.class_means[c][j],
                    epsilon = 1e-12
                );
                assert_abs_diff_eq!(
                    full.class_vars[c][j],
                    batched.class_vars[c][j],
                    epsilon = 1e-12
                );
            }
        }
        assert!(batched.partial_fit(&first, &[0, 2, 1], None).is_err());
    }

    #[test]
    fn test_constant_features_give_finite_probabilities() {
        let x = Tensor::from_vec2d(&[
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
        ])
        .unwrap();
        let y = vec![0, 0, 1, 1];
        let mut nb = GaussianNB::new();
        nb.fit(&x, &y).unwrap();

        let proba = nb.predict_proba(&x).unwrap();
        assert!(proba.data().iter().all(|p| p.is_finite()));
        for row in proba.rows().unwrap() {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(row[0], 0.5, epsilon = 1e-12);
        }
        assert_eq!(nb.predict(&x).unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_unfitted() {
        let (x, _) = clusters();
        assert_eq!(
            GaussianNB::new().predict(&x).unwrap_err(),
            MlError::NotFitted("GaussianNB")
        );
    }
}
