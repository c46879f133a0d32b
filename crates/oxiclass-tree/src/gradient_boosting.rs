use oxiclass_core::validation::{
    argmax, check_n_features, check_xy, n_classes_of, seeded_rng, softmax_in_place,
};
use oxiclass_core::{Classifier, MlError, MlResult, Tensor};
use rand::seq::index::sample;
use tracing::debug;

use crate::decision_tree::DecisionTreeRegressor;

/// Gradient boosted trees for multiclass classification.
///
/// Minimises the multinomial deviance. Each stage fits one regression
/// tree per class to the residuals `y_k - p_k`, with leaf values set by a
/// single Newton step. Raw scores start at the log class priors.
#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each stage.
    pub subsample: f64,
    pub seed: Option<u64>,
    /// `stages[m][k]` is the tree for class `k` at stage `m`.
    stages: Vec<Vec<DecisionTreeRegressor>>,
    init_scores: Vec<f64>,
    n_features: usize,
    n_classes: usize,
    /// Mean deviance on the training rows after each stage.
    pub train_loss: Vec<f64>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        GradientBoostingClassifier::new(100, 0.1, 3)
    }
}

impl GradientBoostingClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        GradientBoostingClassifier {
            n_estimators,
            learning_rate,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: Some(0),
            stages: Vec::new(),
            init_scores: Vec::new(),
            n_features: 0,
            n_classes: 0,
            train_loss: Vec::new(),
        }
    }

    fn validate(&self) -> MlResult<()> {
        if self.n_estimators == 0 {
            return Err(MlError::InvalidParameter {
                name: "n_estimators",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(MlError::InvalidParameter {
                name: "learning_rate",
                reason: format!("{} must be positive", self.learning_rate),
            });
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(MlError::InvalidParameter {
                name: "subsample",
                reason: format!("{} not in (0, 1]", self.subsample),
            });
        }
        Ok(())
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    /// Raw additive scores, shape `[n_samples, n_classes]`.
    pub fn decision_function(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        if self.stages.is_empty() {
            return Err(MlError::NotFitted("GradientBoostingClassifier"));
        }
        let n = check_n_features(x, self.n_features)?;
        let mut scores = Vec::with_capacity(n * self.n_classes);
        for row in x.rows()? {
            let mut f = self.init_scores.clone();
            for stage in &self.stages {
                for (fk, tree) in f.iter_mut().zip(stage) {
                    *fk += self.learning_rate * tree.predict_row(row)?;
                }
            }
            scores.extend(f);
        }
        Tensor::new(scores, vec![n, self.n_classes])
    }
}

fn deviance(probs: &[f64], y: &[usize], k: usize) -> f64 {
    let n = y.len();
    y.iter()
        .enumerate()
        .map(|(i, &c)| -probs[i * k + c].max(1e-15).ln())
        .sum::<f64>()
        / n as f64
}

impl Classifier for GradientBoostingClassifier {
    fn name(&self) -> &str {
        "Gradient Boosting"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        self.validate()?;
        let (n, p) = check_xy(x, y)?;
        let k = n_classes_of(y).max(2);

        let mut prior = vec![0.0_f64; k];
        for &c in y {
            prior[c] += 1.0;
        }
        let init: Vec<f64> = prior.iter().map(|&c| (c.max(1e-3) / n as f64).ln()).collect();

        let mut scores: Vec<f64> = (0..n).flat_map(|_| init.iter().copied()).collect();
        let mut probs = vec![0.0; n * k];
        let mut rng = seeded_rng(self.seed);
        let n_sub = ((n as f64 * self.subsample).round() as usize).clamp(1, n);

        self.stages.clear();
        self.train_loss.clear();
        for _ in 0..self.n_estimators {
            probs.copy_from_slice(&scores);
            probs.chunks_mut(k).for_each(softmax_in_place);

            let rows: Vec<usize> = if n_sub < n {
                let mut r = sample(&mut rng, n, n_sub).into_vec();
                r.sort_unstable();
                r
            } else {
                (0..n).collect()
            };

            let mut stage = Vec::with_capacity(k);
            for class in 0..k {
                let residuals: Vec<f64> = (0..n)
                    .map(|i| f64::from(u8::from(y[i] == class)) - probs[i * k + class])
                    .collect();
                let scale = (k as f64 - 1.0) / k as f64;
                let newton = |leaf: &[usize]| {
                    let num: f64 = leaf.iter().map(|&i| residuals[i]).sum();
                    let den: f64 = leaf
                        .iter()
                        .map(|&i| residuals[i].abs() * (1.0 - residuals[i].abs()))
                        .sum();
                    if den < 1e-12 {
                        0.0
                    } else {
                        scale * num / den
                    }
                };

                let mut tree = DecisionTreeRegressor::new(
                    Some(self.max_depth),
                    self.min_samples_split,
                    self.min_samples_leaf,
                );
                tree.fit_rows_with(x, &residuals, &rows, newton)?;

                for (i, row) in x.rows()?.enumerate() {
                    scores[i * k + class] += self.learning_rate * tree.predict_row(row)?;
                }
                stage.push(tree);
            }
            self.stages.push(stage);

            probs.copy_from_slice(&scores);
            probs.chunks_mut(k).for_each(softmax_in_place);
            self.train_loss.push(deviance(&probs, y, k));
        }

        debug!(
            stages = self.stages.len(),
            classes = k,
            final_loss = self.train_loss.last().copied().unwrap_or(f64::NAN),
            "gradient boosting trained"
        );
        self.init_scores = init;
        self.n_features = p;
        self.n_classes = k;
        Ok(())
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let scores = self.decision_function(x)?;
        Ok(scores.rows()?.map(argmax).collect())
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let mut scores = self.decision_function(x)?;
        scores.data_mut().chunks_mut(self.n_classes).for_each(softmax_in_place);
        Ok(scores)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}
