use oxiclass_core::validation::{argmax, check_n_features, check_xy, n_classes_of, seeded_rng};
use oxiclass_core::{Classifier, MlError, MlResult, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::decision_tree::{Criterion, DecisionTreeClassifier, MaxFeatures};

/// Random forest classifier: bagged decision trees with per-split feature
/// subsampling.
///
/// Trees are grown in parallel. Each tree's seed is drawn from the forest
/// seed before the parallel section, so a seeded forest is identical
/// regardless of thread count.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Sample rows with replacement for each tree.
    pub bootstrap: bool,
    pub seed: Option<u64>,
    trees: Vec<DecisionTreeClassifier>,
    n_features: usize,
    n_classes: usize,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        RandomForestClassifier::new(100, None)
    }
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, max_depth: Option<usize>) -> Self {
        RandomForestClassifier {
            n_estimators,
            criterion: Criterion::Gini,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: Some(42),
            trees: Vec::new(),
            n_features: 0,
            n_classes: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the trees' normalised impurity-decrease importances.
    pub fn feature_importances(&self) -> MlResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted("RandomForestClassifier"));
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (t, v) in total.iter_mut().zip(tree.feature_importances()?) {
                *t += v;
            }
        }
        let k = self.trees.len() as f64;
        total.iter_mut().for_each(|v| *v /= k);
        Ok(total)
    }

    fn grow_tree(
        &self,
        x: &Tensor<f64>,
        y: &[usize],
        seed: u64,
    ) -> MlResult<DecisionTreeClassifier> {
        let n = y.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let indices: Vec<usize> = if self.bootstrap {
            (0..n).map(|_| rng.gen_range(0..n)).collect()
        } else {
            (0..n).collect()
        };

        let mut tree = DecisionTreeClassifier::new(
            self.max_depth,
            self.min_samples_split,
            self.min_samples_leaf,
        )
        .with_criterion(self.criterion);
        tree.max_features = self.max_features;
        tree.seed = Some(rng.gen());
        tree.fit_rows(x, y, &indices, self.n_classes)?;
        Ok(tree)
    }
}

impl Classifier for RandomForestClassifier {
    fn name(&self) -> &str {
        "Random Forest"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        if self.n_estimators == 0 {
            return Err(MlError::InvalidParameter {
                name: "n_estimators",
                reason: "must be at least 1".into(),
            });
        }
        let (_, p) = check_xy(x, y)?;
        self.n_features = p;
        self.n_classes = n_classes_of(y);

        let mut base_rng = seeded_rng(self.seed);
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| base_rng.gen()).collect();

        let this = &*self;
        let trees = seeds
            .into_par_iter()
            .map(|seed| this.grow_tree(x, y, seed))
            .collect::<MlResult<Vec<_>>>()?;

        debug!(trees = trees.len(), features = p, classes = self.n_classes, "random forest grown");
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows()?.map(argmax).collect())
    }

    /// Average of the trees' leaf class distributions.
    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted("RandomForestClassifier"));
        }
        let n = check_n_features(x, self.n_features)?;
        let mut sum = vec![0.0; n * self.n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(x)?;
            for (s, v) in sum.iter_mut().zip(proba.data()) {
                *s += v;
            }
        }
        let k = self.trees.len() as f64;
        sum.iter_mut().for_each(|v| *v /= k);
        Tensor::new(sum, vec![n, self.n_classes])
    }

    fn n_classes(&self) -> usize {
        self.n_classes
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
            vec![1.0, 1.0],
            vec![0.2, 0.8],
            vec![5.0, 5.0],
            vec![5.5, 5.5],
            vec![6.0, 6.0],
            vec![5.2, 5.8],
        ])
        .unwrap();
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn test_random_forest_classifier() {
        let (x, y) = clusters();
        let mut rf = RandomForestClassifier::new(25, Some(5));
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.n_trees(), 25);
        assert_eq!(rf.predict(&x).unwrap(), y);

        let proba = rf.predict_proba(&x).unwrap();
        for row in proba.rows().unwrap() {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        }
        let imp = rf.feature_importances().unwrap();
        assert_abs_diff_eq!(imp.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_seeded_forest_is_reproducible() {
        let (x, y) = clusters();
        let query = Tensor::from_vec2d(&[vec![2.5, 3.0], vec![3.0, 2.0]]).unwrap();
        let mut a = RandomForestClassifier::new(15, None).with_seed(9);
        let mut b = RandomForestClassifier::new(15, None).with_seed(9);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(
            a.predict_proba(&query).unwrap().data(),
            b.predict_proba(&query).unwrap().data()
        );
    }

    #[test]
    fn test_forest_errors() {
        let (x, y) = clusters();
        let rf = RandomForestClassifier::default();
        assert!(matches!(rf.predict(&x), Err(MlError::NotFitted(_))));
        let mut empty = RandomForestClassifier::new(0, None);
        assert!(empty.fit(&x, &y).is_err());
    }
}
