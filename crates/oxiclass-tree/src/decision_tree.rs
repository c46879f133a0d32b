use oxiclass_core::validation::{argmax, check_n_features, check_xy, n_classes_of, seeded_rng};
use oxiclass_core::{Classifier, MlError, MlResult, Tensor};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Impurity measure used to rank classification splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

impl Criterion {
    fn impurity(self, counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini => 1.0 - counts.iter().map(|&c| (c / total).powi(2)).sum::<f64>(),
            Criterion::Entropy => counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / total;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

/// How many features each split may look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    #[default]
    All,
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve against `p` input features; always in `1..=p`.
    pub fn resolve(self, p: usize) -> usize {
        let k = match self {
            MaxFeatures::All => p,
            MaxFeatures::Sqrt => (p as f64).sqrt().round() as usize,
            MaxFeatures::Log2 => (p as f64).log2().round() as usize,
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (p as f64 * f).ceil() as usize,
        };
        k.clamp(1, p.max(1))
    }
}

/// A node in the decision tree.
#[derive(Debug, Clone)]
enum TreeNode {
    /// Internal node: rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    /// Leaf: class distribution (classifier) or a single value (regressor).
    Leaf { value: Vec<f64> },
}

impl TreeNode {
    fn leaf_value(&self, row: &[f64]) -> &[f64] {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Growth limits shared by both tree kinds.
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: usize,
}

impl Limits {
    fn stop(&self, depth: usize, n: usize) -> bool {
        self.max_depth.is_some_and(|d| depth >= d) || n < self.min_samples_split.max(2)
    }
}

fn check_limits(min_samples_split: usize, min_samples_leaf: usize) -> MlResult<()> {
    if min_samples_split < 2 {
        return Err(MlError::InvalidParameter {
            name: "min_samples_split",
            reason: format!("{} must be at least 2", min_samples_split),
        });
    }
    if min_samples_leaf < 1 {
        return Err(MlError::InvalidParameter {
            name: "min_samples_leaf",
            reason: "must be at least 1".into(),
        });
    }
    Ok(())
}

fn candidate_features(rng: &mut StdRng, p: usize, k: usize) -> Vec<usize> {
    if k >= p {
        (0..p).collect()
    } else {
        sample(rng, p, k).into_vec()
    }
}

/// Rows of `indices` sorted by feature `f`.
fn sorted_by_feature(data: &[f64], p: usize, indices: &[usize], f: usize) -> Vec<usize> {
    let mut order = indices.to_vec();
    order.sort_by(|&a, &b| data[a * p + f].total_cmp(&data[b * p + f]));
    order
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct ClassGrower<'a> {
    data: &'a [f64],
    p: usize,
    y: &'a [usize],
    n_classes: usize,
    criterion: Criterion,
    limits: Limits,
    rng: StdRng,
    importances: Vec<f64>,
    n_total: f64,
}

impl ClassGrower<'_> {
    fn counts(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1.0;
        }
        counts
    }

    fn grow(&mut self, indices: &[usize], depth: usize) -> TreeNode {
        let counts = self.counts(indices);
        let n = indices.len() as f64;
        let impurity = self.criterion.impurity(&counts, n);

        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        if pure || self.limits.stop(depth, indices.len()) {
            return leaf_distribution(counts, n);
        }

        let Some(best) = self.best_split(indices) else {
            return leaf_distribution(counts, n);
        };

        self.importances[best.feature] += n / self.n_total * (impurity - best.impurity);
        let left = self.grow(&best.left, depth + 1);
        let right = self.grow(&best.right, depth + 1);
        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.limits.min_samples_leaf;
        let features = candidate_features(&mut self.rng, self.p, self.limits.max_features);
        let total = self.counts(indices);

        let mut best: Option<(usize, usize, f64, f64)> = None; // feature, cut, threshold, impurity
        let mut best_order = Vec::new();

        for f in features {
            let order = sorted_by_feature(self.data, self.p, indices, f);
            let mut left = vec![0.0; self.n_classes];
            for pos in 0..n - 1 {
                left[self.y[order[pos]]] += 1.0;
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let v = self.data[order[pos] * self.p + f];
                let next = self.data[order[pos + 1] * self.p + f];
                if v >= next {
                    continue;
                }
                let right: Vec<f64> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
                let weighted = (n_left as f64 * self.criterion.impurity(&left, n_left as f64)
                    + n_right as f64 * self.criterion.impurity(&right, n_right as f64))
                    / n as f64;
                if best.map_or(true, |(_, _, _, b)| weighted < b) {
                    best = Some((f, n_left, (v + next) / 2.0, weighted));
                    best_order = order.clone();
                }
            }
        }

        best.map(|(feature, cut, threshold, impurity)| {
            let right = best_order.split_off(cut);
            BestSplit { feature, threshold, impurity, left: best_order, right }
        })
    }
}

fn leaf_distribution(mut counts: Vec<f64>, n: f64) -> TreeNode {
    if n > 0.0 {
        counts.iter_mut().for_each(|c| *c /= n);
    }
    TreeNode::Leaf { value: counts }
}

/// CART decision tree classifier.
///
/// Leaves store the class distribution of their training rows, so
/// `predict_proba` returns leaf frequencies and `predict` their argmax.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    pub criterion: Criterion,
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: Option<u64>,
    tree: Option<TreeNode>,
    n_features: usize,
    n_classes: usize,
    importances: Vec<f64>,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        DecisionTreeClassifier::new(None, 2, 1)
    }
}

impl DecisionTreeClassifier {
    pub fn new(
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
    ) -> Self {
        DecisionTreeClassifier {
            criterion: Criterion::Gini,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_features: MaxFeatures::All,
            seed: Some(0),
            tree: None,
            n_features: 0,
            n_classes: 0,
            importances: Vec::new(),
        }
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Fit on the rows `indices` of `x` (repeats allowed, as in a bootstrap
    /// sample). Leaves get `n_classes` entries even if some classes are
    /// absent from the sample.
    pub(crate) fn fit_rows(
        &mut self,
        x: &Tensor<f64>,
        y: &[usize],
        indices: &[usize],
        n_classes: usize,
    ) -> MlResult<()> {
        check_limits(self.min_samples_split, self.min_samples_leaf)?;
        let (_, p) = check_xy(x, y)?;
        if indices.is_empty() {
            return Err(MlError::EmptyInput);
        }

        let mut grower = ClassGrower {
            data: x.data(),
            p,
            y,
            n_classes,
            criterion: self.criterion,
            limits: Limits {
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                max_features: self.max_features.resolve(p),
            },
            rng: seeded_rng(self.seed),
            importances: vec![0.0; p],
            n_total: indices.len() as f64,
        };
        let root = grower.grow(indices, 0);

        let mut importances = grower.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        debug!(depth = root.depth(), leaves = root.n_leaves(), "decision tree grown");
        self.tree = Some(root);
        self.n_features = p;
        self.n_classes = n_classes;
        self.importances = importances;
        Ok(())
    }

    fn root(&self) -> MlResult<&TreeNode> {
        self.tree.as_ref().ok_or(MlError::NotFitted("DecisionTreeClassifier"))
    }

    /// Normalised total impurity decrease contributed by each feature.
    pub fn feature_importances(&self) -> MlResult<&[f64]> {
        self.root()?;
        Ok(&self.importances)
    }

    pub fn depth(&self) -> MlResult<usize> {
        Ok(self.root()?.depth())
    }

    pub fn n_leaves(&self) -> MlResult<usize> {
        Ok(self.root()?.n_leaves())
    }
}

impl Classifier for DecisionTreeClassifier {
    fn name(&self) -> &str {
        "Decision Tree"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        let (n, _) = check_xy(x, y)?;
        let indices: Vec<usize> = (0..n).collect();
        self.fit_rows(x, y, &indices, n_classes_of(y))
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let root = self.root()?;
        check_n_features(x, self.n_features)?;
        Ok(x.rows()?.map(|row| argmax(root.leaf_value(row))).collect())
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let root = self.root()?;
        let n = check_n_features(x, self.n_features)?;
        let mut data = Vec::with_capacity(n * self.n_classes);
        for row in x.rows()? {
            data.extend_from_slice(root.leaf_value(row));
        }
        Tensor::new(data, vec![n, self.n_classes])
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

struct ValueGrower<'a, F: Fn(&[usize]) -> f64> {
    data: &'a [f64],
    p: usize,
    targets: &'a [f64],
    limits: Limits,
    rng: StdRng,
    leaf: F,
}

impl<F: Fn(&[usize]) -> f64> ValueGrower<'_, F> {
    fn grow(&mut self, indices: &[usize], depth: usize) -> TreeNode {
        let n = indices.len() as f64;
        let sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let sum_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let sse = sum_sq - sum * sum / n;

        if sse <= 1e-12 || self.limits.stop(depth, indices.len()) {
            return TreeNode::Leaf {
                value: vec![(self.leaf)(indices)],
            };
        }

        match self.best_split(indices, sum) {
            Some(best) => {
                let left = self.grow(&best.left, depth + 1);
                let right = self.grow(&best.right, depth + 1);
                TreeNode::Split {
                    feature: best.feature,
                    threshold: best.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => TreeNode::Leaf {
                value: vec![(self.leaf)(indices)],
            },
        }
    }

    /// Maximises `S_l²/n_l + S_r²/n_r`, which minimises the summed squared error.
    fn best_split(&mut self, indices: &[usize], total: f64) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.limits.min_samples_leaf;
        let features = candidate_features(&mut self.rng, self.p, self.limits.max_features);

        let mut best: Option<(usize, usize, f64, f64)> = None;
        let mut best_order = Vec::new();
        for f in features {
            let order = sorted_by_feature(self.data, self.p, indices, f);
            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += self.targets[order[pos]];
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let v = self.data[order[pos] * self.p + f];
                let next = self.data[order[pos + 1] * self.p + f];
                if v >= next {
                    continue;
                }
                let right_sum = total - left_sum;
                let gain =
                    left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if best.map_or(true, |(_, _, _, g)| gain > g) {
                    best = Some((f, n_left, (v + next) / 2.0, gain));
                    best_order = order.clone();
                }
            }
        }

        best.map(|(feature, cut, threshold, gain)| {
            let right = best_order.split_off(cut);
            BestSplit { feature, threshold, impurity: -gain, left: best_order, right }
        })
    }
}

/// CART regression tree (squared-error criterion).
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: Option<u64>,
    tree: Option<TreeNode>,
    n_features: usize,
}

impl DecisionTreeRegressor {
    pub fn new(
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
    ) -> Self {
        DecisionTreeRegressor {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_features: MaxFeatures::All,
            seed: Some(0),
            tree: None,
            n_features: 0,
        }
    }

    /// Fit to real-valued targets; leaves predict the mean target.
    pub fn fit(&mut self, x: &Tensor<f64>, targets: &[f64]) -> MlResult<()> {
        let n = x.n_rows()?;
        let indices: Vec<usize> = (0..n).collect();
        self.fit_rows_with(x, targets, &indices, |rows| {
            rows.iter().map(|&i| targets[i]).sum::<f64>() / rows.len() as f64
        })
    }

    /// Grow on `indices`, computing each leaf's value with `leaf` from the
    /// rows that reach it. Gradient boosting uses this for Newton steps.
    pub(crate) fn fit_rows_with<F: Fn(&[usize]) -> f64>(
        &mut self,
        x: &Tensor<f64>,
        targets: &[f64],
        indices: &[usize],
        leaf: F,
    ) -> MlResult<()> {
        check_limits(self.min_samples_split, self.min_samples_leaf)?;
        let n = x.n_rows()?;
        let p = x.n_cols()?;
        if n != targets.len() {
            return Err(MlError::LabelMismatch {
                samples: n,
                labels: targets.len(),
            });
        }
        if indices.is_empty() {
            return Err(MlError::EmptyInput);
        }

        let mut grower = ValueGrower {
            data: x.data(),
            p,
            targets,
            limits: Limits {
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                max_features: self.max_features.resolve(p),
            },
            rng: seeded_rng(self.seed),
            leaf,
        };
        self.tree = Some(grower.grow(indices, 0));
        self.n_features = p;
        Ok(())
    }

    pub(crate) fn predict_row(&self, row: &[f64]) -> MlResult<f64> {
        let root = self.tree.as_ref().ok_or(MlError::NotFitted("DecisionTreeRegressor"))?;
        Ok(root.leaf_value(row)[0])
    }

    pub fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<f64>> {
        if self.tree.is_none() {
            return Err(MlError::NotFitted("DecisionTreeRegressor"));
        }
        check_n_features(x, self.n_features)?;
        x.rows()?.map(|row| self.predict_row(row)).collect()
    }
}
