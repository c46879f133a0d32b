//! The model zoo: serialisable model descriptions that build classifiers.

use oxiclass_core::Classifier;
use oxiclass_linear::LogisticRegression;
use oxiclass_naive_bayes::GaussianNB;
use oxiclass_neighbors::{DistanceMetric, KNeighborsClassifier, Weights};
use oxiclass_svm::{Gamma, Kernel, SVC};
use oxiclass_tree::{
    Criterion, DecisionTreeClassifier, GradientBoostingClassifier, MaxFeatures,
    RandomForestClassifier,
};
use serde::{Deserialize, Serialize};

/// One model family with its hyperparameters.
///
/// In TOML each entry is a `[[models]]` table whose `kind` picks the
/// variant; omitted fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression {
        #[serde(default = "one")]
        c: f64,
        #[serde(default = "logistic_rate")]
        learning_rate: f64,
        #[serde(default = "logistic_iters")]
        max_iter: usize,
    },
    DecisionTree {
        #[serde(default)]
        criterion: Criterion,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_depth: Option<usize>,
        #[serde(default = "one_usize")]
        min_samples_leaf: usize,
    },
    RandomForest {
        #[serde(default = "hundred")]
        n_estimators: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_depth: Option<usize>,
        #[serde(default = "sqrt_features")]
        max_features: MaxFeatures,
    },
    GradientBoosting {
        #[serde(default = "hundred")]
        n_estimators: usize,
        #[serde(default = "boosting_rate")]
        learning_rate: f64,
        #[serde(default = "three")]
        max_depth: usize,
        #[serde(default = "one")]
        subsample: f64,
    },
    KNeighbors {
        #[serde(default = "five")]
        k: usize,
        #[serde(default)]
        metric: DistanceMetric,
        #[serde(default)]
        weights: Weights,
    },
    Svc {
        #[serde(default = "one")]
        c: f64,
        #[serde(default)]
        kernel: Kernel,
    },
    GaussianNb {
        #[serde(default = "smoothing")]
        var_smoothing: f64,
    },
}

fn one() -> f64 {
    1.0
}
fn one_usize() -> usize {
    1
}
fn three() -> usize {
    3
}
fn five() -> usize {
    5
}
fn hundred() -> usize {
    100
}
fn logistic_rate() -> f64 {
    0.1
}
fn logistic_iters() -> usize {
    1000
}
fn boosting_rate() -> f64 {
    0.1
}
fn sqrt_features() -> MaxFeatures {
    MaxFeatures::Sqrt
}
fn smoothing() -> f64 {
    1e-9
}

impl ModelSpec {
    /// The walkthrough line-up: one model from each family.
    pub fn default_zoo() -> Vec<ModelSpec> {
        vec![
            ModelSpec::LogisticRegression {
                c: one(),
                learning_rate: logistic_rate(),
                max_iter: logistic_iters(),
            },
            ModelSpec::DecisionTree {
                criterion: Criterion::Gini,
                max_depth: None,
                min_samples_leaf: 1,
            },
            ModelSpec::RandomForest {
                n_estimators: hundred(),
                max_depth: None,
                max_features: MaxFeatures::Sqrt,
            },
            ModelSpec::GradientBoosting {
                n_estimators: hundred(),
                learning_rate: boosting_rate(),
                max_depth: three(),
                subsample: one(),
            },
            ModelSpec::KNeighbors {
                k: five(),
                metric: DistanceMetric::Euclidean,
                weights: Weights::Uniform,
            },
            ModelSpec::Svc {
                c: one(),
                kernel: Kernel::Rbf {
                    gamma: Gamma::Scale,
                },
            },
            ModelSpec::GaussianNb {
                var_smoothing: smoothing(),
            },
        ]
    }

    /// Short identifier, matching the `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::LogisticRegression { .. } => "logistic_regression",
            ModelSpec::DecisionTree { .. } => "decision_tree",
            ModelSpec::RandomForest { .. } => "random_forest",
            ModelSpec::GradientBoosting { .. } => "gradient_boosting",
            ModelSpec::KNeighbors { .. } => "k_neighbors",
            ModelSpec::Svc { .. } => "svc",
            ModelSpec::GaussianNb { .. } => "gaussian_nb",
        }
    }

    /// Build an unfitted classifier; `seed` feeds every randomised model.
    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match *self {
            ModelSpec::LogisticRegression {
                c,
                learning_rate,
                max_iter,
            } => {
                Box::new(LogisticRegression::new(c, learning_rate, max_iter))
            }
            ModelSpec::DecisionTree {
                criterion,
                max_depth,
                min_samples_leaf,
            } => {
                let mut tree = DecisionTreeClassifier::new(max_depth, 2, min_samples_leaf)
                    .with_criterion(criterion);
                tree.seed = Some(seed);
                Box::new(tree)
            }
            ModelSpec::RandomForest {
                n_estimators,
                max_depth,
                max_features,
            } => {
                let mut forest =
                    RandomForestClassifier::new(n_estimators, max_depth).with_seed(seed);
                forest.max_features = max_features;
                Box::new(forest)
            }
            ModelSpec::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
                subsample,
            } => {
                let mut gb =
                    GradientBoostingClassifier::new(n_estimators, learning_rate, max_depth);
                gb.subsample = subsample;
                gb.seed = Some(seed);
                Box::new(gb)
            }
            ModelSpec::KNeighbors {
                k,
                metric,
                weights,
            } => {
                Box::new(KNeighborsClassifier::new(k, metric).with_weights(weights))
            }
            ModelSpec::Svc { c, kernel } => {
                let mut svc = SVC::new(c, kernel);
                svc.seed = Some(seed);
                Box::new(svc)
            }
            ModelSpec::GaussianNb { var_smoothing } => {
                let mut nb = GaussianNB::new();
                nb.var_smoothing = var_smoothing;
                Box::new(nb)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoo_builds_every_family() {
        let zoo = ModelSpec::default_zoo();
        assert_eq!(zoo.len(), 7);
        let names: Vec<String> = zoo.iter().map(|s| s.build(0).name().to_string()).collect();
        assert!(names.contains(&"Random Forest".to_string()));
        assert!(names.contains(&"Gaussian Naive Bayes".to_string()));
        for spec in &zoo {
            assert_eq!(spec.build(1).n_classes(), 0);
        }
    }

    #[test]
    fn test_kind_tag_round_trips_through_json() {
        let spec = ModelSpec::KNeighbors {
            k: 3,
            metric: DistanceMetric::Manhattan,
            weights: Weights::Distance,
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"kind\":\"k_neighbors\""));
        let back: ModelSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
        assert_eq!(back.kind(), "k_neighbors");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"kind": "random_forest", "n_estimators": 10}"#).unwrap();
        assert_eq!(
            spec,
            ModelSpec::RandomForest {
                n_estimators: 10,
                max_depth: None,
                max_features: MaxFeatures::Sqrt,
            }
        );
    }
}
