//! # oxiclass
//!
//! An introductory classification toolkit written in Rust: generate or load
//! a dataset, split it, scale it, fit a few classic model families and
//! compare their accuracy.
//!
//! ## Modules
//!
//! - **core**: `Tensor<T>` matrices, `MlError`, the `Classifier` and `Transformer` traits
//! - **io**: CSV read/write for numeric matrices and typed records
//! - **datasets**: make_classification, make_blobs/moons/circles, student records, grade buckets
//! - **preprocessing**: train/test split, StandardScaler, MinMaxScaler, label and one-hot encoders
//! - **linear**: multinomial Logistic Regression
//! - **tree**: Decision Tree (CART), Random Forest, Gradient Boosting
//! - **neighbors**: k-nearest neighbours with Euclidean/Manhattan distance
//! - **svm**: kernel SVC (linear, RBF, polynomial), one-vs-one multiclass
//! - **naive_bayes**: Gaussian NB
//! - **metrics**: accuracy, confusion matrix, precision/recall/F1, classification report
//! - **pipeline**: transformer chain + final classifier
//! - **workflow**: experiment config, model zoo, runner and text reports

/// Core tensor type, errors and model traits.
pub use oxiclass_core as core;

/// I/O utilities.
pub use oxiclass_io as io;

/// Built-in and synthetic datasets.
pub use oxiclass_datasets as datasets;

/// Data preprocessing.
pub use oxiclass_preprocessing as preprocessing;

/// Linear models.
pub use oxiclass_linear as linear;

/// Tree-based models.
pub use oxiclass_tree as tree;

/// Nearest neighbors.
pub use oxiclass_neighbors as neighbors;

/// Support vector machines.
pub use oxiclass_svm as svm;

/// Naive Bayes classifiers.
pub use oxiclass_naive_bayes as naive_bayes;

/// Evaluation metrics.
pub use oxiclass_metrics as metrics;

/// Pipeline API.
pub use oxiclass_pipeline as pipeline;

pub mod workflow;

pub use oxiclass_core::{Classifier, MlError, MlResult, Tensor, Transformer};
