//! The classification walkthrough as a reusable workflow: load a
//! configuration, build a dataset, run every configured model on one
//! seeded split and render the results.

pub mod config;
pub mod error;
pub mod experiment;
pub mod models;
pub mod report;
pub mod students;

pub use config::{load_config, ExperimentConfig, ScalerKind, DEFAULT_CONFIG_FILE};
pub use error::{WorkflowError, WorkflowResult};
pub use experiment::{Experiment, ModelReport};
pub use models::ModelSpec;
pub use report::{label_distribution, render_count_plot, render_report_table};
pub use students::StudentDataset;
