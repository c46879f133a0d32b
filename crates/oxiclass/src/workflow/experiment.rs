//! Split, scale, fit and score every configured model.

use std::time::Instant;

use oxiclass_core::{Classifier, MlResult};
use oxiclass_datasets::Dataset;
use oxiclass_metrics::{classification_report, ClassificationReport};
use oxiclass_pipeline::Pipeline;
use oxiclass_preprocessing::{
    train_test_split, train_test_split_stratified, MinMaxScaler, Split, StandardScaler,
};
use serde::Serialize;
use tracing::info;

use super::config::{ExperimentConfig, ScalerKind};
use super::error::{WorkflowError, WorkflowResult};
use super::models::ModelSpec;

/// Outcome of fitting one model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub name: String,
    pub kind: String,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub fit_time_ms: f64,
    /// Per-class scores on the test partition.
    pub test_report: ClassificationReport,
}

/// Runs the configured models against one dataset.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Self {
        Experiment { config }
    }

    /// Seeded train/test split of `dataset`.
    pub fn split(&self, dataset: &Dataset) -> MlResult<Split> {
        let c = &self.config;
        if c.stratify {
            train_test_split_stratified(&dataset.x, &dataset.y, c.test_ratio, Some(c.seed))
        } else {
            train_test_split(&dataset.x, &dataset.y, c.test_ratio, Some(c.seed))
        }
    }

    /// The configured scaler in front of `spec`'s model.
    pub fn pipeline(&self, spec: &ModelSpec) -> MlResult<Pipeline> {
        let pipeline = match self.config.scaler {
            ScalerKind::None => Pipeline::new(),
            ScalerKind::Standard => {
                Pipeline::new().add_transformer(Box::new(StandardScaler::new()))
            }
            ScalerKind::MinMax => {
                let (low, high) = self.config.scale_range;
                Pipeline::new().add_transformer(Box::new(MinMaxScaler::with_range(low, high)?))
            }
        };
        Ok(pipeline.set_classifier(spec.build(self.config.seed)))
    }

    /// Fit one model on the training partition and score both partitions.
    pub fn evaluate(
        &self,
        spec: &ModelSpec,
        split: &Split,
        class_names: &[String],
    ) -> WorkflowResult<ModelReport> {
        let mut model = self.pipeline(spec)?;
        let name = model.name().to_string();
        let wrap = |source| WorkflowError::Model {
            model: name.clone(),
            source,
        };

        let start = Instant::now();
        model.fit(&split.x_train, &split.y_train).map_err(wrap)?;
        let fit_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let train_accuracy = model.score(&split.x_train, &split.y_train).map_err(wrap)?;
        let test_pred = model.predict(&split.x_test).map_err(wrap)?;
        let test_report =
            classification_report(&split.y_test, &test_pred, class_names).map_err(wrap)?;

        info!(
            model = %name,
            train_accuracy,
            test_accuracy = test_report.accuracy,
            fit_time_ms,
            "model evaluated"
        );
        Ok(ModelReport {
            kind: spec.kind().to_string(),
            train_accuracy,
            test_accuracy: test_report.accuracy,
            fit_time_ms,
            test_report,
            name,
        })
    }

    /// Evaluate every configured model on one shared split.
    pub fn run(&self, dataset: &Dataset) -> WorkflowResult<Vec<ModelReport>> {
        let split = self.split(dataset)?;
        info!(
            train = split.y_train.len(),
            test = split.y_test.len(),
            models = self.config.models.len(),
            "running experiment"
        );
        self.config
            .models
            .iter()
            .map(|spec| self.evaluate(spec, &split, &dataset.class_names))
            .collect()
    }
}
