//! Experiment configuration.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment. The file is `--config <path>` when given, otherwise
//! `oxiclass.toml` in the working directory if present.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use oxiclass_datasets::{ClassificationSpec, DEFAULT_STUDENTS_PATH};
use serde::{Deserialize, Serialize};

use super::error::WorkflowResult;
use super::models::ModelSpec;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "oxiclass.toml";

/// Feature scaling applied before every model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    None,
    Standard,
    /// Min-max scaling to `scale_range`.
    #[default]
    MinMax,
}

/// Everything one experiment run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Seed for the split and every randomised model.
    pub seed: u64,
    /// Fraction of rows held out for testing, in (0, 1).
    pub test_ratio: f64,
    /// Keep class proportions equal in both partitions.
    pub stratify: bool,
    pub scaler: ScalerKind,
    /// Target range of the min-max scaler.
    pub scale_range: (f64, f64),
    pub students_path: PathBuf,
    /// Dataset of the worked example.
    pub synthetic: ClassificationSpec,
    pub models: Vec<ModelSpec>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            seed: 42,
            test_ratio: 0.25,
            stratify: false,
            scaler: ScalerKind::MinMax,
            scale_range: (-1.0, 1.0),
            students_path: PathBuf::from(DEFAULT_STUDENTS_PATH),
            synthetic: ClassificationSpec {
                n_samples: 200,
                n_features: 4,
                n_informative: 2,
                n_redundant: 0,
                n_classes: 2,
                ..ClassificationSpec::default()
            },
            models: ModelSpec::default_zoo(),
        }
    }
}

impl ExperimentConfig {
    /// Render as TOML, the format the config file uses.
    pub fn to_toml(&self) -> WorkflowResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`OXICLASS_SEED`, `OXICLASS_SYNTHETIC__N_SAMPLES`, ...)
/// 2. `config_file`, or `oxiclass.toml` in `workdir` when no file is given
/// 3. Built-in defaults
///
/// An explicitly named file must exist; the implicit one is optional.
pub fn load_config(config_file: Option<&Path>, workdir: &Path) -> WorkflowResult<ExperimentConfig> {
    let mut figment = Figment::from(Serialized::defaults(ExperimentConfig::default()));

    match config_file {
        Some(path) => {
            figment = figment.merge(Toml::file_exact(path));
        }
        None => {
            let local = workdir.join(DEFAULT_CONFIG_FILE);
            if local.exists() {
                figment = figment.merge(Toml::file(local));
            }
        }
    }

    figment = figment.merge(Env::prefixed("OXICLASS_").split("__"));

    Ok(figment.extract()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.scale_range, (-1.0, 1.0));
        assert_eq!(config.models.len(), 7);
    }

    #[test]
    fn test_local_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"
seed = 7
test_ratio = 0.3
scaler = "standard"

[synthetic]
n_samples = 60

[[models]]
kind = "k_neighbors"
k = 3
"#,
        )
        .unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.scaler, ScalerKind::Standard);
        assert_eq!(config.synthetic.n_samples, 60);
        // untouched nested keys keep their defaults
        assert_eq!(config.synthetic.n_features, 4);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].kind(), "k_neighbors");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExperimentConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("seed = 42"));
        assert!(text.contains("kind = \"random_forest\""));
        let back: ExperimentConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
