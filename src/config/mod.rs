//! Pipeline configuration shared by the stage binaries.
//!
//! Every path and hyperparameter used by a stage lives here with a default matching the
//! conventional file layout, so a bare invocation still works. Settings are persisted as TOML;
//! command-line flags override individual fields after loading.

mod defaults;
mod io;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use defaults::*;
pub use io::{CONFIG_FILE_NAME, load_from_path, resolve, save_to_path};

/// Settings for every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub merge: MergeSettings,
    #[serde(default)]
    pub train: TrainSettings,
    #[serde(default)]
    pub predict: PredictSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

/// Where the sample merger reads session files and writes the combined set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Directory scanned (non-recursively) for `*.json` session files.
    #[serde(default = "default_merge_source_dir")]
    pub source_dir: PathBuf,
    /// Directory receiving the combined file; created if missing.
    #[serde(default = "default_merge_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_combined_file_name")]
    pub output_file_name: String,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            source_dir: default_merge_source_dir(),
            output_dir: default_merge_output_dir(),
            output_file_name: default_combined_file_name(),
        }
    }
}

impl MergeSettings {
    /// Full path of the combined output file.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file_name)
    }
}

/// Trainer inputs, outputs and hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSettings {
    /// Combined sample set produced by the merger.
    #[serde(default = "default_train_samples_path")]
    pub samples_path: PathBuf,
    /// Destination of the index → class name mapping, written before training starts.
    #[serde(default = "default_label_mapping_path")]
    pub label_mapping_path: PathBuf,
    /// Destination directory of the exported layers model.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// Required feature-vector length; samples of any other length are rejected.
    #[serde(default = "default_input_width")]
    pub input_width: usize,
    #[serde(default = "default_hidden_units")]
    pub hidden_units: usize,
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: usize,
    /// Dropout rate applied after every hidden layer while training.
    #[serde(default = "default_dropout")]
    pub dropout: f32,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Fraction of samples held out for per-epoch validation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the split, weight initialization, shuffling and dropout masks.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            samples_path: default_train_samples_path(),
            label_mapping_path: default_label_mapping_path(),
            model_dir: default_model_dir(),
            input_width: default_input_width(),
            hidden_units: default_hidden_units(),
            hidden_layers: default_hidden_layers(),
            dropout: default_dropout(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
        }
    }
}

/// Prediction export: model + mapping + labeled samples in, probability CSV out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictSettings {
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_label_mapping_path")]
    pub label_mapping_path: PathBuf,
    #[serde(default = "default_eval_samples_path")]
    pub samples_path: PathBuf,
    #[serde(default = "default_evaluation_csv")]
    pub output_csv: PathBuf,
}

impl Default for PredictSettings {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            label_mapping_path: default_label_mapping_path(),
            samples_path: default_eval_samples_path(),
            output_csv: default_evaluation_csv(),
        }
    }
}

/// Evaluation report inputs and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_evaluation_csv")]
    pub csv_path: PathBuf,
    /// Directory receiving the summary and the plots; created if missing.
    #[serde(default = "default_report_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_report_file_name")]
    pub report_file_name: String,
    /// Number of (true, predicted) pairs listed in the misclassification section.
    #[serde(default = "default_top_misclassifications")]
    pub top_misclassifications: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            csv_path: default_evaluation_csv(),
            output_dir: default_report_output_dir(),
            report_file_name: default_report_file_name(),
            top_misclassifications: default_top_misclassifications(),
        }
    }
}

impl PipelineConfig {
    /// Clamp values that would make a stage misbehave instead of failing loudly.
    pub fn normalized(mut self) -> Self {
        let train = &mut self.train;
        train.dropout = clamp_dropout(train.dropout);
        train.test_fraction = clamp_test_fraction(train.test_fraction);
        train.batch_size = train.batch_size.max(1);
        train.hidden_units = train.hidden_units.max(1);
        if !(train.learning_rate.is_finite() && train.learning_rate > 0.0) {
            train.learning_rate = default_learning_rate();
        }
        self
    }
}

/// Errors raised while loading or saving the pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// The application directory could not be resolved.
    #[error(transparent)]
    AppDir(#[from] crate::app_dirs::AppDirError),
}
