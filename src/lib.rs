//! Hand-gesture training pipeline: merge collected samples, train and export a dense
//! classifier, score evaluation samples and report on the predictions.

/// Application directory helpers.
pub mod app_dirs;
/// Pipeline settings and TOML persistence.
pub mod config;
/// Gesture sample loading, validation, merging and splitting.
pub mod dataset;
/// Logging setup shared by the stage binaries.
pub mod logging;
/// Label encoding, metrics, ROC and the dense classifier.
pub mod ml;
/// Probability CSV export for evaluation samples.
pub mod prediction;
/// Evaluation summary and charts.
pub mod report;
/// Model training stage.
pub mod training;
