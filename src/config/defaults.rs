use std::path::PathBuf;

use crate::dataset::DEFAULT_INPUT_WIDTH;

pub(super) fn default_merge_source_dir() -> PathBuf {
    PathBuf::from("data_collection")
}

pub(super) fn default_merge_output_dir() -> PathBuf {
    PathBuf::from("shared_results")
}

pub(super) fn default_combined_file_name() -> String {
    "combined_gesture_samples.json".to_string()
}

/// The merger's output, so a bare merge followed by a bare train chains up.
pub(super) fn default_train_samples_path() -> PathBuf {
    default_merge_output_dir().join(default_combined_file_name())
}

pub(super) fn default_label_mapping_path() -> PathBuf {
    PathBuf::from("label_mapping.json")
}

pub(super) fn default_model_dir() -> PathBuf {
    PathBuf::from("gesture_model_tfjs")
}

pub(super) fn default_input_width() -> usize {
    DEFAULT_INPUT_WIDTH
}

pub(super) fn default_hidden_units() -> usize {
    64
}

pub(super) fn default_hidden_layers() -> usize {
    2
}

pub(super) fn default_dropout() -> f32 {
    0.2
}

pub(super) fn default_epochs() -> usize {
    30
}

pub(super) fn default_batch_size() -> usize {
    32
}

pub(super) fn default_learning_rate() -> f32 {
    0.001
}

pub(super) fn default_test_fraction() -> f64 {
    0.2
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_eval_samples_path() -> PathBuf {
    PathBuf::from("final_eval_data.json")
}

pub(super) fn default_evaluation_csv() -> PathBuf {
    PathBuf::from("evaluation_results.csv")
}

pub(super) fn default_report_output_dir() -> PathBuf {
    PathBuf::from("evaluation_plots")
}

pub(super) fn default_report_file_name() -> String {
    "summary_report.txt".to_string()
}

pub(super) fn default_top_misclassifications() -> usize {
    5
}

pub(super) fn clamp_dropout(rate: f32) -> f32 {
    if rate.is_finite() { rate.clamp(0.0, 0.9) } else { default_dropout() }
}

pub(super) fn clamp_test_fraction(fraction: f64) -> f64 {
    if fraction.is_finite() {
        fraction.clamp(0.0, 0.9)
    } else {
        default_test_fraction()
    }
}
