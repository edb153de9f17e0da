//! Model trainer: combined samples in, label mapping and layers model out.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::TrainSettings;
use crate::dataset::{self, DatasetError, GestureSample};
use crate::ml::encoding::{EncodingError, LabelEncoder};
use crate::ml::metrics::{ConfusionMatrix, PerClassStats, accuracy, precision_recall_by_class};
use crate::ml::mlp::{
    EpochMetrics, GestureMlp, TfjsError, TrainDataset, TrainOptions, save_layers_model, train_mlp,
};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("Training failed: {0}")]
    Model(String),
    #[error(transparent)]
    Export(#[from] TfjsError),
}

/// Held-out scores of the final model.
#[derive(Debug, Clone)]
pub struct HeldOutScores {
    pub accuracy: f32,
    pub per_class: Vec<PerClassStats>,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub classes: Vec<String>,
    pub label_mapping_path: PathBuf,
    pub model_path: PathBuf,
    pub train_rows: usize,
    pub held_out_rows: usize,
    pub history: Vec<EpochMetrics>,
    /// `None` when the held-out partition is empty.
    pub held_out: Option<HeldOutScores>,
}

impl TrainSettings {
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            hidden_units: self.hidden_units,
            hidden_layers: self.hidden_layers,
            dropout: self.dropout,
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            seed: self.seed,
        }
    }
}

/// Train the gesture classifier described by `settings`.
///
/// The label mapping is written as soon as the labels are encoded, so it exists even when a
/// later step fails.
pub fn train_from_config(settings: &TrainSettings) -> Result<TrainSummary, TrainError> {
    let samples = dataset::load_samples(&settings.samples_path)?;
    info!(
        "Loaded {} samples from {}",
        samples.len(),
        settings.samples_path.display()
    );
    dataset::validate_samples(&samples, settings.input_width)?;

    let (vectors, labels): (Vec<Vec<f32>>, Vec<&str>) = samples
        .iter()
        .map(|GestureSample { label, vector }| (vector.clone(), label.as_str()))
        .unzip();
    let encoder = LabelEncoder::fit(labels.iter().copied());
    let encoded = encoder.transform(labels.iter().copied())?;
    encoder.mapping().write_json(&settings.label_mapping_path)?;
    info!(
        "Wrote label mapping for {} classes to {}",
        encoder.len(),
        settings.label_mapping_path.display()
    );

    let full = TrainDataset {
        x: vectors,
        y: encoded,
        classes: encoder.classes().to_vec(),
        input_width: settings.input_width,
    };
    let split = dataset::split_train_test(full.len(), settings.test_fraction, settings.seed)?;
    let train = full.subset(&split.train);
    let held_out = full.subset(&split.held_out);
    info!(
        "Training on {} samples, holding out {}",
        train.len(),
        held_out.len()
    );

    let outcome = train_mlp(&train, &settings.train_options(), Some(&held_out))
        .map_err(TrainError::Model)?;
    let model_path = save_layers_model(&outcome.model, &settings.model_dir)?;
    info!("Exported model to {}", model_path.display());

    let held_out_scores = (!held_out.is_empty()).then(|| score(&outcome.model, &held_out));
    if let Some(scores) = &held_out_scores {
        log_scores(scores, &outcome.model.classes);
    }

    Ok(TrainSummary {
        classes: encoder.classes().to_vec(),
        label_mapping_path: settings.label_mapping_path.clone(),
        model_path,
        train_rows: train.len(),
        held_out_rows: held_out.len(),
        history: outcome.history,
        held_out: held_out_scores,
    })
}

fn score(model: &GestureMlp, dataset: &TrainDataset) -> HeldOutScores {
    let mut confusion = ConfusionMatrix::new(model.classes.len());
    for (row, &truth) in dataset.x.iter().zip(&dataset.y) {
        confusion.add(truth, model.predict_class_index(row));
    }
    HeldOutScores {
        accuracy: accuracy(&confusion),
        per_class: precision_recall_by_class(&confusion),
        confusion,
    }
}

fn log_scores(scores: &HeldOutScores, classes: &[String]) {
    info!("Held-out accuracy: {:.4}", scores.accuracy);
    for (class, stats) in classes.iter().zip(&scores.per_class) {
        info!(
            "  {class:<16} precision={:.3} recall={:.3} support={}",
            stats.precision, stats.recall, stats.support
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoding::LabelMapping;
    use serde_json::json;
    use tempfile::tempdir;

    fn settings_in(dir: &std::path::Path, samples: serde_json::Value) -> TrainSettings {
        let samples_path = dir.join("combined.json");
        std::fs::write(&samples_path, serde_json::to_vec(&samples).unwrap()).unwrap();
        TrainSettings {
            samples_path,
            label_mapping_path: dir.join("label_mapping.json"),
            model_dir: dir.join("gesture_model_tfjs"),
            input_width: 4,
            hidden_units: 8,
            epochs: 3,
            ..TrainSettings::default()
        }
    }

    fn sample_set(per_class: usize) -> serde_json::Value {
        let mut rows = Vec::new();
        for i in 0..per_class {
            let v = i as f32 * 0.01;
            rows.push(json!({"label": "palm", "vector": [0.9, 0.9 - v, 0.1, 0.1]}));
            rows.push(json!({"label": "fist", "vector": [0.1, 0.1 + v, 0.9, 0.9]}));
        }
        serde_json::Value::Array(rows)
    }

    #[test]
    fn writes_mapping_and_model() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path(), sample_set(10));
        let summary = train_from_config(&settings).unwrap();

        assert_eq!(summary.classes, ["fist", "palm"]);
        assert_eq!(summary.held_out_rows, 4);
        assert_eq!(summary.train_rows, 16);
        assert_eq!(summary.history.len(), 3);
        assert!(summary.history[0].val_accuracy.is_some());
        assert!(summary.held_out.is_some());
        assert!(summary.model_path.is_file());

        let mapping = LabelMapping::load_json(&settings.label_mapping_path).unwrap();
        assert_eq!(mapping.classes(), ["fist", "palm"]);
    }

    #[test]
    fn wrong_vector_width_fails_before_mapping_is_written() {
        let dir = tempdir().unwrap();
        let samples = json!([
            {"label": "fist", "vector": [0.0, 0.0, 0.0, 0.0]},
            {"label": "palm", "vector": [1.0, 1.0, 1.0]}
        ]);
        let settings = settings_in(dir.path(), samples);
        let err = train_from_config(&settings).unwrap_err();
        assert!(matches!(
            err,
            TrainError::Dataset(DatasetError::VectorLength { index: 1, .. })
        ));
        assert!(!settings.label_mapping_path.exists());
    }

    #[test]
    fn single_class_is_rejected() {
        let dir = tempdir().unwrap();
        let samples = json!([
            {"label": "fist", "vector": [0.0, 0.0, 0.0, 0.0]},
            {"label": "fist", "vector": [1.0, 1.0, 1.0, 1.0]}
        ]);
        let settings = settings_in(dir.path(), samples);
        assert!(matches!(
            train_from_config(&settings),
            Err(TrainError::Dataset(DatasetError::TooFewClasses { found: 1 }))
        ));
    }

    #[test]
    fn missing_samples_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let settings = TrainSettings {
            samples_path: dir.path().join("absent.json"),
            ..TrainSettings::default()
        };
        assert!(matches!(
            train_from_config(&settings),
            Err(TrainError::Dataset(DatasetError::Read { .. }))
        ));
    }
}
