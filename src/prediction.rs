//! Prediction exporter: runs the exported model over labeled samples and writes the
//! per-class probability CSV read by the evaluation report.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::PredictSettings;
use crate::dataset::{self, DatasetError};
use crate::ml::encoding::{EncodingError, LabelMapping};
use crate::ml::mlp::{TfjsError, load_layers_model};

pub const TRUE_LABEL_COLUMN: &str = "TrueLabel";
pub const PROBABILITY_PREFIX: &str = "Prob_";

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Model(#[from] TfjsError),
    #[error(transparent)]
    Mapping(#[from] EncodingError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Model predicts {model} classes but the label mapping lists {mapping}")]
    ClassCountMismatch { model: usize, mapping: usize },
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

#[derive(Debug, Clone)]
pub struct PredictionSummary {
    pub output_csv: PathBuf,
    pub rows: usize,
    pub classes: Vec<String>,
}

/// Score every sample in `settings.samples_path` and write one CSV row per sample.
pub fn export_predictions(
    settings: &PredictSettings,
) -> Result<PredictionSummary, PredictionError> {
    let model = load_layers_model(&settings.model_dir)?;
    let mapping = LabelMapping::load_json(&settings.label_mapping_path)?;
    if mapping.len() != model.output.units {
        return Err(PredictionError::ClassCountMismatch {
            model: model.output.units,
            mapping: mapping.len(),
        });
    }

    let samples = dataset::load_samples(&settings.samples_path)?;
    if let Some((index, sample)) = samples
        .iter()
        .enumerate()
        .find(|(_, sample)| sample.vector.len() != model.input_width)
    {
        return Err(DatasetError::VectorLength {
            index,
            label: sample.label.clone(),
            expected: model.input_width,
            actual: sample.vector.len(),
        }
        .into());
    }

    let path = settings.output_csv.clone();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PredictionError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let csv_err = |source: csv::Error| PredictionError::Csv {
        path: path.clone(),
        source,
    };
    let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
    let header = std::iter::once(TRUE_LABEL_COLUMN.to_string()).chain(
        mapping
            .classes()
            .iter()
            .map(|class| format!("{PROBABILITY_PREFIX}{class}")),
    );
    writer.write_record(header).map_err(csv_err)?;
    for sample in &samples {
        let probs = model.predict_proba(&sample.vector);
        let record = std::iter::once(sample.label.clone())
            .chain(probs.iter().map(|p| format!("{p:.6}")));
        writer.write_record(record).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|source| csv_err(csv::Error::from(source)))?;
    info!(
        "Wrote predictions for {} samples to {}",
        samples.len(),
        path.display()
    );

    Ok(PredictionSummary {
        output_csv: path.clone(),
        rows: samples.len(),
        classes: mapping.classes().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mlp::{DenseLayer, GestureMlp, save_layers_model};
    use serde_json::json;
    use tempfile::tempdir;

    fn identity_model() -> GestureMlp {
        let mut output = DenseLayer::zeros(2, 2);
        output.weights = vec![3.0, 0.0, 0.0, 3.0];
        GestureMlp {
            input_width: 2,
            hidden: Vec::new(),
            output,
            dropout: 0.0,
            classes: vec!["fist".into(), "palm".into()],
        }
    }

    fn settings_in(dir: &std::path::Path) -> PredictSettings {
        let model_dir = dir.join("model");
        save_layers_model(&identity_model(), &model_dir).unwrap();
        let label_mapping_path = dir.join("label_mapping.json");
        LabelMapping::new(vec!["fist".into(), "palm".into()])
            .write_json(&label_mapping_path)
            .unwrap();
        PredictSettings {
            model_dir,
            label_mapping_path,
            samples_path: dir.join("final_eval_data.json"),
            output_csv: dir.join("out").join("evaluation_results.csv"),
        }
    }

    #[test]
    fn writes_header_and_six_decimal_rows() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let samples = json!([
            {"label": "fist", "vector": [1.0, 0.0]},
            {"label": "palm", "vector": [0.0, 1.0]}
        ]);
        std::fs::write(&settings.samples_path, samples.to_string()).unwrap();

        let summary = export_predictions(&settings).unwrap();
        assert_eq!(summary.rows, 2);
        let text = std::fs::read_to_string(&summary.output_csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "TrueLabel,Prob_fist,Prob_palm");
        assert!(lines[1].starts_with("fist,0.95"));
        let cells: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(cells[0], "palm");
        assert_eq!(cells[1].split('.').nth(1).map(str::len), Some(6));
    }

    #[test]
    fn mapping_must_match_model_outputs() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        LabelMapping::new(vec!["fist".into(), "ok".into(), "palm".into()])
            .write_json(&settings.label_mapping_path)
            .unwrap();
        std::fs::write(&settings.samples_path, "[]").unwrap();
        assert!(matches!(
            export_predictions(&settings),
            Err(PredictionError::ClassCountMismatch {
                model: 2,
                mapping: 3
            })
        ));
    }

    #[test]
    fn sample_width_must_match_model() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        std::fs::write(
            &settings.samples_path,
            json!([{"label": "fist", "vector": [1.0]}]).to_string(),
        )
        .unwrap();
        assert!(matches!(
            export_predictions(&settings),
            Err(PredictionError::Dataset(DatasetError::VectorLength { .. }))
        ));
    }
}
