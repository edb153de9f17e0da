mod support;

use std::path::Path;

use gestpipe::config::{self, PipelineConfig};
use gestpipe::dataset::merge_samples;
use gestpipe::prediction::export_predictions;
use gestpipe::report::generate_report;
use gestpipe::training::train_from_config;
use serde_json::{Value, json};
use support::gestpipe_env::GestpipeEnvGuard;
use tempfile::tempdir;

fn session(label: &str, base: f32, count: usize) -> Value {
    let samples: Vec<Value> = (0..count)
        .map(|i| {
            let jitter = i as f32 * 0.01;
            json!({ "label": label, "vector": vec![base + jitter; 42] })
        })
        .collect();
    Value::Array(samples)
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
}

fn config_in(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.merge.source_dir = root.join("sessions");
    config.merge.output_dir = root.join("combined");
    config.train.samples_path = config.merge.output_path();
    config.train.label_mapping_path = root.join("label_mapping.json");
    config.train.model_dir = root.join("gesture_model_tfjs");
    config.train.epochs = 40;
    config.train.hidden_units = 8;
    config.train.learning_rate = 0.01;
    config.train.batch_size = 4;
    config.predict.model_dir = config.train.model_dir.clone();
    config.predict.label_mapping_path = config.train.label_mapping_path.clone();
    config.predict.samples_path = root.join("final_eval_data.json");
    config.predict.output_csv = root.join("evaluation_results.csv");
    config.report.csv_path = config.predict.output_csv.clone();
    config.report.output_dir = root.join("evaluation_plots");
    config
}

#[test]
fn merge_train_predict_report() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let config = config_in(root);
    std::fs::create_dir_all(&config.merge.source_dir).unwrap();
    write_json(&config.merge.source_dir.join("a.json"), &session("fist", 0.0, 10));
    write_json(&config.merge.source_dir.join("b.json"), &session("palm", 1.0, 10));
    std::fs::write(config.merge.source_dir.join("notes.json"), "{\"not\": \"a list\"}").unwrap();

    let merged = merge_samples(
        &config.merge.source_dir,
        &config.merge.output_dir,
        &config.merge.output_file_name,
    )
    .unwrap();
    assert_eq!(merged.total_samples, 20);
    assert_eq!(merged.merged_files.len(), 2);
    assert_eq!(merged.skipped.len(), 1);

    let trained = train_from_config(&config.train).unwrap();
    assert_eq!(trained.classes, ["fist", "palm"]);
    assert_eq!(trained.train_rows + trained.held_out_rows, 20);
    let mapping: Value =
        serde_json::from_slice(&std::fs::read(&config.train.label_mapping_path).unwrap()).unwrap();
    assert_eq!(mapping, json!({ "0": "fist", "1": "palm" }));
    assert!(config.train.model_dir.join("model.json").is_file());
    assert!(config.train.model_dir.join("group1-shard1of1.bin").is_file());

    write_json(
        &config.predict.samples_path,
        &json!([
            { "label": "fist", "vector": vec![0.02f32; 42] },
            { "label": "palm", "vector": vec![0.98f32; 42] },
        ]),
    );
    let predicted = export_predictions(&config.predict).unwrap();
    assert_eq!(predicted.rows, 2);
    let csv_text = std::fs::read_to_string(&config.predict.output_csv).unwrap();
    let mut lines = csv_text.lines();
    assert_eq!(lines.next(), Some("TrueLabel,Prob_fist,Prob_palm"));
    assert!(lines.next().unwrap().starts_with("fist,"));
    assert!(lines.next().unwrap().starts_with("palm,"));

    let outputs = generate_report(&config.report).unwrap();
    assert_eq!(outputs.rows, 2);
    assert!(outputs.summary.is_file());
    assert!(outputs.confusion_matrix.is_file());
    assert!(outputs.roc_curves.is_file());
    assert!(outputs.probability_distributions.is_file());
    let summary = std::fs::read_to_string(&outputs.summary).unwrap();
    assert!(summary.contains("Classification Report"));
    assert!(summary.contains("Top Misclassifications (True -> Predicted):"));
}

#[test]
fn config_home_supplies_the_default_config() {
    let home = tempdir().unwrap();
    let _guard = GestpipeEnvGuard::set_config_home(home.path().to_path_buf());

    let (loaded, source) = config::resolve(None).unwrap();
    assert!(source.is_none());
    assert_eq!(loaded, PipelineConfig::default());

    let mut custom = PipelineConfig::default();
    custom.train.epochs = 7;
    custom.report.top_misclassifications = 3;
    let path = gestpipe::app_dirs::config_file_path().unwrap();
    config::save_to_path(&custom, &path).unwrap();

    let (loaded, source) = config::resolve(None).unwrap();
    assert_eq!(source, Some(path));
    assert_eq!(loaded.train.epochs, 7);
    assert_eq!(loaded.report.top_misclassifications, 3);
}

#[test]
fn two_single_sample_sessions_train_a_two_class_mapping() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.train.epochs = 1;
    std::fs::create_dir_all(&config.merge.source_dir).unwrap();
    write_json(
        &config.merge.source_dir.join("a.json"),
        &json!([{ "label": "fist", "vector": vec![0.0f32; 42] }]),
    );
    write_json(
        &config.merge.source_dir.join("b.json"),
        &json!([{ "label": "palm", "vector": vec![1.0f32; 42] }]),
    );

    let merged = merge_samples(
        &config.merge.source_dir,
        &config.merge.output_dir,
        &config.merge.output_file_name,
    )
    .unwrap();
    assert_eq!(merged.total_samples, 2);
    let combined: Value =
        serde_json::from_slice(&std::fs::read(&merged.output_path).unwrap()).unwrap();
    assert_eq!(combined.as_array().map(Vec::len), Some(2));

    let trained = train_from_config(&config.train).unwrap();
    assert_eq!(trained.train_rows, 1);
    assert_eq!(trained.held_out_rows, 1);
    let mapping: Value =
        serde_json::from_slice(&std::fs::read(&config.train.label_mapping_path).unwrap()).unwrap();
    assert_eq!(mapping, json!({ "0": "fist", "1": "palm" }));
}
