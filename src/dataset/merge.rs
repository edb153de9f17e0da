//! Merge per-session sample files into one combined JSON array.
//!
//! Records are copied through untouched; shape validation happens when training loads the
//! combined file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Failed to read source directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize merged samples: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a session file did not contribute samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be read or is not valid JSON.
    Unreadable(String),
    /// Valid JSON whose top-level value is not an array.
    NotAList,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(err) => write!(f, "{err}"),
            SkipReason::NotAList => write!(f, "top-level value is not a list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of a merge run.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub output_path: PathBuf,
    pub total_samples: usize,
    /// Files that contributed samples, in processing order.
    pub merged_files: Vec<PathBuf>,
    /// Files skipped with a warning.
    pub skipped: Vec<SkippedFile>,
}

/// Concatenate every `*.json` list in `source_dir` into `output_dir/output_file_name`.
///
/// Files are visited in file-name order. Unreadable, malformed or non-list files are skipped
/// with a warning and never abort the run; an empty source directory yields an empty array.
pub fn merge_samples(
    source_dir: &Path,
    output_dir: &Path,
    output_file_name: &str,
) -> Result<MergeSummary, MergeError> {
    let output_path = output_dir.join(output_file_name);
    let candidates = list_json_files(source_dir)?;

    let mut samples: Vec<Value> = Vec::new();
    let mut merged_files = Vec::new();
    let mut skipped = Vec::new();
    for path in candidates {
        if is_same_file(&path, &output_path) {
            continue;
        }
        match load_session_file(&path) {
            Ok(records) => {
                samples.extend(records);
                merged_files.push(path);
            }
            Err(reason) => {
                match &reason {
                    SkipReason::NotAList => {
                        warn!("Skipping non-list JSON in: {}", path.display())
                    }
                    SkipReason::Unreadable(err) => {
                        warn!("Error reading {}: {err}", path.display())
                    }
                }
                skipped.push(SkippedFile { path, reason });
            }
        }
    }

    fs::create_dir_all(output_dir).map_err(|source| MergeError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let json = serde_json::to_vec_pretty(&samples)?;
    fs::write(&output_path, json).map_err(|source| MergeError::Write {
        path: output_path.clone(),
        source,
    })?;
    info!(
        "Merged {} total samples into: {}",
        samples.len(),
        output_path.display()
    );

    Ok(MergeSummary {
        output_path,
        total_samples: samples.len(),
        merged_files,
        skipped,
    })
}

fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let mut paths = fs::read_dir(dir)
        .map_err(|source| MergeError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".json"))
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn load_session_file(path: &Path) -> Result<Vec<Value>, SkipReason> {
    let bytes = fs::read(path).map_err(|err| SkipReason::Unreadable(err.to_string()))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(_) => Err(SkipReason::NotAList),
        Err(err) => Err(SkipReason::Unreadable(err.to_string())),
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_json(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_vec(value).unwrap()).unwrap();
    }

    fn read_output(path: &Path) -> Vec<Value> {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn concatenates_lists_and_counts_skips() {
        let source = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_json(
            source.path(),
            "a.json",
            &json!([{"label": "fist", "vector": [0]}, {"label": "fist", "vector": [1]}]),
        );
        write_json(source.path(), "b.json", &json!([{"label": "palm", "vector": [2]}]));
        write_json(source.path(), "c.json", &json!({"label": "not a list"}));
        fs::write(source.path().join("d.json"), "[{\"label\": ").unwrap();
        fs::write(source.path().join("notes.txt"), "[1, 2, 3]").unwrap();

        let summary = merge_samples(source.path(), out.path(), "combined.json").unwrap();
        assert_eq!(summary.total_samples, 3);
        assert_eq!(summary.merged_files.len(), 2);
        assert_eq!(summary.skipped.len(), 2);
        assert_eq!(summary.skipped[0].reason, SkipReason::NotAList);
        assert!(matches!(summary.skipped[1].reason, SkipReason::Unreadable(_)));

        let merged = read_output(&summary.output_path);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2]["label"], "palm");
    }

    #[test]
    fn empty_source_produces_empty_array() {
        let source = tempdir().unwrap();
        let out = tempdir().unwrap();
        let output_dir = out.path().join("shared_results");

        let summary = merge_samples(source.path(), &output_dir, "combined.json").unwrap();
        assert_eq!(summary.total_samples, 0);
        assert!(output_dir.is_dir());
        assert!(read_output(&summary.output_path).is_empty());
    }

    #[test]
    fn output_is_pretty_printed_with_two_spaces() {
        let source = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_json(source.path(), "a.json", &json!([{"label": "fist"}]));

        let summary = merge_samples(source.path(), out.path(), "combined.json").unwrap();
        let text = fs::read_to_string(summary.output_path).unwrap();
        assert!(text.starts_with("[\n  {\n    \"label\": \"fist\""));
    }

    #[test]
    fn repeated_runs_are_identical_and_skip_previous_output() {
        let source = tempdir().unwrap();
        write_json(source.path(), "b.json", &json!([{"label": "palm"}]));
        write_json(source.path(), "a.json", &json!([{"label": "fist"}]));

        let first = merge_samples(source.path(), source.path(), "combined.json").unwrap();
        let first_bytes = fs::read(&first.output_path).unwrap();
        let second = merge_samples(source.path(), source.path(), "combined.json").unwrap();
        let second_bytes = fs::read(&second.output_path).unwrap();

        assert_eq!(second.total_samples, 2);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(read_output(&second.output_path)[0]["label"], "fist");
    }

    #[test]
    fn missing_source_directory_is_an_error() {
        let out = tempdir().unwrap();
        let err = merge_samples(&out.path().join("absent"), out.path(), "combined.json")
            .unwrap_err();
        assert!(matches!(err, MergeError::ReadDir { .. }));
    }
}
