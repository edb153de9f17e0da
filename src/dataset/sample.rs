use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hand landmarks captured per frame by the collection front end.
pub const LANDMARK_COUNT: usize = 21;
/// Flattened `(x, y)` landmark coordinates per sample.
pub const DEFAULT_INPUT_WIDTH: usize = LANDMARK_COUNT * 2;

/// One labeled feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    /// Gesture class name.
    pub label: String,
    /// Feature values; every sample in one training run must have the same length.
    pub vector: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid sample file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Sample set is empty")]
    Empty,
    #[error("Sample {index} ({label}) has {actual} features, expected {expected}")]
    VectorLength {
        index: usize,
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("Sample {index} ({label}) has a non-finite feature at position {position}")]
    NonFinite {
        index: usize,
        label: String,
        position: usize,
    },
    #[error("Need at least 2 distinct labels, found {found}")]
    TooFewClasses { found: usize },
    #[error("Split of {total} samples leaves no training rows ({held_out} held out)")]
    EmptyTrainingSplit { total: usize, held_out: usize },
}

/// Load a JSON array of gesture samples.
pub fn load_samples(path: &Path) -> Result<Vec<GestureSample>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Check the preconditions training relies on: a non-empty set, a fixed vector width,
/// finite values and at least two classes.
pub fn validate_samples(samples: &[GestureSample], input_width: usize) -> Result<(), DatasetError> {
    if samples.is_empty() {
        return Err(DatasetError::Empty);
    }
    for (index, sample) in samples.iter().enumerate() {
        if sample.vector.len() != input_width {
            return Err(DatasetError::VectorLength {
                index,
                label: sample.label.clone(),
                expected: input_width,
                actual: sample.vector.len(),
            });
        }
        if let Some(position) = sample.vector.iter().position(|value| !value.is_finite()) {
            return Err(DatasetError::NonFinite {
                index,
                label: sample.label.clone(),
                position,
            });
        }
    }
    let classes = samples
        .iter()
        .map(|sample| sample.label.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    if classes < 2 {
        return Err(DatasetError::TooFewClasses { found: classes });
    }
    Ok(())
}
