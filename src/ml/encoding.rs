//! Label encoding: class names ↔ contiguous indices, one-hot targets and the persisted
//! index → name mapping consumed by inference.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Label {0:?} was not seen when fitting the encoder")]
    UnknownLabel(String),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid label mapping {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Deterministic encoder over the sorted distinct labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit over the distinct labels, ordered by code point.
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes = labels
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    /// Encode labels into class indices.
    pub fn transform<'a, I>(&self, labels: I) -> Result<Vec<usize>, EncodingError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels
            .into_iter()
            .map(|label| {
                self.index_of(label)
                    .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
            })
            .collect()
    }

    /// Decode a class index back to its name.
    pub fn inverse(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn mapping(&self) -> LabelMapping {
        LabelMapping {
            classes: self.classes.clone(),
        }
    }
}

/// Expand class indices into one-hot probability rows of width `n_classes`.
pub fn one_hot(indices: &[usize], n_classes: usize) -> Vec<Vec<f32>> {
    indices
        .iter()
        .map(|&idx| {
            let mut row = vec![0.0f32; n_classes];
            if let Some(slot) = row.get_mut(idx) {
                *slot = 1.0;
            }
            row
        })
        .collect()
}

/// Index → class name mapping, serialized as `{"0": "name", "1": "name", ...}` in index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    classes: Vec<String>,
}

impl LabelMapping {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// Class names ordered by index.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Write the mapping as pretty JSON, overwriting `path`.
    pub fn write_json(&self, path: &Path) -> Result<(), EncodingError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| EncodingError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EncodingError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| EncodingError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_json(path: &Path) -> Result<Self, EncodingError> {
        let bytes = std::fs::read(path).map_err(|source| EncodingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| EncodingError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Serialize for LabelMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len()))?;
        for (idx, class) in self.classes.iter().enumerate() {
            map.serialize_entry(&idx.to_string(), class)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LabelMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = LabelMapping;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping contiguous integer indices to class names")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut by_index = BTreeMap::new();
        while let Some((key, class)) = access.next_entry::<String, String>()? {
            let idx = key
                .parse::<usize>()
                .map_err(|_| de::Error::custom(format!("index {key:?} is not an integer")))?;
            if by_index.insert(idx, class).is_some() {
                return Err(de::Error::custom(format!("duplicate index {idx}")));
            }
        }
        for (expected, idx) in by_index.keys().enumerate() {
            if *idx != expected {
                return Err(de::Error::custom(format!(
                    "indices must be contiguous from 0, missing {expected}"
                )));
            }
        }
        Ok(LabelMapping {
            classes: by_index.into_values().collect(),
        })
    }
}
