//! TensorFlow.js "layers-model" export: a `model.json` topology plus one little-endian
//! float32 weight shard, loadable by `tf.loadLayersModel` in the browser.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DenseLayer, GestureMlp};

pub const MODEL_JSON_FILE: &str = "model.json";
pub const WEIGHTS_SHARD_FILE: &str = "group1-shard1of1.bin";
const FORMAT: &str = "layers-model";
const DTYPE: &str = "float32";
const KERAS_VERSION: &str = "tfjs-layers 4.22.0";
const BACKEND: &str = "tensor_flow.js";

#[derive(Debug, Error)]
pub enum TfjsError {
    #[error("Failed to create model directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model.json {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported model: {0}")]
    Unsupported(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelArtifacts {
    format: String,
    #[serde(default)]
    generated_by: Option<String>,
    #[serde(default)]
    converted_by: Option<String>,
    model_topology: ModelTopology,
    weights_manifest: Vec<WeightGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_defined_metadata: Option<UserMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelTopology {
    class_name: String,
    config: SequentialConfig,
    #[serde(default)]
    keras_version: Option<String>,
    #[serde(default)]
    backend: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SequentialConfig {
    name: String,
    layers: Vec<LayerSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "class_name", content = "config")]
enum LayerSpec {
    Dense(DenseConfig),
    Dropout(DropoutConfig),
}

#[derive(Debug, Serialize, Deserialize)]
struct DenseConfig {
    name: String,
    units: usize,
    activation: String,
    #[serde(default = "default_true")]
    use_bias: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_input_shape: Option<Vec<Option<usize>>>,
    #[serde(default = "default_dtype")]
    dtype: String,
    #[serde(default = "default_true")]
    trainable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct DropoutConfig {
    name: String,
    rate: f32,
    #[serde(default = "default_true")]
    trainable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WeightGroup {
    paths: Vec<String>,
    weights: Vec<WeightSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WeightSpec {
    name: String,
    shape: Vec<usize>,
    #[serde(default = "default_dtype")]
    dtype: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserMetadata {
    classes: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_dtype() -> String {
    DTYPE.to_string()
}

fn layer_name(kind: &str, ordinal: usize) -> String {
    if ordinal == 0 {
        kind.to_string()
    } else {
        format!("{kind}_{ordinal}")
    }
}

/// Write `model.json` and its weight shard into `dir`, replacing earlier files.
pub fn save_layers_model(model: &GestureMlp, dir: &Path) -> Result<PathBuf, TfjsError> {
    model.validate().map_err(TfjsError::Unsupported)?;
    fs::create_dir_all(dir).map_err(|source| TfjsError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let dense_layers: Vec<(&DenseLayer, &str)> = model
        .hidden
        .iter()
        .map(|layer| (layer, "relu"))
        .chain(std::iter::once((&model.output, "softmax")))
        .collect();

    let mut layers = Vec::new();
    let mut weights = Vec::new();
    let mut shard: Vec<u8> = Vec::with_capacity(model.parameter_count() * 4);
    for (ordinal, (layer, activation)) in dense_layers.iter().enumerate() {
        let name = layer_name("dense", ordinal);
        layers.push(LayerSpec::Dense(DenseConfig {
            name: name.clone(),
            units: layer.units,
            activation: activation.to_string(),
            use_bias: true,
            batch_input_shape: (ordinal == 0).then(|| vec![None, Some(model.input_width)]),
            dtype: default_dtype(),
            trainable: true,
        }));
        if ordinal < model.hidden.len() {
            layers.push(LayerSpec::Dropout(DropoutConfig {
                name: layer_name("dropout", ordinal),
                rate: model.dropout,
                trainable: true,
            }));
        }

        // Kernels are stored [input][unit] on disk.
        for i in 0..layer.inputs {
            for u in 0..layer.units {
                shard.extend_from_slice(&layer.weight(u, i).to_le_bytes());
            }
        }
        for b in &layer.bias {
            shard.extend_from_slice(&b.to_le_bytes());
        }
        weights.push(WeightSpec {
            name: format!("{name}/kernel"),
            shape: vec![layer.inputs, layer.units],
            dtype: default_dtype(),
        });
        weights.push(WeightSpec {
            name: format!("{name}/bias"),
            shape: vec![layer.units],
            dtype: default_dtype(),
        });
    }

    let artifacts = ModelArtifacts {
        format: FORMAT.to_string(),
        generated_by: Some(format!("gestpipe {}", env!("CARGO_PKG_VERSION"))),
        converted_by: None,
        model_topology: ModelTopology {
            class_name: "Sequential".to_string(),
            config: SequentialConfig {
                name: "sequential".to_string(),
                layers,
            },
            keras_version: Some(KERAS_VERSION.to_string()),
            backend: Some(BACKEND.to_string()),
        },
        weights_manifest: vec![WeightGroup {
            paths: vec![WEIGHTS_SHARD_FILE.to_string()],
            weights,
        }],
        user_defined_metadata: Some(UserMetadata {
            classes: model.classes.clone(),
        }),
    };

    let model_path = dir.join(MODEL_JSON_FILE);
    let json = serde_json::to_vec_pretty(&artifacts).map_err(|source| TfjsError::Json {
        path: model_path.clone(),
        source,
    })?;
    let shard_path = dir.join(WEIGHTS_SHARD_FILE);
    fs::write(&shard_path, shard).map_err(|source| TfjsError::Write {
        path: shard_path,
        source,
    })?;
    fs::write(&model_path, json).map_err(|source| TfjsError::Write {
        path: model_path.clone(),
        source,
    })?;
    Ok(model_path)
}

/// Load a dense ReLU/softmax layers-model previously written by [`save_layers_model`].
///
/// Class names come from the model metadata when present, otherwise from output indices.
pub fn load_layers_model(dir: &Path) -> Result<GestureMlp, TfjsError> {
    let model_path = dir.join(MODEL_JSON_FILE);
    let bytes = fs::read(&model_path).map_err(|source| TfjsError::Read {
        path: model_path.clone(),
        source,
    })?;
    let artifacts: ModelArtifacts =
        serde_json::from_slice(&bytes).map_err(|source| TfjsError::Json {
            path: model_path.clone(),
            source,
        })?;
    if artifacts.format != FORMAT {
        return Err(TfjsError::Unsupported(format!(
            "format {:?} (expected {FORMAT:?})",
            artifacts.format
        )));
    }
    if artifacts.model_topology.class_name != "Sequential" {
        return Err(TfjsError::Unsupported(format!(
            "topology {:?}",
            artifacts.model_topology.class_name
        )));
    }

    let tensors = read_weight_tensors(dir, &artifacts.weights_manifest)?;
    let mut dense = Vec::new();
    let mut dropout = 0.0f32;
    let mut input_width = None;
    for spec in &artifacts.model_topology.config.layers {
        match spec {
            LayerSpec::Dropout(config) => {
                dropout = config.rate;
            }
            LayerSpec::Dense(config) => {
                if !config.use_bias {
                    return Err(TfjsError::Unsupported(format!(
                        "layer {} has no bias",
                        config.name
                    )));
                }
                if input_width.is_none() {
                    input_width = config
                        .batch_input_shape
                        .as_ref()
                        .and_then(|shape| shape.last().copied().flatten());
                }
                dense.push((config, dense_from_tensors(config, &tensors)?));
            }
        }
    }

    let Some(((output_config, output), hidden)) = dense.split_last() else {
        return Err(TfjsError::Unsupported("no dense layers".to_string()));
    };
    if output_config.activation != "softmax" {
        return Err(TfjsError::Unsupported(format!(
            "output activation {:?}",
            output_config.activation
        )));
    }
    if let Some((config, _)) = hidden.iter().find(|(config, _)| config.activation != "relu") {
        return Err(TfjsError::Unsupported(format!(
            "hidden activation {:?} on {}",
            config.activation, config.name
        )));
    }
    let input_width = input_width
        .or_else(|| dense.first().map(|(_, layer)| layer.inputs))
        .unwrap_or(0);
    let classes = artifacts
        .user_defined_metadata
        .map(|meta| meta.classes)
        .unwrap_or_else(|| (0..output.units).map(|idx| idx.to_string()).collect());

    let model = GestureMlp {
        input_width,
        hidden: hidden.iter().map(|(_, layer)| layer.clone()).collect(),
        output: output.clone(),
        dropout,
        classes,
    };
    model.validate().map_err(TfjsError::Unsupported)?;
    Ok(model)
}

fn read_weight_tensors(
    dir: &Path,
    manifest: &[WeightGroup],
) -> Result<HashMap<String, (Vec<usize>, Vec<f32>)>, TfjsError> {
    let mut tensors = HashMap::new();
    for group in manifest {
        let mut bytes = Vec::new();
        for shard in &group.paths {
            let path = dir.join(shard);
            let mut data = fs::read(&path).map_err(|source| TfjsError::Read { path, source })?;
            bytes.append(&mut data);
        }
        let mut offset = 0usize;
        for spec in &group.weights {
            if spec.dtype != DTYPE {
                return Err(TfjsError::Unsupported(format!(
                    "weight {} has dtype {}",
                    spec.name, spec.dtype
                )));
            }
            let count: usize = spec.shape.iter().product();
            let end = offset + count * 4;
            let Some(raw) = bytes.get(offset..end) else {
                return Err(TfjsError::Unsupported(format!(
                    "weight shard too short for {}",
                    spec.name
                )));
            };
            let values = raw
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            tensors.insert(spec.name.clone(), (spec.shape.clone(), values));
            offset = end;
        }
    }
    Ok(tensors)
}

fn dense_from_tensors(
    config: &DenseConfig,
    tensors: &HashMap<String, (Vec<usize>, Vec<f32>)>,
) -> Result<DenseLayer, TfjsError> {
    let lookup = |suffix: &str| {
        let name = format!("{}/{suffix}", config.name);
        tensors
            .get(&name)
            .ok_or_else(|| TfjsError::Unsupported(format!("missing weight {name}")))
    };
    let (kernel_shape, kernel) = lookup("kernel")?;
    let (bias_shape, bias) = lookup("bias")?;
    let [inputs, units] = kernel_shape.as_slice() else {
        return Err(TfjsError::Unsupported(format!(
            "kernel of {} is not 2-D",
            config.name
        )));
    };
    if *units != config.units || bias_shape.as_slice() != [config.units] {
        return Err(TfjsError::Unsupported(format!(
            "weight shapes of {} do not match {} units",
            config.name, config.units
        )));
    }
    let mut layer = DenseLayer::zeros(*inputs, *units);
    for i in 0..*inputs {
        for u in 0..*units {
            layer.weights[u * inputs + i] = kernel[i * units + u];
        }
    }
    layer.bias.clone_from(bias);
    Ok(layer)
}
