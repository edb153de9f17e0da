use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use tracing::info;

use super::{DenseLayer, GestureMlp};
use crate::ml::encoding::one_hot;
use crate::ml::{argmax, softmax_inplace};

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-7;
const PROB_FLOOR: f32 = 1e-7;

/// Encoded training rows: one feature vector and one class index per example.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    pub x: Vec<Vec<f32>>,
    pub y: Vec<usize>,
    pub classes: Vec<String>,
    pub input_width: usize,
}

impl TrainDataset {
    /// Rows picked by index, sharing this dataset's classes.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            classes: self.classes.clone(),
            input_width: self.input_width,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub hidden_units: usize,
    pub hidden_layers: usize,
    pub dropout: f32,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            hidden_units: 64,
            hidden_layers: 2,
            dropout: 0.2,
            epochs: 30,
            batch_size: 32,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

/// Loss and accuracy after one pass over the training rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: GestureMlp,
    pub history: Vec<EpochMetrics>,
}

/// Adam moments for one layer.
struct LayerMoments {
    m_w: Vec<f32>,
    v_w: Vec<f32>,
    m_b: Vec<f32>,
    v_b: Vec<f32>,
}

impl LayerMoments {
    fn for_layer(layer: &DenseLayer) -> Self {
        Self {
            m_w: vec![0.0; layer.weights.len()],
            v_w: vec![0.0; layer.weights.len()],
            m_b: vec![0.0; layer.bias.len()],
            v_b: vec![0.0; layer.bias.len()],
        }
    }
}

/// Per-layer gradient accumulators for one mini-batch.
struct LayerGrads {
    d_w: Vec<f32>,
    d_b: Vec<f32>,
}

/// Train a ReLU/softmax network with mini-batch Adam on categorical cross-entropy.
///
/// Rows are reshuffled every epoch from a generator seeded with `options.seed`, so the same
/// dataset and options always produce the same weights.
pub fn train_mlp(
    dataset: &TrainDataset,
    options: &TrainOptions,
    validation: Option<&TrainDataset>,
) -> Result<TrainOutcome, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    let n_classes = dataset.classes.len();
    if n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    let d = dataset.input_width;
    if let Some(row) = dataset.x.iter().position(|row| row.len() != d) {
        return Err(format!("Row {row} does not have {d} features"));
    }
    if let Some(row) = dataset.y.iter().position(|&y| y >= n_classes) {
        return Err(format!("Row {row} has an out-of-range class index"));
    }
    let hidden_units = options.hidden_units.max(1);
    let batch_size = options.batch_size.max(1);
    let dropout = options.dropout.clamp(0.0, 0.9);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut layers = Vec::with_capacity(options.hidden_layers + 1);
    let mut fan_in = d;
    for _ in 0..options.hidden_layers {
        layers.push(glorot_layer(fan_in, hidden_units, &mut rng));
        fan_in = hidden_units;
    }
    layers.push(glorot_layer(fan_in, n_classes, &mut rng));
    let mut moments: Vec<LayerMoments> = layers.iter().map(LayerMoments::for_layer).collect();
    let mut step = 0i32;

    let last = layers.len() - 1;
    // activations[0] is the input row; activations[l + 1] is layer l after ReLU and dropout
    let mut activations: Vec<Vec<f32>> = std::iter::once(vec![0.0f32; d])
        .chain(layers.iter().map(|layer| vec![0.0f32; layer.units]))
        .collect();
    let mut pre: Vec<Vec<f32>> = layers.iter().map(|layer| vec![0.0f32; layer.units]).collect();
    let mut masks: Vec<Vec<f32>> = layers[..last]
        .iter()
        .map(|layer| vec![1.0f32; layer.units])
        .collect();
    let mut probs = vec![0.0f32; n_classes];
    let targets = one_hot(&dataset.y, n_classes);

    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    let mut history = Vec::with_capacity(options.epochs);
    for epoch in 1..=options.epochs {
        indices.shuffle(&mut rng);
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;

        for batch in indices.chunks(batch_size) {
            let mut grads: Vec<LayerGrads> = layers
                .iter()
                .map(|layer| LayerGrads {
                    d_w: vec![0.0; layer.weights.len()],
                    d_b: vec![0.0; layer.bias.len()],
                })
                .collect();

            for &idx in batch {
                activations[0].copy_from_slice(&dataset.x[idx]);
                for l in 0..=last {
                    let (done, rest) = activations.split_at_mut(l + 1);
                    layers[l].forward(&done[l], &mut pre[l]);
                    if l == last {
                        softmax_inplace(&pre[l], &mut probs);
                        continue;
                    }
                    for (u, out) in rest[0].iter_mut().enumerate() {
                        let scale = if dropout > 0.0 {
                            if rng.random::<f32>() >= dropout {
                                1.0 / (1.0 - dropout)
                            } else {
                                0.0
                            }
                        } else {
                            1.0
                        };
                        masks[l][u] = scale;
                        *out = pre[l][u].max(0.0) * scale;
                    }
                }

                let y = dataset.y[idx];
                loss_sum -= f64::from(probs[y].max(PROB_FLOOR).ln());
                if argmax(&probs) == y {
                    correct += 1;
                }

                // softmax + cross-entropy gradient at the logits
                let mut delta: Vec<f32> = probs
                    .iter()
                    .zip(&targets[idx])
                    .map(|(p, t)| p - t)
                    .collect();
                for l in (0..=last).rev() {
                    let layer = &layers[l];
                    let input = &activations[l];
                    let grad = &mut grads[l];
                    for u in 0..layer.units {
                        grad.d_b[u] += delta[u];
                        let base = u * layer.inputs;
                        for i in 0..layer.inputs {
                            grad.d_w[base + i] += delta[u] * input[i];
                        }
                    }
                    if l == 0 {
                        break;
                    }
                    let below = l - 1;
                    let mut next_delta = vec![0.0f32; layer.inputs];
                    for (i, nd) in next_delta.iter_mut().enumerate() {
                        if pre[below][i] <= 0.0 || masks[below][i] == 0.0 {
                            continue;
                        }
                        let mut sum = 0.0f32;
                        for u in 0..layer.units {
                            sum += delta[u] * layer.weights[u * layer.inputs + i];
                        }
                        *nd = sum * masks[below][i];
                    }
                    delta = next_delta;
                }
            }

            step += 1;
            let scale = 1.0 / batch.len() as f32;
            let lr_t = options.learning_rate * (1.0 - ADAM_BETA2.powi(step)).sqrt()
                / (1.0 - ADAM_BETA1.powi(step));
            let update = AdamStep { scale, lr_t };
            for ((layer, grad), moment) in layers.iter_mut().zip(&grads).zip(&mut moments) {
                update.apply(&mut layer.weights, &grad.d_w, &mut moment.m_w, &mut moment.v_w);
                update.apply(&mut layer.bias, &grad.d_b, &mut moment.m_b, &mut moment.v_b);
            }
        }

        let n = dataset.len() as f32;
        let mut metrics = EpochMetrics {
            epoch,
            loss: (loss_sum / f64::from(n)) as f32,
            accuracy: correct as f32 / n,
            val_loss: None,
            val_accuracy: None,
        };
        if let Some(validation) = validation.filter(|set| !set.is_empty()) {
            let (val_loss, val_accuracy) = evaluate(&layers, validation);
            metrics.val_loss = Some(val_loss);
            metrics.val_accuracy = Some(val_accuracy);
            info!(
                "Epoch {epoch}/{}: loss {:.4}, accuracy {:.4}, \
                 val_loss {val_loss:.4}, val_accuracy {val_accuracy:.4}",
                options.epochs, metrics.loss, metrics.accuracy
            );
        } else {
            info!(
                "Epoch {epoch}/{}: loss {:.4}, accuracy {:.4}",
                options.epochs, metrics.loss, metrics.accuracy
            );
        }
        history.push(metrics);
    }

    let output = layers
        .pop()
        .ok_or_else(|| "Network has no output layer".to_string())?;
    let model = GestureMlp {
        input_width: d,
        hidden: layers,
        output,
        dropout,
        classes: dataset.classes.clone(),
    };
    model.validate()?;
    Ok(TrainOutcome { model, history })
}

fn glorot_layer(inputs: usize, units: usize, rng: &mut StdRng) -> DenseLayer {
    let limit = (6.0 / (inputs + units) as f32).sqrt();
    let mut layer = DenseLayer::zeros(inputs, units);
    for w in &mut layer.weights {
        *w = rng.random_range(-limit..limit);
    }
    layer
}

/// One bias-corrected Adam update with the batch-mean gradient scale.
struct AdamStep {
    scale: f32,
    lr_t: f32,
}

impl AdamStep {
    fn apply(&self, params: &mut [f32], grads: &[f32], m: &mut [f32], v: &mut [f32]) {
        for i in 0..params.len() {
            let g = grads[i] * self.scale;
            m[i] = ADAM_BETA1 * m[i] + (1.0 - ADAM_BETA1) * g;
            v[i] = ADAM_BETA2 * v[i] + (1.0 - ADAM_BETA2) * g * g;
            params[i] -= self.lr_t * m[i] / (v[i].sqrt() + ADAM_EPSILON);
        }
    }
}

/// Mean cross-entropy and accuracy without dropout.
fn evaluate(layers: &[DenseLayer], dataset: &TrainDataset) -> (f32, f32) {
    let Some((output, hidden)) = layers.split_last() else {
        return (0.0, 0.0);
    };
    let model = GestureMlp {
        input_width: dataset.input_width,
        hidden: hidden.to_vec(),
        output: output.clone(),
        dropout: 0.0,
        classes: dataset.classes.clone(),
    };
    let mut loss = 0.0f64;
    let mut correct = 0usize;
    for (x, &y) in dataset.x.iter().zip(&dataset.y) {
        let probs = model.predict_proba(x);
        let p = probs.get(y).copied().unwrap_or(0.0);
        loss -= f64::from(p.max(PROB_FLOOR).ln());
        if argmax(&probs) == y {
            correct += 1;
        }
    }
    let n = dataset.len() as f32;
    ((loss / f64::from(n)) as f32, correct as f32 / n)
}
