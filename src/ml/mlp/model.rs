use crate::ml::{argmax, softmax};

/// Fully connected layer with row-major `[unit][input]` weights.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub inputs: usize,
    pub units: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl DenseLayer {
    pub fn zeros(inputs: usize, units: usize) -> Self {
        Self {
            inputs,
            units,
            weights: vec![0.0; inputs * units],
            bias: vec![0.0; units],
        }
    }

    /// Weight from input `i` into unit `u`.
    pub fn weight(&self, unit: usize, input: usize) -> f32 {
        self.weights[unit * self.inputs + input]
    }

    /// Affine transform only; activation is applied by the caller.
    pub(crate) fn forward(&self, input: &[f32], out: &mut [f32]) {
        for u in 0..self.units {
            let base = u * self.inputs;
            let mut sum = self.bias[u];
            for i in 0..self.inputs {
                sum += self.weights[base + i] * input[i];
            }
            out[u] = sum;
        }
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if self.weights.len() != self.inputs * self.units {
            return Err(format!("{name} kernel length mismatch"));
        }
        if self.bias.len() != self.units {
            return Err(format!("{name} bias length mismatch"));
        }
        if self.weights.iter().chain(&self.bias).any(|v| !v.is_finite()) {
            return Err(format!("{name} contains non-finite parameters"));
        }
        Ok(())
    }
}

/// Feed-forward gesture classifier: ReLU hidden layers followed by a softmax output.
///
/// Dropout is only applied while training; inference uses the weights as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureMlp {
    pub input_width: usize,
    pub hidden: Vec<DenseLayer>,
    pub output: DenseLayer,
    pub dropout: f32,
    /// Class names ordered by output index.
    pub classes: Vec<String>,
}

impl GestureMlp {
    pub fn validate(&self) -> Result<(), String> {
        if self.input_width == 0 {
            return Err("input width must be positive".to_string());
        }
        let mut fan_in = self.input_width;
        for (idx, layer) in self.hidden.iter().enumerate() {
            if layer.inputs != fan_in {
                return Err(format!(
                    "hidden layer {idx} expects {} inputs, previous layer yields {fan_in}",
                    layer.inputs
                ));
            }
            layer.validate(&format!("hidden layer {idx}"))?;
            fan_in = layer.units;
        }
        if self.output.inputs != fan_in {
            return Err(format!(
                "output layer expects {} inputs, previous layer yields {fan_in}",
                self.output.inputs
            ));
        }
        self.output.validate("output layer")?;
        if self.output.units != self.classes.len() {
            return Err(format!(
                "output layer has {} units for {} classes",
                self.output.units,
                self.classes.len()
            ));
        }
        if self.classes.len() < 2 {
            return Err("Need at least 2 classes".to_string());
        }
        Ok(())
    }

    /// Class probabilities for one landmark vector, or an empty vec on a width mismatch.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        if features.len() != self.input_width || self.classes.is_empty() {
            return Vec::new();
        }
        let mut current = features.to_vec();
        for layer in &self.hidden {
            let mut next = vec![0.0f32; layer.units];
            layer.forward(&current, &mut next);
            for v in &mut next {
                *v = v.max(0.0);
            }
            current = next;
        }
        let mut logits = vec![0.0f32; self.output.units];
        self.output.forward(&current, &mut logits);
        softmax(&logits)
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }

    pub fn parameter_count(&self) -> usize {
        self.hidden
            .iter()
            .chain(std::iter::once(&self.output))
            .map(|layer| layer.weights.len() + layer.bias.len())
            .sum()
    }
}
