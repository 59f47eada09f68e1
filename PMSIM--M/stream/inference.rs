use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maps one feature vector to one predicted scalar.
pub trait InferenceService {
    /// Runs the model on `features`.
    fn predict(&mut self, features: &[f64]) -> Result<f64, InferenceError>;
}

/// Errors raised while loading or running a model.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Weights file does not exist.
    #[error("model file not found: {}", .path.display())]
    Missing {
        /// Expected location.
        path: PathBuf,
    },
    /// Filesystem failure other than a missing file.
    #[error("reading model {}: {source}", .path.display())]
    Io {
        /// Model path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Weights file is not valid JSON for a dense network.
    #[error("parsing model weights: {0}")]
    Format(#[from] serde_json::Error),
    /// Layer dimensions do not chain.
    #[error("invalid network: {0}")]
    Invalid(String),
    /// Feature vector width differs from the input layer.
    #[error("expected {expected} features, got {found}")]
    Shape {
        /// Input layer width.
        expected: usize,
        /// Received width.
        found: usize,
    },
    /// Forward pass produced NaN or infinity.
    #[error("model produced a non-finite value: {0}")]
    NonFinite(f64),
    /// Failure reported by an external backend.
    #[error("inference backend failure: {0}")]
    Backend(String),
}

/// Element-wise activation applied after a dense layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Identity.
    #[default]
    Linear,
    /// `max(0, x)`.
    Relu,
    /// Hyperbolic tangent.
    Tanh,
}

impl Activation {
    fn apply(self, values: &mut Array1<f64>) {
        match self {
            Self::Linear => {}
            Self::Relu => values.mapv_inplace(|v| v.max(0.0)),
            Self::Tanh => values.mapv_inplace(f64::tanh),
        }
    }
}

/// Fully connected layer; `weights` is `(inputs, outputs)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    /// Creates a layer from a weight matrix and bias vector.
    pub fn new(
        weights: Array2<f64>,
        bias: Array1<f64>,
        activation: Activation,
    ) -> Result<Self, InferenceError> {
        if bias.len() != weights.ncols() {
            return Err(InferenceError::Invalid(format!(
                "bias has {} entries for {} outputs",
                bias.len(),
                weights.ncols()
            )));
        }
        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    fn forward(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut out = input.dot(&self.weights) + &self.bias;
        self.activation.apply(&mut out);
        out
    }
}

#[derive(Debug, Deserialize)]
struct NetworkFile {
    input_dim: usize,
    layers: Vec<LayerFile>,
}

#[derive(Debug, Deserialize)]
struct LayerFile {
    output_dim: usize,
    weights: Vec<f64>,
    #[serde(default)]
    bias: Option<Vec<f64>>,
    #[serde(default)]
    activation: Activation,
}

/// Feed-forward regression network ending in a single output.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseNetwork {
    input_dim: usize,
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Chains `layers`, checking that widths line up and the last layer has
    /// exactly one output.
    pub fn from_layers(input_dim: usize, layers: Vec<DenseLayer>) -> Result<Self, InferenceError> {
        if layers.is_empty() {
            return Err(InferenceError::Invalid("network has no layers".into()));
        }
        let mut width = input_dim;
        for (idx, layer) in layers.iter().enumerate() {
            if layer.weights.nrows() != width {
                return Err(InferenceError::Invalid(format!(
                    "layer {idx} expects {} inputs but receives {width}",
                    layer.weights.nrows()
                )));
            }
            width = layer.weights.ncols();
        }
        if width != 1 {
            return Err(InferenceError::Invalid(format!(
                "final layer has {width} outputs, expected 1"
            )));
        }
        Ok(Self { input_dim, layers })
    }

    /// Single linear layer: `features · weights + bias`.
    pub fn linear(weights: Vec<f64>, bias: f64) -> Result<Self, InferenceError> {
        let input_dim = weights.len();
        let matrix = Array2::from_shape_vec((input_dim, 1), weights)
            .map_err(|err| InferenceError::Invalid(err.to_string()))?;
        let layer = DenseLayer::new(matrix, Array1::from_elem(1, bias), Activation::Linear)?;
        Self::from_layers(input_dim, vec![layer])
    }

    /// Loads a JSON weights file (`input_dim` plus row-major `layers`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => InferenceError::Missing {
                path: path.to_path_buf(),
            },
            _ => InferenceError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::from_json(&raw)
    }

    /// Parses the JSON weights format.
    pub fn from_json(raw: &str) -> Result<Self, InferenceError> {
        let file: NetworkFile = serde_json::from_str(raw)?;
        let mut width = file.input_dim;
        let mut layers = Vec::with_capacity(file.layers.len());
        for (idx, layer) in file.layers.into_iter().enumerate() {
            let weights = Array2::from_shape_vec((width, layer.output_dim), layer.weights)
                .map_err(|err| InferenceError::Invalid(format!("layer {idx}: {err}")))?;
            let bias = layer
                .bias
                .map_or_else(|| Array1::zeros(layer.output_dim), Array1::from);
            layers.push(DenseLayer::new(weights, bias, layer.activation)?);
            width = layer.output_dim;
        }
        Self::from_layers(file.input_dim, layers)
    }

    /// Expected feature width.
    #[must_use]
    pub const fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of layers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl InferenceService for DenseNetwork {
    fn predict(&mut self, features: &[f64]) -> Result<f64, InferenceError> {
        if features.len() != self.input_dim {
            return Err(InferenceError::Shape {
                expected: self.input_dim,
                found: features.len(),
            });
        }
        let mut activations = Array1::from(features.to_vec());
        for layer in &self.layers {
            activations = layer.forward(activations.view());
        }
        let value = activations[0];
        if value.is_finite() {
            Ok(value)
        } else {
            Err(InferenceError::NonFinite(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn linear_network_predicts_dot_product() {
        let mut net = DenseNetwork::linear(vec![0.5, 2.0], 1.0).unwrap();
        let out = net.predict(&[4.0, 3.0]).unwrap();
        assert!((out - 9.0).abs() < 1e-12);
        assert_eq!(net.input_dim(), 2);
    }

    #[test]
    fn loads_hidden_relu_layer_from_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("model.json");
        let doc = json!({
            "input_dim": 2,
            "layers": [
                { "output_dim": 2, "weights": [1.0, -1.0, 1.0, -1.0], "activation": "relu" },
                { "output_dim": 1, "weights": [1.0, 1.0], "bias": [10.0] }
            ]
        });
        fs::write(&path, doc.to_string()).unwrap();
        let mut net = DenseNetwork::from_file(&path).unwrap();
        assert_eq!(net.depth(), 2);
        // hidden = relu([3, -3]) = [3, 0]
        assert!((net.predict(&[1.0, 2.0]).unwrap() - 13.0).abs() < 1e-12);
        // hidden = relu([-3, 3]) = [0, 3]
        assert!((net.predict(&[-1.0, -2.0]).unwrap() - 13.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_feature_width() {
        let mut net = DenseNetwork::linear(vec![1.0; 3], 0.0).unwrap();
        assert!(matches!(
            net.predict(&[1.0]),
            Err(InferenceError::Shape { expected: 3, found: 1 })
        ));
    }

    #[test]
    fn rejects_non_finite_output() {
        let mut net = DenseNetwork::linear(vec![1.0], 0.0).unwrap();
        assert!(matches!(
            net.predict(&[f64::INFINITY]),
            Err(InferenceError::NonFinite(_))
        ));
    }

    #[test]
    fn validates_layer_chain() {
        let err = DenseNetwork::from_json(
            &json!({
                "input_dim": 2,
                "layers": [{ "output_dim": 2, "weights": [1.0, 0.0, 0.0, 1.0] }]
            })
            .to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, InferenceError::Invalid(_)));
        let err = DenseNetwork::from_json(
            &json!({ "input_dim": 3, "layers": [{ "output_dim": 1, "weights": [1.0] }] })
                .to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, InferenceError::Invalid(_)));
        assert!(matches!(
            DenseNetwork::from_file(tempdir().unwrap().path().join("absent.json")),
            Err(InferenceError::Missing { .. })
        ));
    }
}
