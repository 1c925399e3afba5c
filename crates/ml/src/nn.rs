//! # Dense Policy Network
//!
//! A plain feed-forward network evaluated on the CPU. The serialised form is
//! the JSON produced by `serde` for [`MlpPolicy`]:
//!
//! ```json
//! { "layers": [ { "weights": [...], "bias": [...], "in_dim": 56,
//!                 "out_dim": 128, "activation": "elu" }, ... ] }
//! ```
//!
//! Weights are row-major, `out_dim` rows of `in_dim` columns.

use crate::artifact::PolicyArtifact;
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Tanh,
    Elu,
    Sigmoid,
}

impl Activation {
    #[must_use]
    pub fn apply(self, v: f32) -> f32 {
        match self {
            Self::Identity => v,
            Self::Relu => v.max(0.0),
            Self::Tanh => v.tanh(),
            Self::Elu => {
                if v > 0.0 {
                    v
                } else {
                    v.exp_m1()
                }
            }
            Self::Sigmoid => 1.0 / (1.0 + (-v).exp()),
        }
    }
}

/// A fully connected neural network layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dense {
    /// The weight matrix for the layer.
    pub weights: Vec<f32>,
    /// The bias vector for the layer.
    pub bias: Vec<f32>,
    /// The number of input dimensions.
    pub in_dim: usize,
    /// The number of output dimensions.
    pub out_dim: usize,
    /// Applied elementwise after the affine map.
    #[serde(default)]
    pub activation: Activation,
}

impl Dense {
    /// Creates a new `Dense` layer with the given weights and biases.
    ///
    /// # Errors
    ///
    /// Fails when the weight or bias lengths do not match the dimensions.
    pub fn new(
        weights: Vec<f32>,
        bias: Vec<f32>,
        in_dim: usize,
        out_dim: usize,
    ) -> Result<Self, PolicyError> {
        let layer = Self {
            weights,
            bias,
            in_dim,
            out_dim,
            activation: Activation::Identity,
        };
        layer.validate()?;
        Ok(layer)
    }

    #[must_use]
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Glorot-uniform weights, zero bias.
    #[must_use]
    pub fn random(in_dim: usize, out_dim: usize, rng: &mut fastrand::Rng) -> Self {
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        let weights = (0..in_dim * out_dim)
            .map(|_| rng.f32() * 2.0 * limit - limit)
            .collect();
        Self {
            weights,
            bias: vec![0.0; out_dim],
            in_dim,
            out_dim,
            activation: Activation::Identity,
        }
    }

    /// Performs the forward pass through the layer.
    #[must_use]
    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        self.weights
            .chunks_exact(self.in_dim)
            .zip(&self.bias)
            .map(|(row, b)| {
                let sum = row.iter().zip(x).fold(*b, |acc, (w, v)| acc + w * v);
                self.activation.apply(sum)
            })
            .collect()
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.in_dim == 0 || self.out_dim == 0 {
            return Err(PolicyError::InvalidArtifact(
                "layer with zero width".to_string(),
            ));
        }
        if self.weights.len() != self.in_dim * self.out_dim {
            return Err(PolicyError::InvalidArtifact(format!(
                "{} weights for a {}x{} layer",
                self.weights.len(),
                self.out_dim,
                self.in_dim
            )));
        }
        if self.bias.len() != self.out_dim {
            return Err(PolicyError::InvalidArtifact(format!(
                "{} biases for {} outputs",
                self.bias.len(),
                self.out_dim
            )));
        }
        Ok(())
    }
}

/// Multilayer perceptron policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MlpPolicy {
    pub layers: Vec<Dense>,
}

impl MlpPolicy {
    /// # Errors
    ///
    /// Fails on an empty network, a malformed layer, or adjacent layers whose
    /// widths do not chain.
    pub fn new(layers: Vec<Dense>) -> Result<Self, PolicyError> {
        let policy = Self { layers };
        policy.validate()?;
        Ok(policy)
    }

    /// Random network with the given layer widths, e.g. `[56, 128, 128, 16]`.
    /// Hidden layers use `hidden`, the output layer is linear.
    ///
    /// # Errors
    ///
    /// Fails when fewer than two widths are given.
    pub fn random(widths: &[usize], hidden: Activation, seed: u64) -> Result<Self, PolicyError> {
        if widths.len() < 2 {
            return Err(PolicyError::InvalidArtifact(
                "need at least an input and an output width".to_string(),
            ));
        }
        let mut rng = fastrand::Rng::with_seed(seed);
        let last = widths.len() - 2;
        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let layer = Dense::random(pair[0], pair[1], &mut rng);
                if i == last {
                    layer
                } else {
                    layer.with_activation(hidden)
                }
            })
            .collect();
        Self::new(layers)
    }

    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(json: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a serialised artifact from disk.
    ///
    /// # Errors
    ///
    /// I/O, parse or validation failure.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let json = std::fs::read_to_string(path)?;
        let policy = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            input = policy.input_dim(),
            output = policy.output_dim(),
            layers = policy.layers.len(),
            "policy artifact loaded"
        );
        Ok(policy)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.layers.is_empty() {
            return Err(PolicyError::InvalidArtifact("no layers".to_string()));
        }
        for layer in &self.layers {
            layer.validate()?;
        }
        for pair in self.layers.windows(2) {
            if pair[0].out_dim != pair[1].in_dim {
                return Err(PolicyError::InvalidArtifact(format!(
                    "layer of width {} feeds a layer expecting {}",
                    pair[0].out_dim, pair[1].in_dim
                )));
            }
        }
        Ok(())
    }
}

impl PolicyArtifact for MlpPolicy {
    fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.in_dim)
    }

    fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.out_dim)
    }

    fn score(&mut self, input: &[f32]) -> Result<Vec<f32>, PolicyError> {
        if input.len() != self.input_dim() {
            return Err(PolicyError::Shape {
                what: "network input",
                expected: self.input_dim(),
                actual: input.len(),
            });
        }
        let mut x = input.to_vec();
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        Ok(x)
    }
}
