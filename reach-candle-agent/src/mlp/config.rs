use super::Activation;
use crate::util::OutDim;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: i64,
    pub(super) units: Vec<i64>,
    pub(super) out_dim: i64,
    pub(super) activation_out: Activation,

    /// Weights and biases of the output layer are drawn from `U(-v, v)` if given.
    #[serde(default)]
    pub(super) init_out: Option<f64>,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `units` - Numbers of units of the hidden layers, with ReLU activation.
    /// * `activation_out` - Activation function of the output layer.
    pub fn new(in_dim: i64, units: Vec<i64>, out_dim: i64, activation_out: Activation) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
            init_out: None,
        }
    }

    /// Initializes the output layer uniformly in `[-v, v]`.
    ///
    /// Small values keep initial actions and action values near zero.
    pub fn init_out(mut self, v: f64) -> Self {
        self.init_out = Some(v);
        self
    }

    /// Input dimension.
    pub fn in_dim(&self) -> i64 {
        self.in_dim
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: i64) {
        self.out_dim = out_dim;
    }
}
