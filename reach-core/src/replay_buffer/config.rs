//! Configuration of [`ReplayBuffer`](super::ReplayBuffer).
use crate::error::{ensure_config, ReachError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of prioritized experience replay (PER).
///
/// ```rust
/// use reach_core::replay_buffer::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_0(0.4)
///     .beta_final(1.0)
///     .n_opts_final(100_000);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent of priorities. `0` results in uniform sampling.
    pub alpha: f32,

    /// Initial value of the exponent of importance weights.
    pub beta_0: f32,

    /// Final value of the exponent of importance weights.
    pub beta_final: f32,

    /// Optimization steps after which `beta` reaches `beta_final`.
    pub n_opts_final: usize,
}

impl Default for PerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_final: 1.0,
            n_opts_final: 100_000,
        }
    }
}

impl PerConfig {
    /// Sets the exponent of priorities.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial exponent of importance weights.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final exponent of importance weights.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the number of optimization steps to reach `beta_final`.
    pub fn n_opts_final(mut self, n_opts_final: usize) -> Self {
        self.n_opts_final = n_opts_final;
        self
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), ReachError> {
        ensure_config(self.alpha >= 0.0, format!("alpha must be >= 0, got {}", self.alpha))?;
        for (name, beta) in [("beta_0", self.beta_0), ("beta_final", self.beta_final)] {
            ensure_config(
                (0.0..=1.0).contains(&beta),
                format!("{} must be in [0, 1], got {}", name, beta),
            )?;
        }
        Ok(())
    }
}

/// Configuration of [`ReplayBuffer`](super::ReplayBuffer).
///
/// ```rust
/// use reach_core::replay_buffer::{PerConfig, ReplayBufferConfig};
///
/// let config = ReplayBufferConfig::default()
///     .capacity(10_000)
///     .dim_obs(33)
///     .dim_act(4)
///     .seed(42)
///     .per_config(Some(PerConfig::default()));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions. The oldest one is evicted on overflow.
    pub capacity: usize,

    /// Dimension of states.
    pub dim_obs: usize,

    /// Dimension of actions.
    pub dim_act: usize,

    /// Random seed for sampling batches.
    pub seed: u64,

    /// Configuration of prioritized experience replay. `None` for uniform sampling.
    pub per_config: Option<PerConfig>,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            dim_obs: 1,
            dim_act: 1,
            seed: 42,
            per_config: None,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the dimension of states.
    pub fn dim_obs(mut self, dim_obs: usize) -> Self {
        self.dim_obs = dim_obs;
        self
    }

    /// Sets the dimension of actions.
    pub fn dim_act(mut self, dim_act: usize) -> Self {
        self.dim_act = dim_act;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the configuration for prioritized experience replay.
    pub fn per_config(mut self, per_config: Option<PerConfig>) -> Self {
        self.per_config = per_config;
        self
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), ReachError> {
        ensure_config(self.capacity >= 1, "capacity must be >= 1")?;
        ensure_config(self.dim_obs >= 1, "dim_obs must be >= 1")?;
        ensure_config(self.dim_act >= 1, "dim_act must be >= 1")?;
        if let Some(per_config) = &self.per_config {
            per_config.validate()?;
        }
        Ok(())
    }

    /// Loads [`ReplayBufferConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ReplayBufferConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
