//! Configuration of [`Trainer`](super::Trainer).
use crate::error::{ensure_config, ReachError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
///
/// Intervals set to `0` disable the corresponding feature.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// Training stops after this number of environment steps.
    pub max_env_steps: usize,

    /// Training stops after this number of episodes.
    pub max_episodes: usize,

    /// Episodes are truncated after this number of steps.
    pub max_steps_per_episode: usize,

    /// Interval of optimization steps in environment steps.
    pub opt_interval: usize,

    /// Warmup period, for filling replay buffer, in environment steps.
    pub warmup_period: usize,

    /// Number of episodes of the moving average of returns.
    pub moving_average_window: usize,

    /// Interval of evaluation in episodes.
    pub eval_interval: usize,

    /// Interval of saving model parameters in episodes.
    pub save_interval: usize,

    /// Interval of flushing records in episodes.
    pub flush_record_interval: usize,

    /// Where to save the trained model.
    pub model_dir: Option<String>,

    /// Random seed of the training environment.
    pub seed: i64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_env_steps: 1_000_000,
            max_episodes: 1000,
            max_steps_per_episode: 1000,
            opt_interval: 1,
            warmup_period: 0,
            moving_average_window: 100,
            eval_interval: 0,
            save_interval: 0,
            flush_record_interval: 1,
            model_dir: None,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    /// Sets the maximum number of environment steps.
    pub fn max_env_steps(mut self, v: usize) -> Self {
        self.max_env_steps = v;
        self
    }

    /// Sets the maximum number of episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the step limit of episodes.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = v;
        self
    }

    /// Sets the interval of optimization in environment steps.
    pub fn opt_interval(mut self, opt_interval: usize) -> Self {
        self.opt_interval = opt_interval;
        self
    }

    /// Sets warmup period in environment steps.
    pub fn warmup_period(mut self, warmup_period: usize) -> Self {
        self.warmup_period = warmup_period;
        self
    }

    /// Sets the window of the moving average of returns.
    pub fn moving_average_window(mut self, v: usize) -> Self {
        self.moving_average_window = v;
        self
    }

    /// Sets the interval of evaluation in episodes.
    pub fn eval_interval(mut self, v: usize) -> Self {
        self.eval_interval = v;
        self
    }

    /// Sets the interval of saving in episodes.
    pub fn save_interval(mut self, save_interval: usize) -> Self {
        self.save_interval = save_interval;
        self
    }

    /// Sets the interval of flushing records in episodes.
    pub fn flush_record_interval(mut self, v: usize) -> Self {
        self.flush_record_interval = v;
        self
    }

    /// Sets the directory where the trained model is saved.
    pub fn model_dir(mut self, model_dir: impl Into<String>) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// Sets the random seed of the training environment.
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), ReachError> {
        ensure_config(self.opt_interval >= 1, "opt_interval must be >= 1")?;
        ensure_config(
            self.max_steps_per_episode >= 1,
            "max_steps_per_episode must be >= 1",
        )?;
        ensure_config(
            self.moving_average_window >= 1,
            "moving_average_window must be >= 1",
        )?;
        ensure_config(
            self.flush_record_interval >= 1,
            "flush_record_interval must be >= 1",
        )?;
        Ok(())
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
