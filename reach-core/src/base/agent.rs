//! Agent.
use super::{Env, Policy, ReplayBufferBase};
use crate::record::Record;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Represents a trainable policy on an environment.
pub trait Agent<E: Env, R: ReplayBufferBase>: Policy<E> {
    /// Set the policy to training mode.
    ///
    /// In training mode, [`Policy::sample`] injects exploration noise.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Performs an optimization step and returns some information.
    ///
    /// `buffer` is a replay buffer from which transitions will be taken
    /// for updating model parameters. When the buffer does not hold enough
    /// transitions for a batch, the step is skipped and `Ok(None)` is returned.
    fn opt(&mut self, buffer: &mut R) -> Result<Option<Record>>;

    /// Save the parameters of the agent in the given directory.
    ///
    /// This method commonly creates a number of files consisting the agent
    /// in the directory. For example, the DDPG agent in `reach_candle_agent` saves
    /// the actor, the critics and their target networks.
    /// Returns the paths of the created files.
    fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
