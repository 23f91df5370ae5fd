//! Environment.
use super::{Act, Info, Obs, Step};
use crate::{record::Record, BoxSpace};
use anyhow::Result;

/// Represents an environment with continuous states and actions.
///
/// The simulation itself lives outside of this library; implementors wrap it
/// and expose the episodic `reset`/`step` interface below. Errors returned
/// from these methods are treated as fatal by [`Trainer`](crate::Trainer).
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [self::Step] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Performes an environment step.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Resets the environment with a given index.
    ///
    /// The index is used in an arbitrary way. For example, it can be used as a random seed,
    /// which is useful when evaluation of a trained agent. This method is called
    /// in [`DefaultEvaluator`](crate::DefaultEvaluator).
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs>;

    /// Dimension of the state vector.
    fn dim_obs(&self) -> usize;

    /// Bounds of the action vector.
    fn action_space(&self) -> &BoxSpace;
}
