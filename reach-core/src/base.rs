//! Core functionalities.
mod agent;
mod env;
mod policy;
mod replay_buffer;
mod step;
pub use agent::Agent;
pub use env::Env;
pub use policy::{Configurable, Policy};
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
use std::fmt::Debug;
pub use step::{Info, Step, StepProcessor};

/// An observation of an environment.
///
/// In this library observations are real-valued state vectors of a fixed
/// dimension, reported by [`Env::dim_obs`].
pub trait Obs: Clone + Debug {
    /// Returns the elements of the state vector.
    fn as_slice(&self) -> &[f32];

    /// Returns the dimension of the state vector.
    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

/// An action of an environment.
///
/// Actions are real-valued vectors bounded by the [`BoxSpace`](crate::BoxSpace)
/// returned by [`Env::action_space`].
pub trait Act: Clone + Debug + From<Vec<f32>> {
    /// Returns the elements of the action vector.
    fn as_slice(&self) -> &[f32];

    /// Returns the dimension of the action vector.
    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

impl Obs for Vec<f32> {
    fn as_slice(&self) -> &[f32] {
        self
    }
}

impl Act for Vec<f32> {
    fn as_slice(&self) -> &[f32] {
        self
    }
}
