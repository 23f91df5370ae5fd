//! Replay buffer interface.
//!
//! Storing experiences ([`ExperienceBufferBase`]) and generating batches
//! ([`ReplayBufferBase`]) are separate interfaces, both implemented by
//! [`ReplayBuffer`](crate::replay_buffer::ReplayBuffer).
use anyhow::Result;

/// Interface for buffers that store experiences from environments.
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    ///
    /// Fails with [`ReachError::InvalidConfiguration`] for out-of-range values.
    ///
    /// [`ReachError::InvalidConfiguration`]: crate::error::ReachError::InvalidConfiguration
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Constructs a batch of `size` experiences for training.
    ///
    /// Fails with [`ReachError::InsufficientData`] if the buffer holds fewer
    /// than `size` experiences.
    ///
    /// [`ReachError::InsufficientData`]: crate::error::ReachError::InsufficientData
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;

    /// Returns the number of experiences available for sampling.
    fn num_samples(&self) -> usize;

    /// Updates the priorities of experiences in the buffer.
    ///
    /// This method is used in prioritized experience replay; buffers without
    /// priorities ignore it.
    fn update_priority(&mut self, ixs: &Option<Vec<usize>>, td_err: &Option<Vec<f32>>);
}
