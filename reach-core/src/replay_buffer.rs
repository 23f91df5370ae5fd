//! Replay buffer of transitions with real-valued states and actions.
//!
//! [`ReplayBuffer`] is a capacity-bounded ring: pushing into a full buffer
//! evicts the oldest transition. Batches are drawn uniformly without
//! replacement, or proportionally to priorities when [`PerConfig`] is given.
mod base;
mod batch;
mod config;
mod step_proc;
mod transition;
pub use base::{IwScheduler, ReplayBuffer};
pub use batch::TransitionBatch;
pub use config::{PerConfig, ReplayBufferConfig};
pub use step_proc::{SimpleStepProcessor, SimpleStepProcessorConfig};
pub use transition::Transition;
