#![warn(missing_docs)]
//! Core abstractions for off-policy actor-critic training in continuous control.
//!
//! This crate is independent of numeric backends. It provides
//!
//! * interfaces of environments ([`Env`]), policies ([`Policy`]) and trainable
//!   agents ([`Agent`]),
//! * a ring [`ReplayBuffer`](replay_buffer::ReplayBuffer) of
//!   [`Transition`](replay_buffer::Transition)s,
//! * the episode loop driving an agent ([`Trainer`], [`Sampler`]) and an
//!   [`Evaluator`],
//! * records of training metrics ([`record`]).
pub mod error;
pub mod record;
pub mod replay_buffer;

mod base;
pub use base::{
    Act, Agent, Configurable, Env, ExperienceBufferBase, Info, Obs, Policy, ReplayBufferBase,
    Step, StepProcessor,
};

mod space;
pub use space::BoxSpace;

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{EpisodeStats, Sampler, Trainer, TrainerConfig};
