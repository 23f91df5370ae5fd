//! DDPG and TD3 agents implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The agents plug into the training loop of [`reach_core::Trainer`]:
//!
//! * [`ddpg::Ddpg`] implements [`reach_core::Agent`] for environments with
//!   continuous actions bounded by a [`reach_core::BoxSpace`],
//! * [`actor::Actor`] and [`critic::Critic`] own the parameters and optimizers
//!   of the networks, built from models implementing [`model::SubModel1`] and
//!   [`model::SubModel2`], e.g., [`mlp::Mlp`],
//! * [`explorer::Explorer`] perturbs actions during training.
pub mod actor;
pub mod critic;
pub mod ddpg;
pub mod explorer;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod util;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Default)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}
