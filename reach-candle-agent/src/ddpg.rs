//! DDPG agent and its TD3 extension.
mod base;
mod config;
mod td3;
pub use base::Ddpg;
pub use config::DdpgConfig;
pub use td3::Td3Config;
