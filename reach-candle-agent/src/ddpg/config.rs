//! Configuration of DDPG agent.
use super::Td3Config;
use crate::{
    actor::ActorConfig, critic::CriticConfig, explorer::ExplorerConfig, util::CriticLoss,
    util::OutDim, Device,
};
use anyhow::Result;
use reach_core::{
    error::{ensure_config, ReachError},
    BoxSpace,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Ddpg`](super::Ddpg).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(bound(deserialize = "Q: DeserializeOwned, P: DeserializeOwned"))]
pub struct DdpgConfig<Q, P>
where
    Q: Debug + PartialEq + Clone,
    P: Debug + PartialEq + Clone + OutDim,
{
    /// Configuration of the actor.
    pub actor_config: ActorConfig<P>,

    /// Configuration of the critics.
    pub critic_config: CriticConfig<Q>,

    /// Discount factor.
    pub gamma: f64,

    /// Coefficient of soft update of the target networks.
    pub tau: f64,

    /// Number of transitions in a batch.
    pub batch_size: usize,

    /// Number of gradient updates in a call of `opt()`.
    pub n_updates_per_opt: usize,

    /// Loss function of the critics.
    pub critic_loss: CriticLoss,

    /// Exploration noise.
    pub explorer_config: ExplorerConfig,

    /// If given, the agent is TD3.
    pub td3: Option<Td3Config>,

    /// Bounds of actions.
    pub action_space: Option<BoxSpace>,

    /// Dimension of states.
    pub dim_obs: Option<usize>,

    /// Device on which the networks are placed.
    pub device: Device,

    /// If `true`, the agent is built in training mode.
    pub train: bool,
}

impl<Q, P> Default for DdpgConfig<Q, P>
where
    Q: Debug + PartialEq + Clone,
    P: Debug + PartialEq + Clone + OutDim,
{
    fn default() -> Self {
        Self {
            actor_config: Default::default(),
            critic_config: Default::default(),
            gamma: 0.99,
            tau: 0.005,
            batch_size: 128,
            n_updates_per_opt: 1,
            critic_loss: CriticLoss::Mse,
            explorer_config: ExplorerConfig::default(),
            td3: None,
            action_space: None,
            dim_obs: None,
            device: Device::Cpu,
            train: false,
        }
    }
}

impl<Q, P> DdpgConfig<Q, P>
where
    Q: Debug + PartialEq + Clone + Serialize + DeserializeOwned,
    P: Debug + PartialEq + Clone + OutDim + Serialize + DeserializeOwned,
{
    /// Sets the configuration of the actor.
    pub fn actor_config(mut self, v: ActorConfig<P>) -> Self {
        self.actor_config = v;
        self
    }

    /// Sets the configuration of the critics.
    pub fn critic_config(mut self, v: CriticConfig<Q>) -> Self {
        self.critic_config = v;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the coefficient of soft update.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the number of gradient updates per optimization step.
    pub fn n_updates_per_opt(mut self, v: usize) -> Self {
        self.n_updates_per_opt = v;
        self
    }

    /// Sets the loss function of the critics.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Sets the exploration noise.
    pub fn explorer_config(mut self, v: ExplorerConfig) -> Self {
        self.explorer_config = v;
        self
    }

    /// Enables TD3.
    pub fn td3(mut self, v: Td3Config) -> Self {
        self.td3 = Some(v);
        self
    }

    /// Sets the bounds of actions.
    pub fn action_space(mut self, v: BoxSpace) -> Self {
        self.action_space = Some(v);
        self
    }

    /// Sets the dimension of states.
    pub fn dim_obs(mut self, v: usize) -> Self {
        self.dim_obs = Some(v);
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Sets the training mode at construction.
    pub fn train(mut self, v: bool) -> Self {
        self.train = v;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<(), ReachError> {
        ensure_config(
            (0.0..=1.0).contains(&self.gamma),
            format!("gamma must be in [0, 1], got {}", self.gamma),
        )?;
        ensure_config(
            self.tau > 0.0 && self.tau <= 1.0,
            format!("tau must be in (0, 1], got {}", self.tau),
        )?;
        ensure_config(self.batch_size >= 1, "batch_size must be >= 1")?;
        ensure_config(self.n_updates_per_opt >= 1, "n_updates_per_opt must be >= 1")?;
        match &self.action_space {
            Some(space) => space.validate()?,
            None => return Err(ReachError::invalid_config("action_space is not set")),
        }
        ensure_config(
            self.dim_obs.map_or(false, |d| d >= 1),
            "dim_obs must be set and >= 1",
        )?;
        self.actor_config.opt_config.validate("actor")?;
        self.critic_config.opt_config.validate("critic")?;
        self.explorer_config.validate()?;
        if let Some(td3) = &self.td3 {
            td3.validate()?;
        }
        Ok(())
    }

    /// Loads [`DdpgConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DdpgConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{Activation, MlpConfig},
        opt::OptimizerConfig,
    };
    use tempdir::TempDir;

    type Config = DdpgConfig<MlpConfig, MlpConfig>;

    fn config() -> Config {
        DdpgConfig::default()
            .actor_config(
                ActorConfig::default()
                    .pi_config(MlpConfig::new(3, vec![64, 64], 1, Activation::None)),
            )
            .critic_config(
                CriticConfig::default()
                    .q_config(MlpConfig::new(4, vec![64, 64], 1, Activation::None)),
            )
            .action_space(BoxSpace::uniform(1, -2.0, 2.0).unwrap())
            .dim_obs(3)
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.tau, 0.005);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.actor_config.opt_config.lr(), 1e-4);
        assert_eq!(config.critic_config.opt_config.lr(), 1e-3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let invalid = |c: Config| matches!(c.validate(), Err(ReachError::InvalidConfiguration(_)));
        assert!(invalid(config().gamma(1.5)));
        assert!(invalid(config().gamma(-0.1)));
        assert!(invalid(config().tau(0.0)));
        assert!(invalid(config().tau(1.1)));
        assert!(invalid(config().batch_size(0)));
        assert!(invalid(config().n_updates_per_opt(0)));
        assert!(invalid(config().td3(Td3Config::default().policy_delay(0))));
        assert!(invalid(config().actor_config(
            ActorConfig::default()
                .pi_config(MlpConfig::new(3, vec![64], 1, Activation::None))
                .opt_config(OptimizerConfig::Adam { lr: 0.0 })
        )));
        assert!(invalid(DdpgConfig::default().dim_obs(3)));
        assert!(config().tau(1.0).gamma(0.0).validate().is_ok());
    }

    #[test]
    fn test_inverted_action_space_from_yaml() -> Result<()> {
        let dir = TempDir::new("ddpg_config")?;
        let path = dir.path().join("ddpg_config.yaml");
        let inverted: BoxSpace = serde_yaml::from_str("low: [2.0]\nhigh: [-2.0]")?;
        config().action_space(inverted).save(&path)?;

        let config_ = Config::load(&path)?;
        assert!(matches!(
            config_.validate(),
            Err(ReachError::InvalidConfiguration(_))
        ));
        Ok(())
    }

    #[test]
    fn test_serde_ddpg_config() -> Result<()> {
        let config = config()
            .td3(Td3Config::default())
            .explorer_config(ExplorerConfig::gaussian())
            .critic_loss(CriticLoss::SmoothL1);

        let dir = TempDir::new("ddpg_config")?;
        let path = dir.path().join("ddpg_config.yaml");
        println!("{:?}", path);

        config.save(&path)?;
        let config_ = Config::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
