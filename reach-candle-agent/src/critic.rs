//! Critic.
use crate::{
    model::SubModel2,
    opt::{Optimizer, OptimizerConfig},
    util::{track, OutDim},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Critic`].
pub struct CriticConfig<Q> {
    /// Configuration of the action-value network.
    pub q_config: Option<Q>,

    /// Optimizer of the action-value network.
    pub opt_config: OptimizerConfig,
}

impl<Q> Default for CriticConfig<Q> {
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::Adam { lr: 1e-3 },
        }
    }
}

impl<Q> CriticConfig<Q>
where
    Q: DeserializeOwned + Serialize,
{
    /// Sets configurations for action-value function.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`CriticConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CriticConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Represents an action-value function `Q(s, a)`.
///
/// Each critic owns its variables, so two critics built from the same
/// configuration are initialized independently.
pub struct Critic<Q>
where
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    device: Device,
    varmap: VarMap,

    // Action-value function
    q_config: Q::Config,
    q: Q,

    // Optimizer
    opt_config: OptimizerConfig,
    opt: Optimizer,
}

impl<Q> Critic<Q>
where
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`Critic`].
    pub fn build(config: CriticConfig<Q::Config>, device: Device) -> Result<Critic<Q>> {
        let q_config = config.q_config.context("q_config is not set.")?;
        anyhow::ensure!(
            q_config.get_out_dim() == 1,
            "output dimension of critics must be 1, got {}",
            q_config.get_out_dim()
        );
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("critic");
            Q::build(vb, q_config.clone())?
        };
        let opt_config = config.opt_config;
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            q_config,
            q,
            opt_config,
            opt,
        })
    }

    /// Returns action values of shape `(batch_size,)`.
    pub fn forward(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        Ok(self.q.forward(obs, act)?.squeeze(D::Minus1)?)
    }

    /// Applies a gradient step on the loss.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// Soft update of the parameters towards those of `src`.
    pub fn track(&mut self, src: &Self, tau: f64) -> Result<()> {
        track(&self.varmap, &src.varmap, tau)
    }

    /// Variables of the action-value network.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Save variables to prefix + ".safetensors".
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<PathBuf> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("safetensors");
        self.varmap.save(path.as_path())?;
        info!("Save critic parameters to {:?}", path);

        Ok(path)
    }

    /// Load variables from prefix + ".safetensors".
    pub fn load(&mut self, prefix: impl AsRef<Path>) -> Result<()> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("safetensors");
        self.varmap
            .load(path.as_path())
            .with_context(|| format!("Failed to load critic parameters from {:?}", path))?;
        info!("Load critic parameters from {:?}", path);

        Ok(())
    }

    /// Returns a critic with the same parameters and a fresh optimizer.
    pub fn try_clone(&self) -> Result<Self> {
        let config = CriticConfig {
            q_config: Some(self.q_config.clone()),
            opt_config: self.opt_config.clone(),
        };
        let critic = Self::build(config, self.device.clone())?;
        track(&critic.varmap, &self.varmap, 1.0)?;
        Ok(critic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{Activation, Mlp, MlpConfig},
        util::param_distance,
    };

    fn config() -> CriticConfig<MlpConfig> {
        CriticConfig::default().q_config(MlpConfig::new(3, vec![16, 16], 1, Activation::None))
    }

    #[test]
    fn test_independent_initialization() -> Result<()> {
        let q1 = Critic::<Mlp>::build(config(), Device::Cpu)?;
        let q2 = Critic::<Mlp>::build(config(), Device::Cpu)?;
        assert!(param_distance(q1.get_varmap(), q2.get_varmap())? > 0.0);

        let q1_tgt = q1.try_clone()?;
        assert_eq!(param_distance(q1.get_varmap(), q1_tgt.get_varmap())?, 0.0);
        Ok(())
    }

    #[test]
    fn test_forward_shape() -> Result<()> {
        let q = Critic::<Mlp>::build(config(), Device::Cpu)?;
        let obs = Tensor::zeros((7, 2), DType::F32, &Device::Cpu)?;
        let act = Tensor::zeros((7, 1), DType::F32, &Device::Cpu)?;
        assert_eq!(q.forward(&obs, &act)?.dims(), [7]);
        Ok(())
    }

    #[test]
    fn test_config_yaml() -> Result<()> {
        let dir = tempdir::TempDir::new("critic_config")?;
        let path = dir.path().join("critic.yaml");
        let config = config().opt_config(OptimizerConfig::Adam { lr: 3e-4 });
        config.save(&path)?;
        assert_eq!(CriticConfig::<MlpConfig>::load(&path)?, config);
        Ok(())
    }
}
