//! Deterministic actor.
use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{track, OutDim},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use reach_core::{error::check_dim, BoxSpace};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Actor`].
pub struct ActorConfig<P: OutDim> {
    /// Configuration of the policy network.
    pub pi_config: Option<P>,

    /// Optimizer of the policy network.
    pub opt_config: OptimizerConfig,
}

impl<P: OutDim> Default for ActorConfig<P> {
    fn default() -> Self {
        Self {
            pi_config: None,
            opt_config: OptimizerConfig::Adam { lr: 1e-4 },
        }
    }
}

impl<P> ActorConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for action-value function.
    pub fn pi_config(mut self, v: P) -> Self {
        self.pi_config = Some(v);
        self
    }

    /// Sets output dimension of the model.
    pub fn out_dim(mut self, v: i64) -> Self {
        if let Some(pi_config) = &mut self.pi_config {
            pi_config.set_out_dim(v);
        }
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`ActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ActorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Deterministic actor `pi(s)`.
///
/// The output of the policy network is squashed with `tanh` and rescaled
/// affinely into the bounds of the action space, so actions of the actor are
/// always feasible.
pub struct Actor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the action vector.
    out_dim: i64,

    // Policy network
    pi_config: P::Config,
    pi: P,

    // Optimizer
    opt_config: OptimizerConfig,
    opt: Optimizer,

    // Bounds of the action space, used for rescaling
    action_space: BoxSpace,
    scale: Tensor,
    offset: Tensor,
}

impl<P> Actor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`Actor`].
    pub fn build(
        config: ActorConfig<P::Config>,
        action_space: BoxSpace,
        device: Device,
    ) -> Result<Actor<P>> {
        let pi_config = config.pi_config.context("pi_config is not set.")?;
        let out_dim = pi_config.get_out_dim();
        check_dim("actor output", action_space.dim(), out_dim as usize)?;
        let varmap = VarMap::new();
        let pi = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("actor");
            P::build(vb, pi_config.clone())?
        };
        let opt_config = config.opt_config;
        let opt = opt_config.build(varmap.all_vars())?;
        let (scale, offset) = Self::rescaling(&action_space, &device)?;

        Ok(Self {
            device,
            varmap,
            out_dim,
            pi_config,
            pi,
            opt_config,
            opt,
            action_space,
            scale,
            offset,
        })
    }

    // Coefficients mapping [-1, 1] onto [low, high], of shape (1, dim_act).
    fn rescaling(space: &BoxSpace, device: &Device) -> Result<(Tensor, Tensor)> {
        let dim = space.dim();
        let scale: Vec<f32> = space
            .low()
            .iter()
            .zip(space.high())
            .map(|(l, h)| 0.5 * (h - l))
            .collect();
        let offset: Vec<f32> = space
            .low()
            .iter()
            .zip(space.high())
            .map(|(l, h)| 0.5 * (h + l))
            .collect();
        Ok((
            Tensor::from_vec(scale, (1, dim), device)?,
            Tensor::from_vec(offset, (1, dim), device)?,
        ))
    }

    /// Returns actions of shape `(batch_size, dim_act)` within the action space.
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        let a = self.pi.forward(obs)?.tanh()?;
        debug_assert_eq!(a.dims()[1], self.out_dim as usize);
        Ok(a.broadcast_mul(&self.scale)?.broadcast_add(&self.offset)?)
    }

    /// Applies a gradient step on the loss.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// Soft update of the parameters towards those of `src`.
    pub fn track(&mut self, src: &Self, tau: f64) -> Result<()> {
        track(&self.varmap, &src.varmap, tau)
    }

    /// Variables of the policy network.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Bounds of the actions.
    pub fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    /// Save variables to prefix + ".safetensors".
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<PathBuf> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("safetensors");
        self.varmap.save(path.as_path())?;
        info!("Save actor parameters to {:?}", path);

        Ok(path)
    }

    /// Load variables from prefix + ".safetensors".
    pub fn load(&mut self, prefix: impl AsRef<Path>) -> Result<()> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("safetensors");
        self.varmap
            .load(path.as_path())
            .with_context(|| format!("Failed to load actor parameters from {:?}", path))?;
        info!("Load actor parameters from {:?}", path);

        Ok(())
    }

    /// Returns an actor with the same parameters and a fresh optimizer.
    ///
    /// Target actors are created with this method.
    pub fn try_clone(&self) -> Result<Self> {
        let config = ActorConfig {
            pi_config: Some(self.pi_config.clone()),
            opt_config: self.opt_config.clone(),
        };
        let actor = Self::build(config, self.action_space.clone(), self.device.clone())?;
        track(&actor.varmap, &self.varmap, 1.0)?;
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{Activation, Mlp, MlpConfig},
        util::param_distance,
    };

    fn build_actor() -> Result<Actor<Mlp>> {
        let config = ActorConfig::default()
            .pi_config(MlpConfig::new(3, vec![16], 2, Activation::None))
            .opt_config(OptimizerConfig::Adam { lr: 1e-2 });
        let space = BoxSpace::new(vec![-1.0, 0.0], vec![1.0, 4.0])?;
        Actor::build(config, space, Device::Cpu)
    }

    #[test]
    fn test_actions_within_bounds() -> Result<()> {
        let actor = build_actor()?;
        let obs = Tensor::randn(0f32, 10f32, (32, 3), &Device::Cpu)?;
        let act = actor.forward(&obs)?;
        assert_eq!(act.dims(), [32, 2]);
        for a in act.to_vec2::<f32>()? {
            assert!(actor.action_space().contains(&a));
        }
        Ok(())
    }

    #[test]
    fn test_output_dim_mismatch() -> Result<()> {
        let config =
            ActorConfig::default().pi_config(MlpConfig::new(3, vec![16], 2, Activation::None));
        let space = BoxSpace::uniform(3, -1.0, 1.0)?;
        assert!(Actor::<Mlp>::build(config, space, Device::Cpu).is_err());
        Ok(())
    }

    #[test]
    fn test_clone_and_save_load() -> Result<()> {
        let mut actor = build_actor()?;
        let target = actor.try_clone()?;
        assert_eq!(param_distance(actor.get_varmap(), target.get_varmap())?, 0.0);

        // Update of the actor does not propagate to the copy
        let obs = Tensor::randn(0f32, 1f32, (8, 3), &Device::Cpu)?;
        let loss = actor.forward(&obs)?.mean_all()?;
        actor.backward_step(&loss)?;
        assert!(param_distance(actor.get_varmap(), target.get_varmap())? > 0.0);

        let dir = tempdir::TempDir::new("actor")?;
        let path = actor.save(dir.path().join("pi"))?;
        assert!(path.exists());
        let mut loaded = build_actor()?;
        loaded.load(dir.path().join("pi"))?;
        assert_eq!(param_distance(actor.get_varmap(), loaded.get_varmap())?, 0.0);
        Ok(())
    }
}
