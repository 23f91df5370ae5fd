use super::{td3::smooth_target_action, DdpgConfig, Td3Config};
use crate::{
    actor::Actor,
    critic::Critic,
    explorer::Explorer,
    model::{SubModel1, SubModel2},
    util::{td_target, CriticLoss, OutDim},
};
use anyhow::Result;
use candle_core::{Device, Tensor};
use log::trace;
use reach_core::{
    error::{check_dim, ReachError},
    record::{Record, RecordValue},
    replay_buffer::TransitionBatch,
    Agent, BoxSpace, Configurable, Env, Obs, Policy, ReplayBufferBase,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt::Debug,
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Deep deterministic policy gradient (DDPG) agent, optionally with the
/// refinements of TD3.
///
/// The agent owns a live actor and one (DDPG) or two (TD3) live critics,
/// together with a target network for each of them.
///
/// One learning update on a batch `(s, a, r, s', terminated)` proceeds as follows:
///
/// 1. The critics regress onto `y = r + gamma (1 - terminated) min_k Q_tgt_k(s', a')`,
///    where `a' = pi_tgt(s')`, with clipped noise added in TD3.
/// 2. The actor minimizes `-mean Q_1(s, pi(s))`.
/// 3. The targets are soft-updated with coefficient `tau`.
///
/// In TD3, the steps 2 and 3 are done once every `policy_delay` updates.
///
/// ```mermaid
/// flowchart LR
///   B[Batch] --> TA[pi_tgt]
///   TA --> TQ[Q_tgt_k]
///   TQ -->|min, y| C[Q_k]
///   B --> C
///   B --> A[pi]
///   A --> Q1[Q_1]
///   C -.->|tau| TQ
///   A -.->|tau| TA
/// ```
pub struct Ddpg<E, Q, P, R>
where
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
    P::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
{
    pub(super) qnets: Vec<Critic<Q>>,
    pub(super) qnets_tgt: Vec<Critic<Q>>,
    pub(super) actor: Actor<P>,
    pub(super) actor_tgt: Actor<P>,
    pub(super) explorer: Explorer,
    pub(super) action_space: BoxSpace,
    pub(super) low: Tensor,
    pub(super) high: Tensor,
    pub(super) dim_obs: usize,
    pub(super) gamma: f64,
    pub(super) tau: f64,
    pub(super) batch_size: usize,
    pub(super) n_updates_per_opt: usize,
    pub(super) critic_loss: CriticLoss,
    pub(super) td3: Option<Td3Config>,
    pub(super) train: bool,
    pub(super) n_opts: usize,
    pub(super) n_actor_updates: usize,
    pub(super) noise_ratio_sum: f32,
    pub(super) n_noisy_samples: usize,
    pub(super) device: Device,
    pub(super) phantom: PhantomData<(E, R)>,
}

impl<E, Q, P, R> Ddpg<E, Q, P, R>
where
    E: Env,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase<Batch = TransitionBatch>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
    P::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
{
    /// Number of learning updates so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Number of updates of the actor and target networks so far.
    pub fn n_actor_updates(&self) -> usize {
        self.n_actor_updates
    }

    /// The live actor.
    pub fn actor(&self) -> &Actor<P> {
        &self.actor
    }

    /// The live critics.
    pub fn critics(&self) -> &[Critic<Q>] {
        &self.qnets
    }

    /// The target critics.
    pub fn target_critics(&self) -> &[Critic<Q>] {
        &self.qnets_tgt
    }

    /// The target actor.
    pub fn target_actor(&self) -> &Actor<P> {
        &self.actor_tgt
    }

    fn to_tensors(&self, batch: &TransitionBatch) -> Result<BatchTensors> {
        check_dim("state", self.dim_obs, batch.dim_obs)?;
        check_dim("action", self.action_space.dim(), batch.dim_act)?;
        let n = batch.len();
        let device = &self.device;
        Ok(BatchTensors {
            obs: Tensor::from_slice(&batch.obs[..], (n, batch.dim_obs), device)?,
            act: Tensor::from_slice(&batch.act[..], (n, batch.dim_act), device)?,
            next_obs: Tensor::from_slice(&batch.next_obs[..], (n, batch.dim_obs), device)?,
            reward: Tensor::from_slice(&batch.reward[..], (n,), device)?,
            not_done: Tensor::from_vec(batch.not_terminated(), (n,), device)?,
            weight: match &batch.weight {
                Some(w) => Some(Tensor::from_slice(&w[..], (n,), device)?),
                None => None,
            },
        })
    }

    fn td_target(&self, t: &BatchTensors) -> Result<Tensor> {
        let next_act = self.actor_tgt.forward(&t.next_obs)?.detach();
        let next_act = match &self.td3 {
            Some(td3) => smooth_target_action(
                &next_act,
                td3,
                self.action_space.max_abs() as f64,
                &self.low,
                &self.high,
            )?,
            None => next_act,
        };
        let next_qs = self
            .qnets_tgt
            .iter()
            .map(|q| q.forward(&t.next_obs, &next_act))
            .collect::<Result<Vec<_>>>()?;
        td_target(&t.reward, &t.not_done, self.gamma, &next_qs)
    }

    /// Updates the critics and returns the mean loss and the absolute TD errors
    /// of the first critic.
    fn update_critic(&mut self, t: &BatchTensors) -> Result<(f32, Vec<f32>)> {
        let tgt = self.td_target(t)?;
        let mut loss_sum = 0f32;
        let mut td_errs = vec![];

        for (i, qnet) in self.qnets.iter_mut().enumerate() {
            let pred = qnet.forward(&t.obs, &t.act)?;
            if i == 0 {
                td_errs = (&pred - &tgt)?.abs()?.detach().to_vec1::<f32>()?;
            }
            let loss = self.critic_loss.loss(&pred, &tgt, t.weight.as_ref())?;
            qnet.backward_step(&loss)?;
            loss_sum += loss.to_scalar::<f32>()?;
        }

        Ok((loss_sum / self.qnets.len() as f32, td_errs))
    }

    fn update_actor(&mut self, t: &BatchTensors) -> Result<f32> {
        let act = self.actor.forward(&t.obs)?;
        let loss = self.qnets[0].forward(&t.obs, &act)?.mean_all()?.neg()?;
        self.actor.backward_step(&loss)?;
        Ok(loss.to_scalar::<f32>()?)
    }

    fn soft_update(&mut self) -> Result<()> {
        self.actor_tgt.track(&self.actor, self.tau)?;
        for (qnet_tgt, qnet) in self.qnets_tgt.iter_mut().zip(self.qnets.iter()) {
            qnet_tgt.track(qnet, self.tau)?;
        }
        Ok(())
    }

    /// Applies one learning update on a batch.
    ///
    /// Returns the critic loss and, if the actor was updated, the actor loss.
    fn update(&mut self, buffer: &mut R) -> Result<(f32, Option<f32>)> {
        trace!("batch()");
        let batch = buffer.batch(self.batch_size)?;
        let t = self.to_tensors(&batch)?;
        self.n_opts += 1;

        trace!("update_critic()");
        let (loss_critic, td_errs) = self.update_critic(&t)?;
        buffer.update_priority(&batch.ix_sample, &Some(td_errs));

        let is_policy_update = match &self.td3 {
            Some(td3) => td3.is_policy_update(self.n_opts),
            None => true,
        };
        let loss_actor = if is_policy_update {
            trace!("update_actor()");
            let loss_actor = self.update_actor(&t)?;

            trace!("soft_update()");
            self.soft_update()?;
            self.n_actor_updates += 1;
            Some(loss_actor)
        } else {
            None
        };

        Ok((loss_critic, loss_actor))
    }

    fn opt_(&mut self, buffer: &mut R) -> Result<Option<Record>> {
        if buffer.num_samples() < self.batch_size {
            trace!(
                "Skip optimization, {} samples < batch size {}",
                buffer.num_samples(),
                self.batch_size
            );
            return Ok(None);
        }

        let mut loss_critic = 0f32;
        let mut loss_actor = 0f32;
        let mut n_actor_losses = 0;

        for _ in 0..self.n_updates_per_opt {
            match self.update(buffer) {
                Ok((l_critic, l_actor)) => {
                    loss_critic += l_critic;
                    if let Some(l) = l_actor {
                        loss_actor += l;
                        n_actor_losses += 1;
                    }
                }
                Err(e) => match e.downcast_ref::<ReachError>() {
                    Some(ReachError::InsufficientData { .. }) => return Ok(None),
                    _ => return Err(e),
                },
            }
        }

        let mut record = Record::from_slice(&[
            (
                "loss_critic",
                RecordValue::Scalar(loss_critic / self.n_updates_per_opt as f32),
            ),
            ("n_opts", RecordValue::Scalar(self.n_opts as f32)),
            (
                "n_actor_updates",
                RecordValue::Scalar(self.n_actor_updates as f32),
            ),
        ]);
        if n_actor_losses > 0 {
            record.insert(
                "loss_actor",
                RecordValue::Scalar(loss_actor / n_actor_losses as f32),
            );
        }
        if self.n_noisy_samples > 0 {
            record.insert(
                "noise_ratio",
                RecordValue::Scalar(self.noise_ratio_sum / self.n_noisy_samples as f32),
            );
            self.noise_ratio_sum = 0.0;
            self.n_noisy_samples = 0;
        }

        Ok(Some(record))
    }

    // Mean of |greedy - act| / (high - low) over dimensions with a nonempty range.
    fn noise_ratio(&self, greedy: &[f32], act: &[f32]) -> f32 {
        let space = &self.action_space;
        let (sum, n) = greedy
            .iter()
            .zip(act.iter())
            .zip(space.low().iter().zip(space.high().iter()))
            .filter(|(_, (l, h))| h > l)
            .fold((0f32, 0usize), |(sum, n), ((g, a), (l, h))| {
                (sum + (g - a).abs() / (h - l), n + 1)
            });
        if n == 0 {
            0.0
        } else {
            sum / n as f32
        }
    }
}

struct BatchTensors {
    obs: Tensor,
    act: Tensor,
    next_obs: Tensor,
    reward: Tensor,
    not_done: Tensor,
    weight: Option<Tensor>,
}

impl<E, Q, P, R> Policy<E> for Ddpg<E, Q, P, R>
where
    E: Env,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase<Batch = TransitionBatch>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
    P::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
{
    /// Returns the greedy action of the actor, perturbed by the exploration
    /// noise in training mode, clipped into the action space.
    fn sample(&mut self, obs: &E::Obs) -> Result<E::Act> {
        let obs = obs.as_slice();
        check_dim("state", self.dim_obs, obs.len())?;
        let obs = Tensor::from_slice(obs, (1, self.dim_obs), &self.device)?;
        let greedy = self.actor.forward(&obs)?.detach();

        if self.train {
            let noisy = self.explorer.apply(&greedy)?.flatten_all()?.to_vec1::<f32>()?;
            let act = self.action_space.clip(&noisy)?;
            let greedy = greedy.flatten_all()?.to_vec1::<f32>()?;
            self.noise_ratio_sum += self.noise_ratio(&greedy, &act);
            self.n_noisy_samples += 1;
            Ok(act.into())
        } else {
            let greedy = greedy.flatten_all()?.to_vec1::<f32>()?;
            Ok(self.action_space.clip(&greedy)?.into())
        }
    }

    fn reset(&mut self) {
        self.explorer.reset();
    }
}

impl<E, Q, P, R> Configurable for Ddpg<E, Q, P, R>
where
    E: Env,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase<Batch = TransitionBatch>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
    P::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
{
    type Config = DdpgConfig<Q::Config, P::Config>;

    /// Constructs [`Ddpg`] agent.
    ///
    /// Fails with [`ReachError::InvalidConfiguration`] if a parameter is out of range.
    fn build(config: Self::Config) -> Result<Self> {
        config.validate()?;
        let action_space = config
            .action_space
            .clone()
            .ok_or_else(|| ReachError::invalid_config("action_space is not set"))?;
        let dim_obs = config
            .dim_obs
            .ok_or_else(|| ReachError::invalid_config("dim_obs is not set"))?;
        let device: Device = config.device.try_into()?;
        let n_critics = if config.td3.is_some() { 2 } else { 1 };

        let actor = Actor::build(config.actor_config, action_space.clone(), device.clone())?;
        let actor_tgt = actor.try_clone()?;
        let mut qnets = vec![];
        let mut qnets_tgt = vec![];
        for _ in 0..n_critics {
            let qnet = Critic::build(config.critic_config.clone(), device.clone())?;
            qnets_tgt.push(qnet.try_clone()?);
            qnets.push(qnet);
        }
        let explorer = Explorer::build(&config.explorer_config, &action_space)?;
        let dim_act = action_space.dim();
        let low = Tensor::from_slice(action_space.low(), (1, dim_act), &device)?;
        let high = Tensor::from_slice(action_space.high(), (1, dim_act), &device)?;

        Ok(Ddpg {
            qnets,
            qnets_tgt,
            actor,
            actor_tgt,
            explorer,
            action_space,
            low,
            high,
            dim_obs,
            gamma: config.gamma,
            tau: config.tau,
            batch_size: config.batch_size,
            n_updates_per_opt: config.n_updates_per_opt,
            critic_loss: config.critic_loss,
            td3: config.td3,
            train: config.train,
            n_opts: 0,
            n_actor_updates: 0,
            noise_ratio_sum: 0.0,
            n_noisy_samples: 0,
            device,
            phantom: PhantomData,
        })
    }
}

impl<E, Q, P, R> Agent<E, R> for Ddpg<E, Q, P, R>
where
    E: Env,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase<Batch = TransitionBatch>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
    P::Config: DeserializeOwned + Serialize + OutDim + Debug + PartialEq + Clone,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn opt(&mut self, buffer: &mut R) -> Result<Option<Record>> {
        self.opt_(buffer)
    }

    fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(path)?;
        let mut files = vec![];
        for (i, (qnet, qnet_tgt)) in self.qnets.iter().zip(&self.qnets_tgt).enumerate() {
            files.push(qnet.save(path.join(format!("qnet_{}", i)))?);
            files.push(qnet_tgt.save(path.join(format!("qnet_tgt_{}", i)))?);
        }
        files.push(self.actor.save(path.join("pi"))?);
        files.push(self.actor_tgt.save(path.join("pi_tgt"))?);
        Ok(files)
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        for (i, (qnet, qnet_tgt)) in self.qnets.iter_mut().zip(&mut self.qnets_tgt).enumerate() {
            qnet.load(path.join(format!("qnet_{}", i)))?;
            qnet_tgt.load(path.join(format!("qnet_tgt_{}", i)))?;
        }
        self.actor.load(path.join("pi"))?;
        self.actor_tgt.load(path.join("pi_tgt"))?;
        Ok(())
    }
}
