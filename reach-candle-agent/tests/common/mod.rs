#![allow(dead_code)]
use anyhow::Result;
use reach_candle_agent::{
    actor::ActorConfig,
    critic::CriticConfig,
    ddpg::{Ddpg, DdpgConfig},
    explorer::ExplorerConfig,
    mlp::{Activation, Mlp, MlpConfig},
    opt::OptimizerConfig,
};
use reach_core::{record::Record, replay_buffer::ReplayBuffer, BoxSpace, Env, Step};

pub const DIM_OBS: usize = 2;
pub const DIM_ACT: usize = 1;

/// A point on a line moved by the action, with a second coordinate decaying by itself.
///
/// `x' = clip(x + 0.25 a, -2, 2)`, `y' = 0.5 y`, reward `-|x'| - |y'|`.
/// Episodes start alternately from `x = 1` and `x = -1`.
pub struct ToyEnv {
    x: f32,
    y: f32,
    n_episodes: usize,
    space: BoxSpace,
}

impl ToyEnv {
    fn init(&mut self, ix: usize) -> Vec<f32> {
        self.x = if ix % 2 == 0 { 1.0 } else { -1.0 };
        self.y = 0.5;
        vec![self.x, self.y]
    }
}

impl Env for ToyEnv {
    type Config = ();
    type Obs = Vec<f32>;
    type Act = Vec<f32>;
    type Info = ();

    fn build(_config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            x: 0.0,
            y: 0.0,
            n_episodes: 0,
            space: BoxSpace::uniform(DIM_ACT, -1.0, 1.0)?,
        })
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        self.x = (self.x + 0.25 * a[0]).clamp(-2.0, 2.0);
        self.y *= 0.5;
        let reward = -self.x.abs() - self.y.abs();
        let step = Step::new(vec![self.x, self.y], a.clone(), reward, false, false, ());
        Ok((step, Record::empty()))
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.n_episodes += 1;
        Ok(self.init(self.n_episodes))
    }

    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        Ok(self.init(ix))
    }

    fn dim_obs(&self) -> usize {
        DIM_OBS
    }

    fn action_space(&self) -> &BoxSpace {
        &self.space
    }
}

pub type ToyAgent = Ddpg<ToyEnv, Mlp, Mlp, ReplayBuffer>;

pub fn agent_config(batch_size: usize) -> Result<DdpgConfig<MlpConfig, MlpConfig>> {
    let in_dim = DIM_OBS as i64;
    let out_dim = DIM_ACT as i64;
    let actor_config = ActorConfig::default()
        .pi_config(MlpConfig::new(in_dim, vec![32, 32], out_dim, Activation::None).init_out(3e-3))
        .opt_config(OptimizerConfig::Adam { lr: 1e-3 });
    let critic_config = CriticConfig::default()
        .q_config(
            MlpConfig::new(in_dim + out_dim, vec![32, 32], 1, Activation::None).init_out(3e-3),
        )
        .opt_config(OptimizerConfig::Adam { lr: 1e-2 });

    Ok(DdpgConfig::default()
        .actor_config(actor_config)
        .critic_config(critic_config)
        .gamma(0.99)
        .tau(0.005)
        .batch_size(batch_size)
        .explorer_config(ExplorerConfig::Gaussian {
            initial_ratio: 0.5,
            min_ratio: 0.1,
            decay_steps: 500,
            max_exploration_steps: 0,
        })
        .action_space(BoxSpace::uniform(DIM_ACT, -1.0, 1.0)?)
        .dim_obs(DIM_OBS)
        .train(true))
}
