use anyhow::Result;
use clap::Parser;
use reach_candle_agent::{
    actor::ActorConfig,
    critic::CriticConfig,
    ddpg::{Ddpg, DdpgConfig, Td3Config},
    explorer::ExplorerConfig,
    mlp::{Activation, Mlp, MlpConfig},
    opt::OptimizerConfig,
};
use reach_core::{
    record::LogRecorder,
    replay_buffer::{
        PerConfig, ReplayBuffer, ReplayBufferConfig, SimpleStepProcessor,
        SimpleStepProcessorConfig,
    },
    Agent, Configurable, DefaultEvaluator, Trainer, TrainerConfig,
};
use serde::Serialize;
use std::path::Path;

const DIM_OBS: usize = 10;
const DIM_ACT: usize = 2;
const LR_ACTOR: f64 = 1e-4;
const LR_CRITIC: f64 = 1e-3;
const BATCH_SIZE: usize = 128;
const GAMMA: f64 = 0.99;
const TAU: f64 = 1e-3;
const REPLAY_BUFFER_CAPACITY: usize = 100_000;
const MAX_STEPS_PER_EPISODE: usize = 300;
const WARMUP_PERIOD: usize = 1_000;
const EVAL_INTERVAL: usize = 20;
const SAVE_INTERVAL: usize = 100;
const MODEL_DIR_BASE: &str = "./reach-candle-agent/examples/model";

mod env {
    use anyhow::Result;
    use reach_core::{record::Record, BoxSpace, Env, Step};
    use std::f32::consts::PI;

    const LINK_LENGTH: f32 = 1.0;
    const DT: f32 = 0.05;
    const DAMPING: f32 = 1.0;
    const TORQUE_GAIN: f32 = 5.0;
    const GOAL_RADIUS: f32 = 0.1;

    /// Planar arm with two revolute joints, reaching a target.
    ///
    /// The observation is `(cos q1, sin q1, cos q2, sin q2, dq1, dq2, goal_x,
    /// goal_y, tip_x - goal_x, tip_y - goal_y)`, and actions are the torques of
    /// the joints in `[-1, 1]`. The reward is the negative distance between the
    /// tip and the goal, with a bonus while the tip is inside the goal.
    pub struct Reacher {
        q: [f32; 2],
        dq: [f32; 2],
        goal: [f32; 2],
        rng: fastrand::Rng,
        space: BoxSpace,
    }

    impl Reacher {
        fn tip(&self) -> [f32; 2] {
            let (q1, q2) = (self.q[0], self.q[0] + self.q[1]);
            [
                LINK_LENGTH * (q1.cos() + q2.cos()),
                LINK_LENGTH * (q1.sin() + q2.sin()),
            ]
        }

        fn obs(&self) -> Vec<f32> {
            let tip = self.tip();
            vec![
                self.q[0].cos(),
                self.q[0].sin(),
                self.q[1].cos(),
                self.q[1].sin(),
                self.dq[0],
                self.dq[1],
                self.goal[0],
                self.goal[1],
                tip[0] - self.goal[0],
                tip[1] - self.goal[1],
            ]
        }

        // Joint angles and goal from four uniform samples in [0, 1)
        fn init(&mut self, u: [f32; 4]) -> Vec<f32> {
            self.q = [(u[0] * 2.0 - 1.0) * PI, (u[1] * 2.0 - 1.0) * PI];
            self.dq = [0.0, 0.0];
            let r = (0.3 + 1.6 * u[2]) * LINK_LENGTH;
            let th = (u[3] * 2.0 - 1.0) * PI;
            self.goal = [r * th.cos(), r * th.sin()];
            self.obs()
        }
    }

    impl Env for Reacher {
        type Config = ();
        type Obs = Vec<f32>;
        type Act = Vec<f32>;
        type Info = ();

        fn build(_config: &Self::Config, seed: i64) -> Result<Self> {
            Ok(Self {
                q: [0.0; 2],
                dq: [0.0; 2],
                goal: [0.0; 2],
                rng: fastrand::Rng::with_seed(seed as u64),
                space: BoxSpace::uniform(2, -1.0, 1.0)?,
            })
        }

        fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
            let a = self.space.clip(a)?;
            for i in 0..2 {
                self.dq[i] += DT * (TORQUE_GAIN * a[i] - DAMPING * self.dq[i]);
                self.q[i] += DT * self.dq[i];
            }
            let tip = self.tip();
            let dist = ((tip[0] - self.goal[0]).powi(2) + (tip[1] - self.goal[1]).powi(2)).sqrt();
            let bonus = if dist < GOAL_RADIUS { 0.1 } else { 0.0 };
            let reward = bonus - 0.1 * dist;
            let step = Step::new(self.obs(), a, reward, false, false, ());
            Ok((step, Record::from_scalar("distance", dist)))
        }

        fn reset(&mut self) -> Result<Self::Obs> {
            let u = [self.rng.f32(), self.rng.f32(), self.rng.f32(), self.rng.f32()];
            Ok(self.init(u))
        }

        fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
            let mut rng = fastrand::Rng::with_seed(ix as u64);
            let u = [rng.f32(), rng.f32(), rng.f32(), rng.f32()];
            Ok(self.init(u))
        }

        fn dim_obs(&self) -> usize {
            super::DIM_OBS
        }

        fn action_space(&self) -> &BoxSpace {
            &self.space
        }
    }
}

use env::Reacher;
type StepProc = SimpleStepProcessor<Reacher>;
type ReacherAgent = Ddpg<Reacher, Mlp, Mlp, ReplayBuffer>;

/// Train DDPG or TD3 agent on a planar reaching task
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Use TD3 instead of DDPG
    #[arg(long, default_value_t = false)]
    td3: bool,

    /// Use prioritized experience replay
    #[arg(long, default_value_t = false)]
    per: bool,

    /// Use Gaussian noise instead of Ornstein-Uhlenbeck process
    #[arg(long, default_value_t = false)]
    gaussian: bool,

    /// Number of environment steps
    #[arg(long, default_value_t = 200_000)]
    max_env_steps: usize,

    /// Number of episodes
    #[arg(long, default_value_t = 1000)]
    max_episodes: usize,

    /// Show config
    #[arg(long, default_value_t = false)]
    show_config: bool,

    /// Save config files into the model directory
    #[arg(long, default_value_t = false)]
    create_config: bool,

    /// Evaluate the saved best model instead of training
    #[arg(long, default_value_t = false)]
    eval: bool,
}

#[derive(Serialize)]
struct ReacherConfig {
    trainer: TrainerConfig,
    replay_buffer: ReplayBufferConfig,
    agent: DdpgConfig<MlpConfig, MlpConfig>,
}

fn model_dir(args: &Args) -> String {
    let algo = if args.td3 { "td3" } else { "ddpg" };
    format!("{}/{}_reacher", MODEL_DIR_BASE, algo)
}

fn create_config(args: &Args) -> Result<ReacherConfig> {
    let dim_obs = DIM_OBS as i64;
    let dim_act = DIM_ACT as i64;
    let trainer = TrainerConfig::default()
        .max_env_steps(args.max_env_steps)
        .max_episodes(args.max_episodes)
        .max_steps_per_episode(MAX_STEPS_PER_EPISODE)
        .warmup_period(WARMUP_PERIOD)
        .eval_interval(EVAL_INTERVAL)
        .save_interval(SAVE_INTERVAL)
        .flush_record_interval(1)
        .model_dir(model_dir(args));
    let per_config = match args.per {
        true => Some(PerConfig::default().n_opts_final(args.max_env_steps)),
        false => None,
    };
    let replay_buffer = ReplayBufferConfig::default()
        .capacity(REPLAY_BUFFER_CAPACITY)
        .dim_obs(DIM_OBS)
        .dim_act(DIM_ACT)
        .per_config(per_config);
    let actor_config = ActorConfig::default()
        .pi_config(
            MlpConfig::new(dim_obs, vec![400, 300], dim_act, Activation::None).init_out(3e-3),
        )
        .opt_config(OptimizerConfig::Adam { lr: LR_ACTOR });
    let critic_config = CriticConfig::default()
        .q_config(
            MlpConfig::new(dim_obs + dim_act, vec![400, 300], 1, Activation::None).init_out(3e-3),
        )
        .opt_config(OptimizerConfig::Adam { lr: LR_CRITIC });
    let explorer_config = match args.gaussian {
        true => ExplorerConfig::Gaussian {
            initial_ratio: 0.5,
            min_ratio: 0.1,
            decay_steps: args.max_env_steps / 2,
            max_exploration_steps: WARMUP_PERIOD,
        },
        false => ExplorerConfig::ou(),
    };
    let mut agent = DdpgConfig::default()
        .actor_config(actor_config)
        .critic_config(critic_config)
        .explorer_config(explorer_config)
        .gamma(GAMMA)
        .tau(TAU)
        .batch_size(BATCH_SIZE)
        .action_space(reach_core::BoxSpace::uniform(DIM_ACT, -1.0, 1.0)?)
        .dim_obs(DIM_OBS);
    if args.td3 {
        agent = agent.td3(Td3Config::default());
    }

    Ok(ReacherConfig {
        trainer,
        replay_buffer,
        agent,
    })
}

fn train(args: &Args, config: ReacherConfig) -> Result<()> {
    let mut trainer = Trainer::<Reacher, StepProc, ReplayBuffer>::build(
        config.trainer,
        (),
        SimpleStepProcessorConfig::default(),
        config.replay_buffer,
    )?;
    let mut agent = ReacherAgent::build(config.agent)?;
    let mut recorder = LogRecorder::new();
    let mut evaluator = DefaultEvaluator::<Reacher>::new(&(), 0, 5, MAX_STEPS_PER_EPISODE)?;

    trainer.train(&mut agent, &mut recorder, &mut evaluator)?;
    agent.save_params(&Path::new(&model_dir(args)).join("last"))?;
    Ok(())
}

fn eval(args: &Args, config: ReacherConfig) -> Result<()> {
    use reach_core::Evaluator;

    let mut agent = ReacherAgent::build(config.agent)?;
    agent.load_params(&Path::new(&model_dir(args)).join("best"))?;
    agent.eval();
    let mut evaluator = DefaultEvaluator::<Reacher>::new(&(), 0, 10, MAX_STEPS_PER_EPISODE)?;
    let record = evaluator.evaluate(&mut agent)?;
    println!("eval_return: {}", record.get_scalar("eval_return")?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = create_config(&args)?;

    if args.show_config {
        println!("{}", serde_yaml::to_string(&config)?);
    } else if args.create_config {
        let dir = model_dir(&args);
        std::fs::create_dir_all(&dir)?;
        config.trainer.save(Path::new(&dir).join("trainer.yaml"))?;
        config.replay_buffer.save(Path::new(&dir).join("replay_buffer.yaml"))?;
        config.agent.save(Path::new(&dir).join("agent.yaml"))?;
    } else if args.eval {
        eval(&args, config)?;
    } else {
        train(&args, config)?;
    }

    Ok(())
}
