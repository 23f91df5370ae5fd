//! Train [`Agent`].
mod config;
mod sampler;
use crate::{
    record::{AggregateRecorder, Record, RecordValue},
    Agent, Env, Evaluator, ExperienceBufferBase, ReplayBufferBase, StepProcessor,
};
use anyhow::Result;
use chrono::Local;
pub use config::TrainerConfig;
use log::info;
pub use sampler::{EpisodeStats, Sampler};
use std::{collections::VecDeque, path::Path};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages training loop and related objects.
///
/// # Training loop
///
/// 0. Given an agent implementing [`Agent`], an [`AggregateRecorder`] and an
///    [`Evaluator`].
/// 1. Build [`Env`], [`StepProcessor`], the replay buffer and [`Sampler`].
///    `env_steps = 0`, `episodes = 0`.
/// 2. If `env_steps == max_env_steps` or `episodes == max_episodes`, finish training.
/// 3. Do an environment step and push a transition to the replay buffer.
///    At the start of an episode, [`Sampler`] resets the environment and the
///    exploration noise of the agent with [`Policy::reset`].
/// 4. `env_steps += 1`
/// 5. If `env_steps > warmup_period` and `env_steps % opt_interval == 0`,
///    do an optimization step with [`Agent::opt`]. The agent skips it while
///    the replay buffer holds fewer transitions than a batch.
/// 6. If the episode ended:
///     1. `episodes += 1`; store a record with `"episode"`, `"episode_return"`,
///        `"episode_return_avg"` (moving average over `moving_average_window`
///        episodes), `"episode_steps"`, `"env_steps"`, `"opt_steps"` and the last
///        record of the agent.
///     2. If `episodes % eval_interval == 0`, evaluate the agent in evaluation mode
///        and add `"eval_return"`. If it is the best so far, the parameters are
///        saved in `(model_dir)/best`.
///     3. If `episodes % save_interval == 0`, the parameters are saved in
///        `(model_dir)/(episodes)`.
///     4. If `episodes % flush_record_interval == 0`, flush the recorder.
/// 7. Back to step 2.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|Env::Act|B[Env]
///     B -->|Env::Obs|A
///     B -->|"Step&lt;E: Env&gt;"|C[StepProcessor]
///     C -->|Transition|D[ReplayBuffer]
///     D -->|TransitionBatch|A
/// ```
///
/// [`Policy::reset`]: crate::Policy::reset
pub struct Trainer<E, P, R>
where
    E: Env,
    P: StepProcessor<E>,
    R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
{
    config: TrainerConfig,

    /// Configuration of the environment for training.
    env_config_train: E::Config,

    /// Configuration of the transition producer.
    step_proc_config: P::Config,

    /// Configuration of the replay buffer.
    replay_buffer_config: R::Config,
}

/// Moving average over the last `window` values.
struct MovingAverage {
    window: usize,
    values: VecDeque<f32>,
}

impl MovingAverage {
    fn new(window: usize) -> Self {
        Self {
            window,
            values: VecDeque::with_capacity(window),
        }
    }

    fn push(&mut self, v: f32) -> f32 {
        if self.values.len() == self.window {
            self.values.pop_front();
        }
        self.values.push_back(v);
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }
}

impl<E, P, R> Trainer<E, P, R>
where
    E: Env,
    P: StepProcessor<E>,
    R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
{
    /// Constructs a trainer.
    ///
    /// Fails with [`ReachError::InvalidConfiguration`] for out-of-range values.
    ///
    /// [`ReachError::InvalidConfiguration`]: crate::error::ReachError::InvalidConfiguration
    pub fn build(
        config: TrainerConfig,
        env_config_train: E::Config,
        step_proc_config: P::Config,
        replay_buffer_config: R::Config,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            env_config_train,
            step_proc_config,
            replay_buffer_config,
        })
    }

    fn save_model<A: Agent<E, R>>(agent: &A, model_dir: &Path) {
        match agent.save_params(model_dir) {
            Ok(_) => info!("Saved the model in {:?}.", model_dir),
            Err(e) => info!("Failed to save model in {:?}: {}", model_dir, e),
        }
    }

    fn is_due(count: usize, interval: usize) -> bool {
        interval > 0 && count % interval == 0
    }

    /// Performs a training step.
    ///
    /// First, it performes an environment step once and pushes a transition
    /// into the given buffer with [`Sampler`]. Then, if the number of environment steps
    /// reaches the optimization interval `opt_interval`, performes an optimization
    /// step.
    ///
    /// Returns the record of the agent if an optimization step was done and
    /// the summary of the episode if it ended.
    pub fn train_step<A: Agent<E, R>>(
        &self,
        agent: &mut A,
        buffer: &mut R,
        sampler: &mut Sampler<E, P>,
        env_steps: &mut usize,
    ) -> Result<(Option<Record>, Option<EpisodeStats>)> {
        let (_, stats) = sampler.sample_and_push(agent, buffer)?;
        *env_steps += 1;

        let record = if *env_steps <= self.config.warmup_period
            || *env_steps % self.config.opt_interval != 0
        {
            None
        } else {
            agent.opt(buffer)?
        };

        Ok((record, stats))
    }

    /// Train the agent.
    pub fn train<A, D>(
        &mut self,
        agent: &mut A,
        recorder: &mut dyn AggregateRecorder,
        evaluator: &mut D,
    ) -> Result<()>
    where
        A: Agent<E, R>,
        D: Evaluator<E>,
    {
        let env = E::build(&self.env_config_train, self.config.seed)?;
        let producer = P::build(&self.step_proc_config);
        let mut buffer = R::build(&self.replay_buffer_config)?;
        let mut sampler = Sampler::new(env, producer, self.config.max_steps_per_episode);
        let mut returns = MovingAverage::new(self.config.moving_average_window);
        let mut max_eval_return = f32::MIN;
        let mut env_steps: usize = 0;
        let mut opt_steps: usize = 0;
        let mut episodes: usize = 0;
        let mut last_agent_record: Option<Record> = None;
        let model_dir = self.config.model_dir.clone();
        agent.train();

        info!(
            "Start training: max_env_steps = {}, max_episodes = {}",
            self.config.max_env_steps, self.config.max_episodes
        );

        while env_steps < self.config.max_env_steps && episodes < self.config.max_episodes {
            let (agent_record, stats) =
                self.train_step(agent, &mut buffer, &mut sampler, &mut env_steps)?;
            if let Some(r) = agent_record {
                opt_steps += 1;
                last_agent_record = Some(r);
            }

            let Some(stats) = stats else {
                continue;
            };
            episodes += 1;
            let avg = returns.push(stats.episode_return);
            info!(
                "Episode {}: return {:.3}, average {:.3}, steps {}",
                episodes, stats.episode_return, avg, stats.episode_steps
            );

            let mut record = last_agent_record.take().unwrap_or_else(Record::empty);
            record.insert("episode", RecordValue::Scalar(episodes as f32));
            record.insert("episode_return", RecordValue::Scalar(stats.episode_return));
            record.insert("episode_return_avg", RecordValue::Scalar(avg));
            record.insert("episode_steps", RecordValue::Scalar(stats.episode_steps as f32));
            record.insert("env_steps", RecordValue::Scalar(env_steps as f32));
            record.insert("opt_steps", RecordValue::Scalar(opt_steps as f32));
            record.insert("datetime", RecordValue::DateTime(Local::now()));

            // Evaluation
            if Self::is_due(episodes, self.config.eval_interval) {
                info!("Starts evaluation of the trained model");
                agent.eval();
                let eval_record = evaluator.evaluate(agent)?;
                agent.train();
                let eval_return = eval_record.get_scalar("eval_return")?;
                record.merge_inplace(eval_record);

                // Save the best model up to the current iteration
                if eval_return > max_eval_return {
                    max_eval_return = eval_return;
                    if let Some(model_dir) = &model_dir {
                        Self::save_model(agent, &Path::new(model_dir).join("best"));
                    }
                }
            }

            // Save the current model
            if Self::is_due(episodes, self.config.save_interval) {
                if let Some(model_dir) = &model_dir {
                    let path = Path::new(model_dir).join(episodes.to_string());
                    Self::save_model(agent, &path);
                }
            }

            recorder.store(record);
            if Self::is_due(episodes, self.config.flush_record_interval) {
                recorder.flush(env_steps as _);
            }
        }

        recorder.flush(env_steps as _);
        info!(
            "Finished training: {} episodes, {} environment steps, {} optimization steps",
            episodes, env_steps, opt_steps
        );

        Ok(())
    }
}
