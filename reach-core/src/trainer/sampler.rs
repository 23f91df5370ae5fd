//! Episode-aware sampling of transitions into a replay buffer.
use crate::{record::Record, Env, ExperienceBufferBase, Policy, StepProcessor};
use anyhow::Result;
use log::trace;

/// Summary of a finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStats {
    /// Sum of rewards.
    pub episode_return: f32,

    /// Number of environment steps.
    pub episode_steps: usize,

    /// The episode ended by termination, not by truncation.
    pub is_terminated: bool,
}

/// Manages the interaction of a policy with the environment.
///
/// At the start of each episode the sampler resets the environment, the
/// policy (restoring its exploration noise) and the step processor. Episodes
/// end on termination, on truncation reported by the environment, or after
/// `max_steps_per_episode` steps, in which case the last transition is
/// marked as truncated.
pub struct Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    env: E,
    prev_obs: Option<E::Obs>,
    step_processor: P,
    max_steps_per_episode: usize,
    episode_return: f32,
    episode_steps: usize,
}

impl<E, P> Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    /// Creates a new sampler with the given environment and step processor.
    pub fn new(env: E, step_processor: P, max_steps_per_episode: usize) -> Self {
        Self {
            env,
            prev_obs: None,
            step_processor,
            max_steps_per_episode,
            episode_return: 0.0,
            episode_steps: 0,
        }
    }

    /// Samples an experience and pushes it to the replay buffer.
    ///
    /// Returns the record emitted by the environment and, if the step ended
    /// an episode, its summary. Errors of the environment are propagated;
    /// transitions pushed before the error stay in the buffer.
    pub fn sample_and_push<A, R>(
        &mut self,
        policy: &mut A,
        buffer: &mut R,
    ) -> Result<(Record, Option<EpisodeStats>)>
    where
        A: Policy<E>,
        R: ExperienceBufferBase<Item = P::Output>,
    {
        // Start of an episode
        let obs = match self.prev_obs.take() {
            Some(obs) => obs,
            None => {
                let obs = self.env.reset()?;
                policy.reset();
                self.step_processor.reset(obs.clone());
                self.episode_return = 0.0;
                self.episode_steps = 0;
                obs
            }
        };

        let act = policy.sample(&obs)?;
        let (mut step, record) = self.env.step(&act)?;
        self.episode_steps += 1;
        self.episode_return += step.reward;

        if self.episode_steps >= self.max_steps_per_episode && !step.is_done() {
            step.is_truncated = true;
        }
        let is_done = step.is_done();
        let is_terminated = step.is_terminated;
        if !is_done {
            self.prev_obs = Some(step.obs.clone());
        }

        let transition = self.step_processor.process(step)?;
        buffer.push(transition)?;

        let stats = if is_done {
            trace!(
                "Episode ended after {} steps, return {}",
                self.episode_steps,
                self.episode_return
            );
            Some(EpisodeStats {
                episode_return: self.episode_return,
                episode_steps: self.episode_steps,
                is_terminated,
            })
        } else {
            None
        };

        Ok((record, stats))
    }
}
