//! Average return over a fixed number of episodes.
use super::Evaluator;
use crate::{record::Record, Env, Policy};
use anyhow::Result;

/// Runs `n_episodes` episodes and reports the average return as `"eval_return"`.
///
/// Episode `i` starts from [`Env::reset_with_index`]`(i)`, so that successive
/// evaluations are comparable. Episodes are cut after `max_steps` steps.
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    max_steps: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<P>(&mut self, policy: &mut P) -> Result<Record>
    where
        P: Policy<E>,
    {
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;
            policy.reset();

            for _ in 0..self.max_steps {
                let act = policy.sample(&prev_obs)?;
                let (step, _) = self.env.step(&act)?;
                r_total += step.reward;
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }
        }

        Ok(Record::from_scalar(
            "eval_return",
            r_total / self.n_episodes as f32,
        ))
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize, max_steps: usize) -> Result<Self> {
        Ok(Self {
            n_episodes: n_episodes.max(1),
            max_steps,
            env: E::build(config, seed)?,
        })
    }
}
