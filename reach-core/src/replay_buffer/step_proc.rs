//! Conversion of environment steps into [`Transition`]s.
use super::Transition;
use crate::{Act, Env, Obs, Step, StepProcessor};
use anyhow::{anyhow, Result};
use std::{default::Default, marker::PhantomData};

/// Configuration of [`SimpleStepProcessor`].
#[derive(Clone, Debug, Default)]
pub struct SimpleStepProcessorConfig {}

/// Builds 1-step transitions `(s_t, a_t, r_t, s_t+1)`.
///
/// The processor keeps `s_t` between calls of [`StepProcessor::process`];
/// [`StepProcessor::reset`] must be called with the initial observation of
/// every episode.
pub struct SimpleStepProcessor<E> {
    prev_obs: Option<Vec<f32>>,
    phantom: PhantomData<E>,
}

impl<E: Env> StepProcessor<E> for SimpleStepProcessor<E> {
    type Config = SimpleStepProcessorConfig;
    type Output = Transition;

    fn build(_config: &Self::Config) -> Self {
        Self {
            prev_obs: None,
            phantom: PhantomData,
        }
    }

    fn reset(&mut self, init_obs: E::Obs) {
        self.prev_obs = Some(init_obs.as_slice().to_vec());
    }

    fn process(&mut self, step: Step<E>) -> Result<Self::Output> {
        let next_state = step.obs.as_slice().to_vec();
        let state = self
            .prev_obs
            .take()
            .ok_or_else(|| anyhow!("previous observation is not set, reset() was not called"))?;
        self.prev_obs = Some(next_state.clone());

        Ok(Transition {
            state,
            action: step.act.as_slice().to_vec(),
            reward: step.reward,
            next_state,
            is_terminated: step.is_terminated,
            is_truncated: step.is_truncated,
        })
    }
}
