//! A batch of transitions sampled from [`ReplayBuffer`](super::ReplayBuffer).
use super::Transition;

/// A batch of transitions in row-major flat vectors.
///
/// `obs` and `next_obs` have `len() * dim_obs` elements, `act` has
/// `len() * dim_act` elements. Backends reshape them into matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    /// Dimension of states.
    pub dim_obs: usize,

    /// Dimension of actions.
    pub dim_act: usize,

    /// States `s_t`.
    pub obs: Vec<f32>,

    /// Actions `a_t`.
    pub act: Vec<f32>,

    /// States `s_t+1`.
    pub next_obs: Vec<f32>,

    /// Rewards `r_t`.
    pub reward: Vec<f32>,

    /// Termination flags.
    pub is_terminated: Vec<i8>,

    /// Truncation flags.
    pub is_truncated: Vec<i8>,

    /// Slots of the sampled transitions in the buffer, used to update priorities.
    pub ix_sample: Option<Vec<usize>>,

    /// Importance weights, given when sampled with priorities.
    pub weight: Option<Vec<f32>>,
}

impl TransitionBatch {
    /// Creates an empty batch with room for `capacity` transitions.
    pub fn with_capacity(capacity: usize, dim_obs: usize, dim_act: usize) -> Self {
        Self {
            dim_obs,
            dim_act,
            obs: Vec::with_capacity(capacity * dim_obs),
            act: Vec::with_capacity(capacity * dim_act),
            next_obs: Vec::with_capacity(capacity * dim_obs),
            reward: Vec::with_capacity(capacity),
            is_terminated: Vec::with_capacity(capacity),
            is_truncated: Vec::with_capacity(capacity),
            ix_sample: None,
            weight: None,
        }
    }

    /// Appends a transition, whose dimensions are assumed to be checked.
    pub(crate) fn push(&mut self, tr: &Transition) {
        self.obs.extend_from_slice(&tr.state);
        self.act.extend_from_slice(&tr.action);
        self.next_obs.extend_from_slice(&tr.next_state);
        self.reward.push(tr.reward);
        self.is_terminated.push(tr.is_terminated as i8);
        self.is_truncated.push(tr.is_truncated as i8);
    }

    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the batch has no transition.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// `1 - is_terminated` as floats, the bootstrap mask of value targets.
    pub fn not_terminated(&self) -> Vec<f32> {
        self.is_terminated
            .iter()
            .map(|&t| 1f32 - t as f32)
            .collect()
    }
}
