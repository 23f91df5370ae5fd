//! A single experience `(s, a, r, s', terminated, truncated)`.

/// One interaction step of the agent with the environment.
///
/// A transition is created by a [`StepProcessor`](crate::StepProcessor) and
/// owned by the [`ReplayBuffer`](super::ReplayBuffer) after insertion; it is
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State `s_t`.
    pub state: Vec<f32>,

    /// Action `a_t`.
    pub action: Vec<f32>,

    /// Reward `r_t`.
    pub reward: f32,

    /// State `s_t+1`.
    pub next_state: Vec<f32>,

    /// `s_t+1` is terminal; the value target does not bootstrap from it.
    pub is_terminated: bool,

    /// The episode was cut at `s_t+1`, e.g., by a step limit.
    pub is_truncated: bool,
}

impl Transition {
    /// Constructs a transition.
    pub fn new(
        state: Vec<f32>,
        action: Vec<f32>,
        reward: f32,
        next_state: Vec<f32>,
        is_terminated: bool,
        is_truncated: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            is_terminated,
            is_truncated,
        }
    }

    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
