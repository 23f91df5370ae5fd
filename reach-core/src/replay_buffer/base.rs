//! Ring buffer of transitions with uniform or prioritized sampling.
mod iw_scheduler;
mod sum_tree;
use super::{config::PerConfig, ReplayBufferConfig, Transition, TransitionBatch};
use crate::{
    error::{check_dim, ReachError},
    ExperienceBufferBase, ReplayBufferBase,
};
use anyhow::Result;
pub use iw_scheduler::IwScheduler;
use log::trace;
use rand::{rngs::StdRng, seq::index, SeedableRng};
use sum_tree::SumTree;

/// State of prioritized experience replay.
struct PerState {
    sum_tree: SumTree,
    iw_scheduler: IwScheduler,
}

impl PerState {
    fn new(capacity: usize, per_config: &PerConfig) -> Self {
        Self {
            sum_tree: SumTree::new(capacity, per_config.alpha),
            iw_scheduler: IwScheduler::new(
                per_config.beta_0,
                per_config.beta_final,
                per_config.n_opts_final,
            ),
        }
    }
}

/// A capacity-bounded ring buffer of [`Transition`]s.
///
/// * `push` is O(1) and evicts the oldest transition when the buffer is full.
/// * `batch` draws distinct transitions uniformly at random with the buffer's
///   own seeded RNG; every call is an independent draw.
/// * With [`PerConfig`], new transitions get the largest priority seen so far
///   and batches are drawn proportionally to `priority^alpha`, with replacement.
///
/// ```rust
/// use reach_core::{
///     replay_buffer::{ReplayBuffer, ReplayBufferConfig, Transition},
///     ExperienceBufferBase, ReplayBufferBase,
/// };
///
/// let config = ReplayBufferConfig::default().capacity(2).dim_obs(1).dim_act(1);
/// let mut buffer = ReplayBuffer::build(&config).unwrap();
/// for i in 0..3 {
///     let s = i as f32;
///     buffer.push(Transition::new(vec![s], vec![0.0], 0.0, vec![s + 1.0], false, false)).unwrap();
/// }
/// assert_eq!(buffer.len(), 2);
/// assert_eq!(buffer.get(0).unwrap().state, vec![1.0]);
/// ```
pub struct ReplayBuffer {
    capacity: usize,
    dim_obs: usize,
    dim_act: usize,

    /// Slot where the next transition is written.
    i: usize,

    data: Vec<Transition>,
    rng: StdRng,
    per_state: Option<PerState>,
}

impl ReplayBuffer {
    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Dimension of states.
    pub fn dim_obs(&self) -> usize {
        self.dim_obs
    }

    /// Dimension of actions.
    pub fn dim_act(&self) -> usize {
        self.dim_act
    }

    /// Returns the `ix`-th oldest transition.
    pub fn get(&self, ix: usize) -> Option<&Transition> {
        if ix >= self.data.len() {
            return None;
        }
        let slot = if self.data.len() < self.capacity {
            ix
        } else {
            (self.i + ix) % self.capacity
        };
        self.data.get(slot)
    }

    /// Iterates over the stored transitions from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> + '_ {
        (0..self.data.len()).filter_map(move |ix| self.get(ix))
    }

    /// Exponent of importance weights currently used, if priorities are enabled.
    pub fn beta(&self) -> Option<f32> {
        self.per_state.as_ref().map(|s| s.iw_scheduler.beta())
    }

    fn sample_indices(&mut self, size: usize) -> (Vec<usize>, Option<Vec<f32>>) {
        match &self.per_state {
            Some(per_state) => {
                let beta = per_state.iw_scheduler.beta();
                let (ixs, ws) = per_state.sum_tree.sample(size, beta, &mut self.rng);
                (ixs, Some(ws))
            }
            None => (index::sample(&mut self.rng, self.data.len(), size).into_vec(), None),
        }
    }
}

impl ExperienceBufferBase for ReplayBuffer {
    type Item = Transition;

    fn len(&self) -> usize {
        self.data.len()
    }

    /// Adds a transition, evicting the oldest one if the buffer is full.
    ///
    /// Fails with [`ReachError::DimensionMismatch`] if the state or action
    /// does not have the declared dimension; the buffer is left unchanged.
    fn push(&mut self, tr: Self::Item) -> Result<()> {
        check_dim("state", self.dim_obs, tr.state.len())?;
        check_dim("next_state", self.dim_obs, tr.next_state.len())?;
        check_dim("action", self.dim_act, tr.action.len())?;

        if let Some(per_state) = self.per_state.as_mut() {
            let max_p = per_state.sum_tree.max();
            per_state.sum_tree.add(self.i, max_p);
        }

        if self.data.len() < self.capacity {
            self.data.push(tr);
        } else {
            self.data[self.i] = tr;
        }
        self.i = (self.i + 1) % self.capacity;

        Ok(())
    }
}

impl ReplayBufferBase for ReplayBuffer {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let per_state = config
            .per_config
            .as_ref()
            .map(|per_config| PerState::new(capacity, per_config));

        Ok(Self {
            capacity,
            dim_obs: config.dim_obs,
            dim_act: config.dim_act,
            i: 0,
            data: Vec::with_capacity(capacity.min(1 << 16)),
            rng: StdRng::seed_from_u64(config.seed),
            per_state,
        })
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let len = self.data.len();
        if len < size || size == 0 {
            return Err(ReachError::InsufficientData {
                len,
                batch_size: size,
            }
            .into());
        }

        let (ixs, weight) = self.sample_indices(size);
        trace!("Sampled slots {:?}", ixs);

        let mut batch = TransitionBatch::with_capacity(size, self.dim_obs, self.dim_act);
        for &ix in ixs.iter() {
            batch.push(&self.data[ix]);
        }
        batch.ix_sample = Some(ixs);
        batch.weight = weight;
        Ok(batch)
    }

    fn num_samples(&self) -> usize {
        self.data.len()
    }

    fn update_priority(&mut self, ixs: &Option<Vec<usize>>, td_errs: &Option<Vec<f32>>) {
        if let Some(per_state) = &mut self.per_state {
            if let (Some(ixs), Some(td_errs)) = (ixs, td_errs) {
                for (&ix, &td_err) in ixs.iter().zip(td_errs.iter()) {
                    per_state.sum_tree.update(ix, td_err);
                }
            }
            per_state.iw_scheduler.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn transition(s: f32) -> Transition {
        Transition::new(vec![s, -s], vec![s], s, vec![s + 1.0, -s - 1.0], false, false)
    }

    fn buffer(capacity: usize, per_config: Option<PerConfig>) -> ReplayBuffer {
        let config = ReplayBufferConfig::default()
            .capacity(capacity)
            .dim_obs(2)
            .dim_act(1)
            .per_config(per_config);
        ReplayBuffer::build(&config).unwrap()
    }

    #[test]
    fn test_ring_eviction() {
        let mut buffer = buffer(5, None);
        for i in 0..12 {
            buffer.push(transition(i as f32)).unwrap();
            assert!(buffer.len() <= 5);
        }
        assert_eq!(buffer.len(), 5);
        let states = buffer.iter().map(|tr| tr.reward).collect::<Vec<_>>();
        assert_eq!(states, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(buffer.get(0), Some(&transition(7.0)));
        assert!(buffer.get(5).is_none());
    }

    #[test]
    fn test_ring_keeps_most_recent() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..20 {
            let capacity = rng.usize(1..50);
            let n = rng.usize(0..200);
            let mut buffer = buffer(capacity, None);
            (0..n).for_each(|i| buffer.push(transition(i as f32)).unwrap());

            assert_eq!(buffer.len(), n.min(capacity));
            let rewards = buffer.iter().map(|tr| tr.reward).collect::<Vec<_>>();
            let expected = (n.saturating_sub(capacity)..n).map(|i| i as f32).collect::<Vec<_>>();
            assert_eq!(rewards, expected);
        }
    }

    #[test]
    fn test_insufficient_data() {
        let mut buffer = buffer(10, None);
        (0..3).for_each(|i| buffer.push(transition(i as f32)).unwrap());
        let err = buffer.batch(4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReachError>(),
            Some(&ReachError::InsufficientData {
                len: 3,
                batch_size: 4
            })
        );
    }

    #[test]
    fn test_batch_distinct_indices() {
        let mut buffer = buffer(100, None);
        (0..10).for_each(|i| buffer.push(transition(i as f32)).unwrap());

        for _ in 0..50 {
            let batch = buffer.batch(10).unwrap();
            assert_eq!(batch.len(), 10);
            let ixs = batch.ix_sample.unwrap();
            let unique = ixs.iter().collect::<HashSet<_>>();
            assert_eq!(unique.len(), 10);
            assert!(batch.weight.is_none());
        }
    }

    #[test]
    fn test_batch_contents() {
        let mut buffer = buffer(100, None);
        (0..20).for_each(|i| buffer.push(transition(i as f32)).unwrap());
        let batch = buffer.batch(4).unwrap();
        for (k, &r) in batch.reward.iter().enumerate() {
            assert_eq!(batch.obs[2 * k..2 * k + 2], [r, -r]);
            assert_eq!(batch.act[k], r);
            assert_eq!(batch.next_obs[2 * k], r + 1.0);
        }
    }

    #[test]
    fn test_independent_draws() {
        let mut buffer = buffer(1000, None);
        (0..1000).for_each(|i| buffer.push(transition(i as f32)).unwrap());
        let b1 = buffer.batch(8).unwrap().ix_sample;
        let b2 = buffer.batch(8).unwrap().ix_sample;
        assert_ne!(b1, b2);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut buffer = buffer(10, None);
        let tr = Transition::new(vec![0.0], vec![0.0], 0.0, vec![0.0, 0.0], false, false);
        let err = buffer.push(tr).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReachError>(),
            Some(&ReachError::dim_mismatch("state", 2, 1))
        );
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_prioritized_sampling() {
        let mut buffer = buffer(8, Some(PerConfig::default().alpha(1.0).n_opts_final(10)));
        (0..8).for_each(|i| buffer.push(transition(i as f32)).unwrap());

        // Only slot 3 keeps a large priority
        let ixs = (0..8).collect::<Vec<_>>();
        let mut td_errs = vec![1e-3; 8];
        td_errs[3] = 100.0;
        buffer.update_priority(&Some(ixs), &Some(td_errs));
        assert!((buffer.beta().unwrap() - 0.46).abs() < 1e-5);

        let mut n3 = 0;
        for _ in 0..8 {
            let batch = buffer.batch(8).unwrap();
            n3 += batch.ix_sample.as_ref().unwrap().iter().filter(|&&ix| ix == 3).count();
            let ws = batch.weight.unwrap();
            assert!(ws.iter().all(|&w| w > 0.0 && w <= 1.0));
        }
        assert!(n3 > 56);
    }
}
