//! Sum tree for proportional sampling of transitions by priority.
use rand::Rng;
use segment_tree::{ops::MaxIgnoreNaN, SegmentPoint};

/// Added to priorities so that no transition has zero probability.
const EPS: f32 = 1e-6;

/// Binary tree whose leaves hold `priority^alpha` of the buffer slots and
/// whose inner nodes hold the sum of their children.
#[derive(Debug)]
pub struct SumTree {
    alpha: f32,
    capacity: usize,
    n_samples: usize,
    tree: Vec<f32>,

    // Raw priorities, queried for the priority of new transitions.
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
}

impl SumTree {
    pub fn new(capacity: usize, alpha: f32) -> Self {
        Self {
            alpha,
            capacity,
            n_samples: 0,
            tree: vec![0f32; 2 * capacity - 1],
            max_tree: SegmentPoint::build(vec![EPS; capacity], MaxIgnoreNaN),
        }
    }

    fn propagate(&mut self, mut ix: usize, change: f32) {
        while ix != 0 {
            ix = (ix - 1) / 2;
            self.tree[ix] += change;
        }
    }

    fn retrieve(&self, mut ix: usize, mut s: f32) -> usize {
        loop {
            let left = 2 * ix + 1;
            let right = left + 1;
            if left >= self.tree.len() {
                return ix;
            }
            if s <= self.tree[left] || self.tree[right] == 0f32 {
                ix = left;
            } else {
                s -= self.tree[left];
                ix = right;
            }
        }
    }

    /// Sum of `priority^alpha` over all slots.
    pub fn total(&self) -> f32 {
        self.tree[0]
    }

    /// The largest priority given so far, or `1` for an empty tree.
    pub fn max(&self) -> f32 {
        if self.n_samples == 0 {
            1f32
        } else {
            self.max_tree.query(0, self.capacity)
        }
    }

    /// Sets the priority of a newly filled slot.
    pub fn add(&mut self, ix: usize, p: f32) {
        self.update(ix, p);
        if self.n_samples < self.capacity {
            self.n_samples += 1;
        }
    }

    /// Sets the priority of slot `ix` to `|p| + eps`.
    pub fn update(&mut self, ix: usize, p: f32) {
        debug_assert!(ix < self.capacity);
        let p = p.abs() + EPS;
        self.max_tree.modify(ix, p);
        let p = p.powf(self.alpha);
        let ix = ix + self.capacity - 1;
        let change = p - self.tree[ix];
        self.tree[ix] = p;
        self.propagate(ix, change);
    }

    /// The slot at which the cumulative sum of leaves reaches `s`.
    pub fn get(&self, s: f32) -> usize {
        let ix = self.retrieve(0, s);
        (ix + 1 - self.capacity).min(self.n_samples.saturating_sub(1))
    }

    /// Samples `batch_size` slots with replacement and returns them with
    /// importance weights.
    ///
    /// The weight is $w_i=\left(N P(i)\right)^{-\beta}$, normalized by its
    /// maximum within the batch.
    pub fn sample<R: Rng>(
        &self,
        batch_size: usize,
        beta: f32,
        rng: &mut R,
    ) -> (Vec<usize>, Vec<f32>) {
        let p_sum = self.total();
        let ixs = (0..batch_size)
            .map(|_| self.get(p_sum * rng.gen::<f32>()))
            .collect::<Vec<_>>();

        let n = self.n_samples as f32 / p_sum;
        let ws = ixs
            .iter()
            .map(|ix| self.tree[ix + self.capacity - 1])
            .map(|p| (n * p).powf(-beta))
            .collect::<Vec<_>>();
        let w_max = ws.iter().fold(f32::MIN_POSITIVE, |m, &w| m.max(w));
        let ws = ws.iter().map(|w| w / w_max).collect();

        (ixs, ws)
    }
}

#[cfg(test)]
mod tests {
    use super::SumTree;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sum_tree_proportional() {
        let data = vec![0.5f32, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9];
        let mut sum_tree = SumTree::new(8, 1.0);
        for (ix, &p) in data.iter().enumerate() {
            sum_tree.add(ix, p);
        }
        let total: f32 = data.iter().map(|p| p + 1e-6).sum();
        assert!((sum_tree.total() - total).abs() < 1e-4);
        assert!((sum_tree.max() - 3.9).abs() < 1e-4);

        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;
        let (ixs, ws) = sum_tree.sample(n, 1.0, &mut rng);
        assert!(ixs.iter().all(|&ix| ix < data.len()));
        assert!(ws.iter().all(|&w| w > 0.0 && w <= 1.0));

        // Frequencies follow priorities
        for (ix, &p) in data.iter().enumerate() {
            let freq = ixs.iter().filter(|&&e| e == ix).count() as f32 / n as f32;
            assert!((freq - p / total).abs() < 0.01, "{} {} {}", ix, freq, p / total);
        }
    }

    #[test]
    fn test_sum_tree_update() {
        let mut sum_tree = SumTree::new(4, 1.0);
        (0..4).for_each(|ix| sum_tree.add(ix, 1.0));
        sum_tree.update(2, -3.0);
        assert!((sum_tree.total() - 6.0).abs() < 1e-4);
        assert!((sum_tree.max() - 3.0).abs() < 1e-4);
    }
}
