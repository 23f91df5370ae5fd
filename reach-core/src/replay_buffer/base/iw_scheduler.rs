//! Annealing of the importance-weight exponent used with priorities.

/// Linear schedule of `beta` from `beta_0` to `beta_final`.
///
/// The schedule advances once per priority update, i.e., once per
/// optimization step of the agent.
#[derive(Clone, Debug, PartialEq)]
pub struct IwScheduler {
    beta_0: f32,
    beta_final: f32,
    n_opts_final: usize,
    n_opts: usize,
}

impl IwScheduler {
    /// Creates a scheduler at step 0.
    pub fn new(beta_0: f32, beta_final: f32, n_opts_final: usize) -> Self {
        Self {
            beta_0,
            beta_final,
            n_opts_final,
            n_opts: 0,
        }
    }

    /// Current exponent of importance weights.
    pub fn beta(&self) -> f32 {
        if self.n_opts >= self.n_opts_final {
            return self.beta_final;
        }
        let progress = self.n_opts as f32 / self.n_opts_final as f32;
        self.beta_0 + (self.beta_final - self.beta_0) * progress
    }

    /// Number of steps taken so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Advances the schedule by one optimization step.
    pub fn step(&mut self) {
        self.n_opts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_annealing() {
        let mut s = IwScheduler::new(0.4, 1.0, 4);
        assert_eq!(s.beta(), 0.4);
        s.step();
        s.step();
        assert!((s.beta() - 0.7).abs() < 1e-6);
        (0..10).for_each(|_| s.step());
        assert_eq!(s.n_opts(), 12);
        assert_eq!(s.beta(), 1.0);
    }
}
