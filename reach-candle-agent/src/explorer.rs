//! Exploration noise added to the actions of deterministic policies.
use anyhow::Result;
use candle_core::Tensor;
use reach_core::{error::ensure_config, error::ReachError, BoxSpace};
use serde::{Deserialize, Serialize};

/// Configuration of [`Explorer`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum ExplorerConfig {
    /// Temporally correlated noise, `dx = theta (mu - x) dt + sigma sqrt(dt) N(0, 1)`.
    OrnsteinUhlenbeck {
        /// Mean of the process.
        mu: f64,

        /// Rate of mean reversion.
        theta: f64,

        /// Scale of the perturbation.
        sigma: f64,

        /// Time step.
        dt: f64,
    },

    /// Independent zero-mean Gaussian noise with a decaying standard deviation.
    ///
    /// The standard deviation is `ratio * max|bound|`, where `ratio` decays
    /// linearly from `initial_ratio` to `min_ratio` over `decay_steps` samples.
    /// During the first `max_exploration_steps` samples the ratio is 1.
    Gaussian {
        /// Ratio at the first sample.
        initial_ratio: f64,

        /// Ratio after decay.
        min_ratio: f64,

        /// Number of samples over which the ratio decays.
        decay_steps: usize,

        /// Number of samples with the maximum noise, before the decay starts.
        max_exploration_steps: usize,
    },
}

impl ExplorerConfig {
    /// Ornstein-Uhlenbeck noise with `mu = 0`, `theta = 0.15`, `sigma = 0.2` and `dt = 1`.
    pub fn ou() -> Self {
        Self::OrnsteinUhlenbeck {
            mu: 0.0,
            theta: 0.15,
            sigma: 0.2,
            dt: 1.0,
        }
    }

    /// Gaussian noise decaying from 0.5 to 0.1 over 10000 samples.
    pub fn gaussian() -> Self {
        Self::Gaussian {
            initial_ratio: 0.5,
            min_ratio: 0.1,
            decay_steps: 10_000,
            max_exploration_steps: 0,
        }
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<(), ReachError> {
        match self {
            Self::OrnsteinUhlenbeck {
                theta, sigma, dt, ..
            } => {
                ensure_config(*theta >= 0.0, format!("OU theta must be >= 0, got {}", theta))?;
                ensure_config(*sigma >= 0.0, format!("OU sigma must be >= 0, got {}", sigma))?;
                ensure_config(*dt > 0.0, format!("OU dt must be > 0, got {}", dt))
            }
            Self::Gaussian {
                initial_ratio,
                min_ratio,
                decay_steps,
                ..
            } => {
                ensure_config(
                    0.0 <= *min_ratio && min_ratio <= initial_ratio,
                    format!(
                        "noise ratios must satisfy 0 <= min_ratio <= initial_ratio, got {} and {}",
                        min_ratio, initial_ratio
                    ),
                )?;
                ensure_config(*decay_steps >= 1, "decay_steps must be >= 1")
            }
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self::ou()
    }
}

/// State of Ornstein-Uhlenbeck process.
pub struct OrnsteinUhlenbeck {
    mu: f64,
    theta: f64,
    sigma: f64,
    dt: f64,
    scale: f64,

    // None is the mean of the process
    state: Option<Tensor>,
}

impl OrnsteinUhlenbeck {
    fn sample(&mut self, like: &Tensor) -> Result<Tensor> {
        let x = match &self.state {
            Some(x) => x.clone(),
            None => like.ones_like()?.affine(0.0, self.mu)?,
        };
        let z = Tensor::randn(0f32, 1f32, like.dims(), like.device())?;
        let dx = ((x.affine(-1.0, self.mu)? * (self.theta * self.dt))?
            + (z * (self.sigma * self.dt.sqrt()))?)?;
        let x = (x + dx)?;
        self.state = Some(x.clone());
        Ok(x.affine(self.scale, 0.0)?)
    }
}

/// State of decaying Gaussian noise.
pub struct Gaussian {
    initial_ratio: f64,
    min_ratio: f64,
    decay_steps: usize,
    max_exploration_steps: usize,
    scale: f64,
    n_samples: usize,
}

impl Gaussian {
    /// Current ratio of the standard deviation to the largest bound.
    pub fn ratio(&self) -> f64 {
        if self.n_samples < self.max_exploration_steps {
            1.0
        } else {
            let t = (self.n_samples - self.max_exploration_steps) as f64 / self.decay_steps as f64;
            self.initial_ratio - (self.initial_ratio - self.min_ratio) * t.min(1.0)
        }
    }

    fn sample(&mut self, like: &Tensor) -> Result<Tensor> {
        let std = (self.ratio() * self.scale) as f32;
        self.n_samples += 1;
        Ok(Tensor::randn(0f32, std, like.dims(), like.device())?)
    }
}

/// Exploration noise.
pub enum Explorer {
    /// Ornstein-Uhlenbeck process.
    OrnsteinUhlenbeck(OrnsteinUhlenbeck),

    /// Gaussian noise.
    Gaussian(Gaussian),
}

impl Explorer {
    /// Constructs an explorer scaled to the given action space.
    ///
    /// The noise is proportional to the largest absolute bound of the space.
    pub fn build(config: &ExplorerConfig, action_space: &BoxSpace) -> Result<Self> {
        config.validate()?;
        let scale = action_space.max_abs() as f64;
        Ok(match *config {
            ExplorerConfig::OrnsteinUhlenbeck { mu, theta, sigma, dt } => {
                Self::OrnsteinUhlenbeck(OrnsteinUhlenbeck {
                    mu,
                    theta,
                    sigma,
                    dt,
                    scale,
                    state: None,
                })
            }
            ExplorerConfig::Gaussian {
                initial_ratio,
                min_ratio,
                decay_steps,
                max_exploration_steps,
            } => Self::Gaussian(Gaussian {
                initial_ratio,
                min_ratio,
                decay_steps,
                max_exploration_steps,
                scale,
                n_samples: 0,
            }),
        })
    }

    /// Restores the state of the noise process to its mean.
    ///
    /// Called at the beginning of every episode.
    pub fn reset(&mut self) {
        if let Self::OrnsteinUhlenbeck(ou) = self {
            ou.state = None;
        }
    }

    /// Returns a noise tensor of the same shape as `greedy`.
    pub fn noise(&mut self, greedy: &Tensor) -> Result<Tensor> {
        match self {
            Self::OrnsteinUhlenbeck(ou) => ou.sample(greedy),
            Self::Gaussian(g) => g.sample(greedy),
        }
    }

    /// Adds noise to the greedy action. The result is not clipped.
    pub fn apply(&mut self, greedy: &Tensor) -> Result<Tensor> {
        let noise = self.noise(greedy)?;
        Ok((greedy + noise)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn zeros() -> Tensor {
        Tensor::zeros((1, 4), DType::F32, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_ou_reset() -> Result<()> {
        let space = BoxSpace::uniform(4, -1.0, 1.0)?;
        let mut explorer = Explorer::build(&ExplorerConfig::ou(), &space)?;

        let before: Vec<Vec<f32>> = (0..2)
            .map(|_| Ok(explorer.noise(&zeros())?.flatten_all()?.to_vec1::<f32>()?))
            .collect::<Result<_>>()?;
        explorer.reset();
        let after: Vec<Vec<f32>> = (0..2)
            .map(|_| Ok(explorer.noise(&zeros())?.flatten_all()?.to_vec1::<f32>()?))
            .collect::<Result<_>>()?;

        assert_ne!(before, after);
        // Noise is correlated in time
        assert_ne!(before[0], before[1]);
        Ok(())
    }

    #[test]
    fn test_gaussian_decay() -> Result<()> {
        let space = BoxSpace::uniform(4, -2.0, 2.0)?;
        let config = ExplorerConfig::Gaussian {
            initial_ratio: 0.5,
            min_ratio: 0.1,
            decay_steps: 4,
            max_exploration_steps: 2,
        };
        let mut explorer = Explorer::build(&config, &space)?;
        let mut ratios = vec![];
        for _ in 0..8 {
            if let Explorer::Gaussian(g) = &explorer {
                ratios.push(g.ratio());
            }
            explorer.apply(&zeros())?;
        }
        let expected = [1.0, 1.0, 0.5, 0.4, 0.3, 0.2, 0.1, 0.1];
        for (r, e) in ratios.iter().zip(expected.iter()) {
            assert!((r - e).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(ExplorerConfig::ou().validate().is_ok());
        assert!(ExplorerConfig::gaussian().validate().is_ok());
        let config = ExplorerConfig::OrnsteinUhlenbeck {
            mu: 0.0,
            theta: 0.15,
            sigma: 0.2,
            dt: 0.0,
        };
        assert!(config.validate().is_err());
        let config = ExplorerConfig::Gaussian {
            initial_ratio: 0.1,
            min_ratio: 0.5,
            decay_steps: 10,
            max_exploration_steps: 0,
        };
        assert!(config.validate().is_err());
    }
}
