//! Refinements of TD3 on top of DDPG.
use anyhow::Result;
use candle_core::Tensor;
use reach_core::error::{ensure_config, ReachError};
use serde::{Deserialize, Serialize};

/// Configuration of the TD3 extension.
///
/// When given to [`DdpgConfig`](super::DdpgConfig), the agent uses twin critics,
/// target policy smoothing and delayed updates of the actor and targets.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Td3Config {
    /// The actor and target networks are updated every `policy_delay` critic updates.
    pub policy_delay: usize,

    /// Standard deviation of the smoothing noise, relative to the largest bound of actions.
    pub target_noise_std: f64,

    /// Clipping range of the smoothing noise, relative to the largest bound of actions.
    pub target_noise_clip: f64,
}

impl Default for Td3Config {
    fn default() -> Self {
        Self {
            policy_delay: 2,
            target_noise_std: 0.2,
            target_noise_clip: 0.5,
        }
    }
}

impl Td3Config {
    /// Sets the delay of actor and target updates.
    pub fn policy_delay(mut self, v: usize) -> Self {
        self.policy_delay = v;
        self
    }

    /// Sets the standard deviation of the smoothing noise.
    pub fn target_noise_std(mut self, v: f64) -> Self {
        self.target_noise_std = v;
        self
    }

    /// Sets the clipping range of the smoothing noise.
    pub fn target_noise_clip(mut self, v: f64) -> Self {
        self.target_noise_clip = v;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<(), ReachError> {
        ensure_config(self.policy_delay >= 1, "policy_delay must be >= 1")?;
        ensure_config(
            self.target_noise_std >= 0.0,
            format!("target_noise_std must be >= 0, got {}", self.target_noise_std),
        )?;
        ensure_config(
            self.target_noise_clip >= 0.0,
            format!("target_noise_clip must be >= 0, got {}", self.target_noise_clip),
        )
    }

    /// Returns `true` if the actor and targets are updated at the given count of updates.
    ///
    /// `n_opts` counts the current update, so the first delayed update is at
    /// `n_opts == policy_delay`.
    pub fn is_policy_update(&self, n_opts: usize) -> bool {
        n_opts % self.policy_delay == 0
    }
}

/// Adds clipped noise to target actions and clips them into `[low, high]`.
///
/// `scale` is the largest absolute bound of the action space. `low` and `high`
/// have shape `(1, dim_act)`.
pub(super) fn smooth_target_action(
    act: &Tensor,
    config: &Td3Config,
    scale: f64,
    low: &Tensor,
    high: &Tensor,
) -> Result<Tensor> {
    let std = (config.target_noise_std * scale) as f32;
    let clip = config.target_noise_clip * scale;
    let noise = Tensor::randn(0f32, std, act.dims(), act.device())?.clamp(-clip, clip)?;
    let act = (act + noise)?
        .broadcast_maximum(low)?
        .broadcast_minimum(high)?;
    Ok(act.detach())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_policy_update_schedule() {
        let config = Td3Config::default().policy_delay(3);
        let updates: Vec<usize> = (1..=10).filter(|&t| config.is_policy_update(t)).collect();
        assert_eq!(updates, vec![3, 6, 9]);
    }

    #[test]
    fn test_smoothed_actions_are_bounded() -> Result<()> {
        let device = Device::Cpu;
        let config = Td3Config::default().target_noise_std(10.0).target_noise_clip(0.5);
        let act = Tensor::from_slice(&[0.9f32, -0.9, 0.0, 0.0], (2, 2), &device)?;
        let low = Tensor::from_slice(&[-1f32, -1.0], (1, 2), &device)?;
        let high = Tensor::from_slice(&[1f32, 1.0], (1, 2), &device)?;
        let smoothed = smooth_target_action(&act, &config, 1.0, &low, &high)?.to_vec2::<f32>()?;
        let act = act.to_vec2::<f32>()?;

        for (row_s, row_a) in smoothed.iter().zip(act.iter()) {
            for (s, a) in row_s.iter().zip(row_a.iter()) {
                assert!((-1.0..=1.0).contains(s));
                assert!((s - a).abs() <= 0.5 + 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(Td3Config::default().validate().is_ok());
        assert!(Td3Config::default().policy_delay(0).validate().is_err());
        assert!(Td3Config::default().target_noise_std(-0.1).validate().is_err());
    }
}
