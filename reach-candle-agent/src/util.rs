//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor};
use candle_nn::VarMap;
use log::trace;
use serde::{Deserialize, Serialize};

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy, Default)]
pub enum CriticLoss {
    /// Mean squared error.
    #[default]
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

impl CriticLoss {
    /// Elementwise loss between predictions and targets, of the same shape as the inputs.
    pub fn elementwise(&self, pred: &Tensor, tgt: &Tensor) -> Result<Tensor> {
        let d = (pred - tgt)?;
        match self {
            Self::Mse => Ok(d.sqr()?),
            Self::SmoothL1 => {
                let d = d.abs()?;
                let m1 = d.lt(1.0)?.to_dtype(DType::F32)?;
                let m2 = (1.0 - &m1)?;
                let quad = (m1.affine(0.5, 0.0)? * d.sqr()?)?;
                let lin = (m2 * d.affine(1.0, -0.5)?)?;
                Ok((quad + lin)?)
            }
        }
    }

    /// Mean loss, optionally weighted per sample.
    pub fn loss(&self, pred: &Tensor, tgt: &Tensor, weight: Option<&Tensor>) -> Result<Tensor> {
        let l = self.elementwise(pred, tgt)?;
        match weight {
            None => Ok(l.mean_all()?),
            Some(w) => Ok((l * w)?.mean_all()?),
        }
    }
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    trace!("track(tau = {})", tau);
    let dest = dest
        .data()
        .lock()
        .map_err(|_| anyhow!("poisoned lock of the target variables"))?;
    let src = src
        .data()
        .lock()
        .map_err(|_| anyhow!("poisoned lock of the source variables"))?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| anyhow!("variable {} not found in the source", k_dest))?;
        let t_src = v_src.as_tensor();
        let t_dest = v_dest.as_tensor();
        let t = (t_src.affine(tau, 0.0)? + t_dest.affine(1.0 - tau, 0.0)?)?;
        v_dest.set(&t)?;
    }

    Ok(())
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: i64);
}

/// Temporal difference target `r + gamma * not_done * min_k q_k`.
///
/// All tensors have shape `(batch_size,)`. With two critics, the minimum
/// removes the overestimation bias of a single bootstrapped estimate.
pub fn td_target(
    reward: &Tensor,
    not_done: &Tensor,
    gamma: f64,
    next_qs: &[Tensor],
) -> Result<Tensor> {
    let (first, rest) = next_qs
        .split_first()
        .ok_or_else(|| anyhow!("td_target needs at least one action value"))?;
    let mut next_q = first.clone();
    for q in rest {
        next_q = next_q.minimum(q)?;
    }
    Ok((reward + (not_done * next_q)?.affine(gamma, 0.0)?)?.detach())
}

/// Sum of absolute differences between all the variables of two maps.
///
/// Used to check whether an update changed the parameters.
pub fn param_distance(v1: &VarMap, v2: &VarMap) -> Result<f32> {
    let v1 = v1.data().lock().map_err(|_| anyhow!("poisoned lock"))?;
    let v2 = v2.data().lock().map_err(|_| anyhow!("poisoned lock"))?;
    let mut d = 0f32;
    for (k, t1) in v1.iter() {
        let t2 = v2
            .get(k)
            .ok_or_else(|| anyhow!("variable {} not found", k))?;
        d += (t1.as_tensor() - t2.as_tensor())?
            .abs()?
            .sum_all()?
            .to_scalar::<f32>()?;
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use candle_nn::Init;

    fn varmap(values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((values.len(),), "var1", init, DType::F32, &Device::Cpu)?;
        vm.data()
            .lock()
            .unwrap()
            .get("var1")
            .unwrap()
            .set(&Tensor::from_slice(values, (values.len(),), &Device::Cpu)?)?;
        Ok(vm)
    }

    fn values(vm: &VarMap) -> Result<Vec<f32>> {
        let data = vm.data().lock().unwrap();
        Ok(data.get("var1").unwrap().as_tensor().to_vec1::<f32>()?)
    }

    #[test]
    fn test_track() -> Result<()> {
        let vm_src = varmap(&[1.0, 2.0, 3.0])?;
        let vm_dest = varmap(&[4.0, 5.0, 6.0])?;
        track(&vm_dest, &vm_src, 0.7)?;

        let expected = [0.7 * 1.0 + 0.3 * 4.0, 0.7 * 2.0 + 0.3 * 5.0, 0.7 * 3.0 + 0.3 * 6.0];
        for (v, e) in values(&vm_dest)?.iter().zip(expected.iter()) {
            assert!((v - e).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_track_extremes() -> Result<()> {
        let vm_src = varmap(&[1.0, 2.0, 3.0])?;
        let vm_dest = varmap(&[4.0, 5.0, 6.0])?;

        track(&vm_dest, &vm_src, 0.0)?;
        assert_eq!(values(&vm_dest)?, vec![4.0, 5.0, 6.0]);

        track(&vm_dest, &vm_src, 1.0)?;
        assert_eq!(values(&vm_dest)?, vec![1.0, 2.0, 3.0]);
        assert_eq!(param_distance(&vm_dest, &vm_src)?, 0.0);
        Ok(())
    }

    #[test]
    fn test_track_missing_variable() -> Result<()> {
        let vm_src = VarMap::new();
        let vm_dest = varmap(&[4.0])?;
        assert!(track(&vm_dest, &vm_src, 0.5).is_err());
        Ok(())
    }

    #[test]
    fn test_td_target_takes_min() -> Result<()> {
        let device = Device::Cpu;
        let reward = Tensor::from_slice(&[1.0f32, 0.0], (2,), &device)?;
        let not_done = Tensor::from_slice(&[1.0f32, 0.0], (2,), &device)?;
        let q1 = Tensor::from_slice(&[5.0f32, 5.0], (2,), &device)?;
        let q2 = Tensor::from_slice(&[2.0f32, 2.0], (2,), &device)?;

        let y = td_target(&reward, &not_done, 0.5, &[q1.clone(), q2.clone()])?.to_vec1::<f32>()?;
        assert_eq!(y, vec![1.0 + 0.5 * 2.0, 0.0]);

        // Order of critics does not matter
        let y = td_target(&reward, &not_done, 0.5, &[q2, q1.clone()])?.to_vec1::<f32>()?;
        assert_eq!(y, vec![2.0, 0.0]);

        // Single critic
        let y = td_target(&reward, &not_done, 0.5, &[q1])?.to_vec1::<f32>()?;
        assert_eq!(y, vec![3.5, 0.0]);

        assert!(td_target(&reward, &not_done, 0.5, &[]).is_err());
        Ok(())
    }

    #[test]
    fn test_smooth_l1() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::from_slice(&[0.0f32, 0.0], (2,), &device)?;
        let y = Tensor::from_slice(&[0.5f32, 3.0], (2,), &device)?;
        let l = CriticLoss::SmoothL1.elementwise(&x, &y)?.to_vec1::<f32>()?;
        assert!((l[0] - 0.125).abs() < 1e-6);
        assert!((l[1] - 2.5).abs() < 1e-6);
        Ok(())
    }
}
