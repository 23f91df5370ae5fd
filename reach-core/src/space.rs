//! Bounds of continuous action vectors.
use crate::error::{check_dim, ReachError};
use serde::{Deserialize, Serialize};

/// A box in `R^n`, given by elementwise lower and upper bounds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BoxSpace {
    low: Vec<f32>,
    high: Vec<f32>,
}

impl BoxSpace {
    /// Constructs a box with the given bounds.
    ///
    /// Fails if the bounds are not valid, see [`BoxSpace::validate`].
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Result<Self, ReachError> {
        let space = Self { low, high };
        space.validate()?;
        Ok(space)
    }

    /// Checks the bounds.
    ///
    /// A deserialized box bypasses [`BoxSpace::new`], so configurations holding
    /// a box call this when they are validated. Fails if the bounds have
    /// different lengths, are empty, are not finite, or `low[i] > high[i]`.
    pub fn validate(&self) -> Result<(), ReachError> {
        check_dim("high", self.low.len(), self.high.len())?;
        if self.low.is_empty() {
            return Err(ReachError::invalid_config("empty action space"));
        }
        if self.low.iter().chain(self.high.iter()).any(|v| !v.is_finite()) {
            return Err(ReachError::invalid_config(format!(
                "bounds of action space must be finite: {:?}, {:?}",
                self.low, self.high
            )));
        }
        if self.low.iter().zip(self.high.iter()).any(|(l, h)| l > h) {
            return Err(ReachError::invalid_config(format!(
                "lower bound exceeds upper bound: {:?} > {:?}",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// Constructs the box `[low, high]^dim`.
    pub fn uniform(dim: usize, low: f32, high: f32) -> Result<Self, ReachError> {
        Self::new(vec![low; dim], vec![high; dim])
    }

    /// Dimension of the box.
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Lower bounds.
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    /// Upper bounds.
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// Largest absolute value of the bounds, used as the scale of exploration noise.
    pub fn max_abs(&self) -> f32 {
        self.low
            .iter()
            .chain(self.high.iter())
            .fold(0f32, |m, v| m.max(v.abs()))
    }

    /// Clips `x` into the box elementwise.
    pub fn clip(&self, x: &[f32]) -> Result<Vec<f32>, ReachError> {
        check_dim("action", self.dim(), x.len())?;
        Ok(x.iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(v, (l, h))| v.clamp(*l, *h))
            .collect())
    }

    /// Returns `true` if `x` lies in the box.
    pub fn contains(&self, x: &[f32]) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(v, (l, h))| l <= v && v <= h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        let space = BoxSpace::new(vec![-1.0, 0.0], vec![1.0, 2.0]).unwrap();
        assert_eq!(space.clip(&[-3.0, 1.5]).unwrap(), vec![-1.0, 1.5]);
        assert_eq!(space.max_abs(), 2.0);
        assert!(space.contains(&[0.0, 2.0]));
        assert!(!space.contains(&[0.0, 2.1]));
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(BoxSpace::new(vec![1.0], vec![-1.0]).is_err());
        assert!(BoxSpace::new(vec![0.0], vec![1.0, 1.0]).is_err());
        assert!(BoxSpace::new(vec![f32::NAN], vec![1.0]).is_err());
        assert!(BoxSpace::new(vec![-1.0], vec![f32::INFINITY]).is_err());
        let err = BoxSpace::uniform(2, -1.0, 1.0).unwrap().clip(&[0.0]).unwrap_err();
        assert_eq!(err, ReachError::dim_mismatch("action", 2, 1));
    }

    #[test]
    fn test_validate_deserialized() {
        let space: BoxSpace = serde_yaml::from_str("low: [1.0]\nhigh: [-1.0]").unwrap();
        assert!(matches!(
            space.validate(),
            Err(ReachError::InvalidConfiguration(_))
        ));
        let space: BoxSpace = serde_yaml::from_str("low: [-1.0, 0.0]\nhigh: [1.0]").unwrap();
        assert!(space.validate().is_err());
        let space: BoxSpace = serde_yaml::from_str("low: [-1.0]\nhigh: [1.0]").unwrap();
        assert!(space.validate().is_ok());
    }
}
