//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Public functions return [`anyhow::Result`]; callers that need to react to a
/// specific failure downcast the error to this type, e.g.
/// `err.downcast_ref::<ReachError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReachError {
    /// The replay buffer holds fewer transitions than requested.
    ///
    /// Agents recover from this locally by skipping the optimization step.
    #[error("Insufficient data: {len} transitions in the buffer, {batch_size} requested")]
    InsufficientData {
        /// Number of transitions currently stored.
        len: usize,

        /// Requested batch size.
        batch_size: usize,
    },

    /// A vector does not have the declared dimension.
    #[error("Dimension mismatch of {name}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was checked, e.g. `"state"`.
        name: String,

        /// Declared dimension.
        expected: usize,

        /// Observed dimension.
        actual: usize,
    },

    /// A configuration value is outside of its valid domain.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

impl ReachError {
    /// Shorthand for [`ReachError::DimensionMismatch`].
    pub fn dim_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Shorthand for [`ReachError::InvalidConfiguration`].
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// Returns `Ok(())` if `actual == expected`, otherwise [`ReachError::DimensionMismatch`].
pub fn check_dim(name: &str, expected: usize, actual: usize) -> Result<(), ReachError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ReachError::dim_mismatch(name, expected, actual))
    }
}

/// Returns [`ReachError::InvalidConfiguration`] with `msg` unless `cond` holds.
pub fn ensure_config(cond: bool, msg: impl Into<String>) -> Result<(), ReachError> {
    if cond {
        Ok(())
    } else {
        Err(ReachError::invalid_config(msg))
    }
}
