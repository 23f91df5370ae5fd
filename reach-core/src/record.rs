//! Types and traits for recording training metrics.
//!
//! * [`Record`] - key-value pairs of [`RecordValue`]s.
//! * [`Recorder`] / [`AggregateRecorder`] - destinations of records.
//! * [`BufferedRecorder`] keeps records in memory, [`LogRecorder`] averages
//!   them and writes to the `log` facade, [`NullRecorder`] discards them.
//!
//! ```rust
//! use reach_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(1.0));
//! record.insert("episode_return", RecordValue::Scalar(-12.5));
//! ```
mod base;
mod buffered_recorder;
mod log_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use log_recorder::LogRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::{AggregateRecorder, Recorder};
pub use storage::RecordStorage;
