use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);
}

/// Stores records, then aggregates them with [`AggregateRecorder::flush`].
///
/// [`Trainer`](crate::Trainer) stores a record at every episode end and
/// flushes the recorder periodically.
pub trait AggregateRecorder {
    /// Store the record.
    fn store(&mut self, record: Record);

    /// Writes values aggregated from the stored records.
    ///
    /// `step` is the number of environment steps at the time of flushing.
    fn flush(&mut self, step: i64);
}
