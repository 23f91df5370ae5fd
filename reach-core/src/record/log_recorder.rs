use super::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};
use log::info;

/// Writes records to the `log` facade.
///
/// Stored records are averaged by [`RecordStorage`] and written as a single
/// `info!` line when flushed.
#[derive(Default)]
pub struct LogRecorder {
    storage: RecordStorage,
}

impl LogRecorder {
    /// Constructs the recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

fn format_record(record: &Record) -> String {
    let mut items = record
        .iter()
        .filter_map(|(k, v)| match v {
            RecordValue::Scalar(v) => Some(format!("{}: {:.4}", k, v)),
            RecordValue::DateTime(t) => {
                Some(format!("{}: {}", k, t.format("%Y-%m-%d %H:%M:%S")))
            }
        })
        .collect::<Vec<_>>();
    items.sort();
    items.join(", ")
}

impl Recorder for LogRecorder {
    fn write(&mut self, record: Record) {
        info!("{}", format_record(&record));
    }
}

impl AggregateRecorder for LogRecorder {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        if self.storage.is_empty() {
            return;
        }
        let record = self.storage.aggregate();
        info!("env_steps: {}, {}", step, format_record(&record));
    }
}
