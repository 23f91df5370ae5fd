//! Storage of records with aggregation.
use super::{Record, RecordValue};
use std::collections::BTreeSet;

/// Stores records and aggregates them into a single record.
///
/// Scalars are averaged over the records having the key. For the other
/// types the most recent value is kept.
#[derive(Default)]
pub struct RecordStorage {
    data: Vec<Record>,
}

fn mean(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().sum::<f32>() / vs.len() as f32)
}

impl RecordStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record.
    pub fn store(&mut self, record: Record) {
        self.data.push(record);
    }

    /// Returns `true` if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Sorted so that aggregated records are logged in a stable order.
    fn keys(&self) -> BTreeSet<String> {
        self.data
            .iter()
            .flat_map(|record| record.keys().cloned())
            .collect()
    }

    fn latest(&self, key: &str) -> Option<RecordValue> {
        self.data.iter().rev().find_map(|r| r.get(key).cloned())
    }

    /// Aggregates the stored records and clears the storage.
    pub fn aggregate(&mut self) -> Record {
        let mut record = Record::empty();

        for key in self.keys() {
            let scalars = self
                .data
                .iter()
                .filter_map(|r| match r.get(&key) {
                    Some(RecordValue::Scalar(v)) => Some(*v),
                    _ => None,
                })
                .collect::<Vec<_>>();
            if !scalars.is_empty() {
                record.insert(key, mean(&scalars));
            } else if let Some(value) = self.latest(&key) {
                record.insert(key, value);
            }
        }

        self.data.clear();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[test]
    fn test_aggregate() {
        let t1 = Local::now();
        let t2 = Local::now();
        let mut storage = RecordStorage::new();
        storage.store(Record::from_slice(&[
            ("loss", RecordValue::Scalar(1.0)),
            ("datetime", RecordValue::DateTime(t1)),
        ]));
        storage.store(Record::from_slice(&[
            ("loss", RecordValue::Scalar(3.0)),
            ("datetime", RecordValue::DateTime(t2)),
        ]));
        let record = storage.aggregate();
        assert_eq!(record.get_scalar("loss").unwrap(), 2.0);
        assert_eq!(record.get("datetime"), Some(&RecordValue::DateTime(t2)));
        assert!(storage.is_empty());
    }
}
