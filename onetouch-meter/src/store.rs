//! In-memory record store

use serde::{Deserialize, Serialize};

/// One stored reading, as the meter keeps it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: u16,
    /// Seconds since the device epoch
    pub device_time: u32,
    pub value: i16,
    pub error_code: u16,
}

/// Records ordered by id
///
/// Index 0 addresses the newest record. Ids are never reused, so the highest
/// id survives deletion of the record that carried it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordStore {
    records: Vec<StoredRecord>,
    highest_id: u16,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading under the next id and return that id
    pub fn push(&mut self, device_time: u32, value: i16, error_code: u16) -> u16 {
        self.highest_id = self.highest_id.wrapping_add(1);
        self.records.push(StoredRecord {
            id: self.highest_id,
            device_time,
            value,
            error_code,
        });
        self.highest_id
    }

    /// Delete a record, leaving a gap in the id sequence
    pub fn remove(&mut self, id: u16) -> Option<StoredRecord> {
        let position = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(position))
    }

    pub fn by_id(&self, id: u16) -> Option<&StoredRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Record at `index` counting back from the newest
    pub fn by_index(&self, index: u16) -> Option<&StoredRecord> {
        let index = usize::from(index);
        if index >= self.records.len() {
            return None;
        }
        self.records.get(self.records.len() - 1 - index)
    }

    pub fn highest_id(&self) -> u16 {
        self.highest_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_counts_from_newest() {
        let mut store = RecordStore::new();
        store.push(10, 90, 0);
        store.push(20, 100, 0);
        let newest = store.push(30, 110, 0);

        assert_eq!(store.by_index(0).map(|r| r.id), Some(newest));
        assert_eq!(store.by_index(2).map(|r| r.id), Some(1));
        assert!(store.by_index(3).is_none());
    }

    #[test]
    fn test_removal_keeps_highest_id() {
        let mut store = RecordStore::new();
        store.push(10, 90, 0);
        store.push(20, 100, 0);
        assert!(store.remove(2).is_some());
        assert!(store.remove(2).is_none());

        assert_eq!(store.highest_id(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.by_id(2).is_none());
        assert_eq!(store.push(30, 110, 0), 3);
    }
}
