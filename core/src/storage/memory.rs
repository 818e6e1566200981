use std::collections::VecDeque;
use std::sync::RwLock;

use super::{EncounterStore, StorageError};
use crate::boss::BossId;
use crate::damage::FinalizedLedger;

/// Process-local store. Also serves as the ledger's own history.
///
/// A bounded store drops its oldest record once full.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<VecDeque<FinalizedLedger>>,
    capacity: Option<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: Some(capacity),
        }
    }

    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl EncounterStore for InMemoryStore {
    fn save(&self, record: &FinalizedLedger) -> Result<(), StorageError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.push_back(record.clone());
        if let Some(capacity) = self.capacity {
            while records.len() > capacity {
                records.pop_front();
            }
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<FinalizedLedger>, StorageError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect())
    }

    fn delete(&self, boss_id: BossId) -> Result<bool, StorageError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let before = records.len();
        records.retain(|r| r.boss_id != boss_id);
        Ok(records.len() != before)
    }

    fn by_boss(&self, boss_id: BossId) -> Result<Option<FinalizedLedger>, StorageError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|r| r.boss_id == boss_id)
            .cloned())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.read().unwrap_or_else(|e| e.into_inner()).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_record(boss_id: BossId) -> FinalizedLedger {
        let now = Utc::now();
        FinalizedLedger {
            boss_id,
            boss_type: None,
            total_damage: 0.0,
            total_hits: 0,
            ranking: Vec::new(),
            opened_at: now,
            finalized_at: now,
        }
    }

    #[test]
    fn test_bounded_store_drops_oldest() {
        let store = InMemoryStore::bounded(2);
        for boss_id in 1..=3 {
            store.save(&make_record(boss_id)).unwrap();
        }

        assert_eq!(store.count().unwrap(), 2);
        assert!(store.by_boss(1).unwrap().is_none());
        let kept: Vec<BossId> = store.load_all().unwrap().iter().map(|r| r.boss_id).collect();
        assert_eq!(kept, vec![2, 3]);
    }

    #[test]
    fn test_unbounded_store_keeps_everything() {
        let store = InMemoryStore::new();
        for boss_id in 1..=50 {
            store.save(&make_record(boss_id)).unwrap();
        }
        assert_eq!(store.count().unwrap(), 50);
        assert!(store.delete(7).unwrap());
        assert!(!store.delete(7).unwrap());
    }
}
