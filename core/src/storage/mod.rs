//! Encounter persistence
//!
//! Finalized ledgers are hand-off artifacts. [`EncounterStore`] is the read
//! and write surface a storage backend implements; the query methods have
//! default implementations on top of `load_all` so a backend only needs
//! the three primitives.

mod error;
mod jsonl;
mod memory;

pub use error::StorageError;
pub use jsonl::JsonLinesStore;
pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::boss::BossId;
use crate::damage::{FinalizedLedger, ParticipantId, RankingEntry};

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    pub fn all() -> Self {
        Self {
            limit: usize::MAX,
            offset: 0,
        }
    }

    fn apply(self, records: Vec<FinalizedLedger>) -> Vec<FinalizedLedger> {
        records
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

pub trait EncounterStore: Send + Sync {
    fn save(&self, record: &FinalizedLedger) -> Result<(), StorageError>;

    /// Every stored record, in insertion order.
    fn load_all(&self) -> Result<Vec<FinalizedLedger>, StorageError>;

    /// Remove the record for a boss. Returns false if there was none.
    fn delete(&self, boss_id: BossId) -> Result<bool, StorageError>;

    fn by_boss(&self, boss_id: BossId) -> Result<Option<FinalizedLedger>, StorageError> {
        Ok(self
            .load_all()?
            .into_iter()
            .rev()
            .find(|r| r.boss_id == boss_id))
    }

    /// Encounters the participant took part in, newest first.
    fn by_participant(
        &self,
        participant: ParticipantId,
        page: Page,
    ) -> Result<Vec<FinalizedLedger>, StorageError> {
        let matching = newest_first(self.load_all()?)
            .into_iter()
            .filter(|r| r.entry_for(participant).is_some())
            .collect();
        Ok(page.apply(matching))
    }

    /// Encounters finalized in `[from, to)`, newest first.
    fn in_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<FinalizedLedger>, StorageError> {
        let matching = newest_first(self.load_all()?)
            .into_iter()
            .filter(|r| r.finalized_at >= from && r.finalized_at < to)
            .collect();
        Ok(page.apply(matching))
    }

    fn all(&self, page: Page) -> Result<Vec<FinalizedLedger>, StorageError> {
        Ok(page.apply(newest_first(self.load_all()?)))
    }

    fn top_damagers(&self, boss_id: BossId, limit: usize) -> Result<Vec<RankingEntry>, StorageError> {
        Ok(self
            .by_boss(boss_id)?
            .map(|r| r.ranking.into_iter().take(limit).collect())
            .unwrap_or_default())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.load_all()?.len())
    }

    /// Mean boss total damage across stored encounters.
    fn average_total_damage(&self) -> Result<Option<f64>, StorageError> {
        let records = self.load_all()?;
        if records.is_empty() {
            return Ok(None);
        }
        let sum: f64 = records.iter().map(|r| r.total_damage).sum();
        Ok(Some(sum / records.len() as f64))
    }
}

fn newest_first(mut records: Vec<FinalizedLedger>) -> Vec<FinalizedLedger> {
    records.sort_by(|a, b| b.finalized_at.cmp(&a.finalized_at));
    records
}

/// Default location of the encounter history file.
/// Creates `~/.local/share/bossfall/` if it doesn't exist.
pub fn default_history_path() -> Result<PathBuf, StorageError> {
    let base = crate::context::data_dir().unwrap_or_else(|| PathBuf::from("."));

    std::fs::create_dir_all(&base).map_err(|source| StorageError::CreateDir {
        path: base.clone(),
        source,
    })?;
    Ok(base.join("encounters.jsonl"))
}
