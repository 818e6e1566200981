//! Damage accounting and ranking
//!
//! One ledger entry per boss accumulates damage from many concurrent
//! participants. The per-participant and boss totals are updated under the
//! same per-boss lock, so they always agree. Entries are created atomically
//! on first contact and finalized exactly once, when the boss dies or
//! despawns.

mod ledger;


pub use ledger::{DamageLedger, LedgerStats, ParticipantSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::boss::BossId;

/// Opaque id of an attacking participant.
pub type ParticipantId = u64;

/// One row of a damage ranking. `rank` starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub participant: ParticipantId,
    pub damage: f64,
    pub hits: u64,
    /// Share of the boss total in `[0, 1]`.
    pub percentage: f64,
}

/// Read-only record of a closed ledger, handed to rewards and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedLedger {
    pub boss_id: BossId,
    pub boss_type: Option<String>,
    pub total_damage: f64,
    pub total_hits: u64,
    pub ranking: Vec<RankingEntry>,
    pub opened_at: DateTime<Utc>,
    pub finalized_at: DateTime<Utc>,
}

impl FinalizedLedger {
    pub fn duration_secs(&self) -> f64 {
        (self.finalized_at - self.opened_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn participant_count(&self) -> usize {
        self.ranking.len()
    }

    pub fn entry_for(&self, participant: ParticipantId) -> Option<&RankingEntry> {
        self.ranking.iter().find(|e| e.participant == participant)
    }
}
