use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{FinalizedLedger, ParticipantId, RankingEntry};
use crate::boss::BossId;
use crate::storage::{EncounterStore, InMemoryStore};

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantSummary {
    pub participant: ParticipantId,
    pub damage: f64,
    pub hits: u64,
    pub first_hit_at: DateTime<Utc>,
    pub last_hit_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStats {
    pub boss_id: BossId,
    pub boss_type: Option<String>,
    pub total_damage: f64,
    pub total_hits: u64,
    pub participants: usize,
    pub average_per_hit: f64,
    pub top_damager: Option<ParticipantId>,
    pub finalized: bool,
}

impl LedgerStats {
    fn from_record(record: &FinalizedLedger) -> Self {
        Self {
            boss_id: record.boss_id,
            boss_type: record.boss_type.clone(),
            total_damage: record.total_damage,
            total_hits: record.total_hits,
            participants: record.participant_count(),
            average_per_hit: if record.total_hits > 0 {
                record.total_damage / record.total_hits as f64
            } else {
                0.0
            },
            top_damager: record.ranking.first().map(|e| e.participant),
            finalized: true,
        }
    }
}

/// Finalized ledgers kept in memory when no limit is configured.
const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Damage is accounted in thousandths of a point so that totals do not
/// depend on the order hits arrive in.
const DAMAGE_SCALE: f64 = 1000.0;

fn to_units(amount: f64) -> Option<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    let units = (amount * DAMAGE_SCALE).round();
    // Float to int casts saturate.
    (units >= 1.0).then_some(units as u64)
}

fn to_damage(units: u64) -> f64 {
    units as f64 / DAMAGE_SCALE
}

fn share(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64
    } else {
        0.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Ledger Entry
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct ParticipantDamage {
    units: u64,
    hits: u64,
    /// Order of first contact, used to break ranking ties.
    first_seen: u64,
    first_hit_at: DateTime<Utc>,
    last_hit_at: DateTime<Utc>,
}

#[derive(Debug)]
struct LedgerState {
    boss_type: Option<String>,
    total_units: u64,
    total_hits: u64,
    participants: HashMap<ParticipantId, ParticipantDamage>,
    next_seq: u64,
    opened_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct LedgerEntry {
    boss_id: BossId,
    state: Mutex<LedgerState>,
}

impl LedgerEntry {
    fn new(boss_id: BossId, boss_type: Option<String>) -> Self {
        Self {
            boss_id,
            state: Mutex::new(LedgerState {
                boss_type,
                total_units: 0,
                total_hits: 0,
                participants: HashMap::new(),
                next_seq: 0,
                opened_at: Utc::now(),
                finalized_at: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LedgerState {
    /// Fold one hit into the participant and boss totals.
    fn apply(&mut self, participant: ParticipantId, units: u64, now: DateTime<Utc>) {
        let seq = self.next_seq;
        let row = self.participants.entry(participant).or_insert_with(|| ParticipantDamage {
            units: 0,
            hits: 0,
            first_seen: seq,
            first_hit_at: now,
            last_hit_at: now,
        });
        if row.first_seen == seq {
            self.next_seq += 1;
        }
        row.units = row.units.saturating_add(units);
        row.hits += 1;
        row.last_hit_at = now;
        self.total_units = self.total_units.saturating_add(units);
        self.total_hits += 1;
    }

    fn ranking(&self, limit: usize) -> Vec<RankingEntry> {
        let mut rows: Vec<(&ParticipantId, &ParticipantDamage)> = self.participants.iter().collect();
        rows.sort_by(|(_, a), (_, b)| {
            b.units
                .cmp(&a.units)
                .then(a.first_seen.cmp(&b.first_seen))
        });

        rows.into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, (participant, row))| RankingEntry {
                rank: idx + 1,
                participant: *participant,
                damage: to_damage(row.units),
                hits: row.hits,
                percentage: share(row.units, self.total_units),
            })
            .collect()
    }

    fn stats(&self, boss_id: BossId) -> LedgerStats {
        LedgerStats {
            boss_id,
            boss_type: self.boss_type.clone(),
            total_damage: to_damage(self.total_units),
            total_hits: self.total_hits,
            participants: self.participants.len(),
            average_per_hit: if self.total_hits > 0 {
                to_damage(self.total_units) / self.total_hits as f64
            } else {
                0.0
            },
            top_damager: self.ranking(1).first().map(|e| e.participant),
            finalized: self.finalized_at.is_some(),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Open(Arc<LedgerEntry>),
    /// Finalized. The participant map is dropped; the record lives in the
    /// history. The marker stops late hits from opening a fresh ledger.
    Closed,
}

// ═══════════════════════════════════════════════════════════════════════════
// Damage Ledger
// ═══════════════════════════════════════════════════════════════════════════

/// Concurrent per-boss damage accumulator.
///
/// The map only hands out `Arc`s to entries; all accounting happens under the
/// entry's own mutex after the map shard lock is released. Finalized ledgers
/// are kept in a bounded in-memory history, oldest evicted first.
#[derive(Debug)]
pub struct DamageLedger {
    entries: DashMap<BossId, Slot>,
    history: Arc<InMemoryStore>,
    /// Finalized bosses in closing order, for marker eviction.
    closed: Mutex<VecDeque<BossId>>,
    history_limit: usize,
}

impl Default for DamageLedger {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl DamageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` finalized ledgers in memory (at least one).
    pub fn with_history_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: DashMap::new(),
            history: Arc::new(InMemoryStore::bounded(limit)),
            closed: Mutex::new(VecDeque::new()),
            history_limit: limit,
        }
    }

    /// Finalized ledgers, newest last.
    pub fn history(&self) -> &Arc<InMemoryStore> {
        &self.history
    }

    fn entry(&self, boss_id: BossId) -> Option<Arc<LedgerEntry>> {
        match self.entries.get(&boss_id)?.value() {
            Slot::Open(entry) => Some(Arc::clone(entry)),
            Slot::Closed => None,
        }
    }

    /// `None` once the boss has been finalized.
    fn entry_or_create(&self, boss_id: BossId) -> Option<Arc<LedgerEntry>> {
        let slot = self
            .entries
            .entry(boss_id)
            .or_insert_with(|| Slot::Open(Arc::new(LedgerEntry::new(boss_id, None))));
        match slot.value() {
            Slot::Open(entry) => Some(Arc::clone(entry)),
            Slot::Closed => None,
        }
    }

    /// The history record of a finalized boss, if it is still kept.
    fn closed_record(&self, boss_id: BossId) -> Option<FinalizedLedger> {
        if !matches!(self.entries.get(&boss_id)?.value(), Slot::Closed) {
            return None;
        }
        self.history.by_boss(boss_id).ok().flatten()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recording
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a ledger at spawn time. Tags a lazily created entry with its type.
    /// Does nothing once the boss is finalized.
    pub fn open_ledger(&self, boss_id: BossId, boss_type: &str) {
        let Some(entry) = self.entry_or_create(boss_id) else {
            return;
        };
        let mut state = entry.lock();
        if state.boss_type.is_none() {
            state.boss_type = Some(boss_type.to_string());
        }
    }

    /// Add damage from one hit. Returns false if the amount was dropped
    /// (non-positive, non-finite or below a thousandth) or the ledger is
    /// already finalized.
    pub fn record_damage(&self, boss_id: BossId, participant: ParticipantId, amount: f64) -> bool {
        let Some(units) = to_units(amount) else {
            tracing::debug!(boss_id, participant, amount, "Dropping invalid damage amount");
            return false;
        };

        let Some(entry) = self.entry_or_create(boss_id) else {
            tracing::debug!(boss_id, participant, "Damage after finalization ignored");
            return false;
        };
        let mut state = entry.lock();
        if state.finalized_at.is_some() {
            tracing::debug!(boss_id, participant, "Damage after finalization ignored");
            return false;
        }
        state.apply(participant, units, Utc::now());
        true
    }

    /// Record many hits under one lock. Returns how many were accepted.
    pub fn record_bulk_damage(
        &self,
        boss_id: BossId,
        hits: impl IntoIterator<Item = (ParticipantId, f64)>,
    ) -> usize {
        let Some(entry) = self.entry_or_create(boss_id) else {
            return 0;
        };
        let mut state = entry.lock();
        if state.finalized_at.is_some() {
            return 0;
        }

        let now = Utc::now();
        let mut accepted = 0;
        for (participant, amount) in hits {
            if let Some(units) = to_units(amount) {
                state.apply(participant, units, now);
                accepted += 1;
            }
        }
        accepted
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────
    //
    // Finalized bosses are answered from the history record while it is kept.

    pub fn get_damage_ranking(&self, boss_id: BossId, limit: usize) -> Vec<RankingEntry> {
        if let Some(entry) = self.entry(boss_id) {
            return entry.lock().ranking(limit);
        }
        self.closed_record(boss_id)
            .map(|r| r.ranking.into_iter().take(limit).collect())
            .unwrap_or_default()
    }

    /// Hit timing is only tracked while the ledger is open.
    pub fn participant(&self, boss_id: BossId, participant: ParticipantId) -> Option<ParticipantSummary> {
        let entry = self.entry(boss_id)?;
        let state = entry.lock();
        state.participants.get(&participant).map(|row| ParticipantSummary {
            participant,
            damage: to_damage(row.units),
            hits: row.hits,
            first_hit_at: row.first_hit_at,
            last_hit_at: row.last_hit_at,
        })
    }

    pub fn participant_rank(&self, boss_id: BossId, participant: ParticipantId) -> Option<usize> {
        self.get_damage_ranking(boss_id, usize::MAX)
            .into_iter()
            .find(|e| e.participant == participant)
            .map(|e| e.rank)
    }

    pub fn participant_percentage(&self, boss_id: BossId, participant: ParticipantId) -> Option<f64> {
        let Some(entry) = self.entry(boss_id) else {
            return self
                .closed_record(boss_id)?
                .entry_for(participant)
                .map(|e| e.percentage);
        };
        let state = entry.lock();
        let row = state.participants.get(&participant)?;
        Some(share(row.units, state.total_units))
    }

    pub fn total_damage(&self, boss_id: BossId) -> Option<f64> {
        match self.entry(boss_id) {
            Some(entry) => Some(to_damage(entry.lock().total_units)),
            None => self.closed_record(boss_id).map(|r| r.total_damage),
        }
    }

    /// Participants in order of first contact. Finalized bosses list them in
    /// ranking order.
    pub fn participants(&self, boss_id: BossId) -> Vec<ParticipantId> {
        let Some(entry) = self.entry(boss_id) else {
            return self
                .closed_record(boss_id)
                .map(|r| r.ranking.iter().map(|e| e.participant).collect())
                .unwrap_or_default();
        };
        let state = entry.lock();
        let mut rows: Vec<_> = state
            .participants
            .iter()
            .map(|(id, row)| (row.first_seen, *id))
            .collect();
        rows.sort_unstable();
        rows.into_iter().map(|(_, id)| id).collect()
    }

    pub fn participant_count(&self, boss_id: BossId) -> usize {
        match self.entry(boss_id) {
            Some(entry) => entry.lock().participants.len(),
            None => self
                .closed_record(boss_id)
                .map(|r| r.participant_count())
                .unwrap_or(0),
        }
    }

    pub fn boss_stats(&self, boss_id: BossId) -> Option<LedgerStats> {
        match self.entry(boss_id) {
            Some(entry) => Some(entry.lock().stats(boss_id)),
            None => self.closed_record(boss_id).map(|r| LedgerStats::from_record(&r)),
        }
    }

    pub fn is_finalized(&self, boss_id: BossId) -> bool {
        match self.entries.get(&boss_id).as_deref() {
            Some(Slot::Open(entry)) => entry.lock().finalized_at.is_some(),
            Some(Slot::Closed) => true,
            None => false,
        }
    }

    /// Bosses with an open ledger.
    pub fn tracked_bosses(&self) -> Vec<BossId> {
        let mut ids: Vec<BossId> = self
            .entries
            .iter()
            .filter(|e| matches!(e.value(), Slot::Open(_)))
            .map(|e| *e.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Close the ledger and return its final ranking. Only the first call for
    /// a boss returns `Some`; unknown bosses also return `None`.
    pub fn finalize_boss_damage(&self, boss_id: BossId) -> Option<FinalizedLedger> {
        let entry = self.entry(boss_id)?;
        let finalized = {
            let mut state = entry.lock();
            if state.finalized_at.is_some() {
                tracing::debug!(boss_id, "Ledger already finalized");
                return None;
            }
            let now = Utc::now();
            state.finalized_at = Some(now);
            FinalizedLedger {
                boss_id: entry.boss_id,
                boss_type: state.boss_type.clone(),
                total_damage: to_damage(state.total_units),
                total_hits: state.total_hits,
                ranking: state.ranking(usize::MAX),
                opened_at: state.opened_at,
                finalized_at: now,
            }
        };

        tracing::info!(
            boss_id,
            total_damage = finalized.total_damage,
            participants = finalized.participant_count(),
            "Damage ledger finalized"
        );
        if let Err(e) = self.history.save(&finalized) {
            tracing::warn!(boss_id, error = %e, "Failed to keep finalized ledger in history");
        }
        self.close(boss_id);
        Some(finalized)
    }

    /// Swap the live entry for a marker and evict the oldest markers beyond
    /// the history limit.
    fn close(&self, boss_id: BossId) {
        self.entries.insert(boss_id, Slot::Closed);

        let mut closed = self.closed.lock().unwrap_or_else(|e| e.into_inner());
        closed.push_back(boss_id);
        while closed.len() > self.history_limit {
            if let Some(oldest) = closed.pop_front() {
                self.entries
                    .remove_if(&oldest, |_, slot| matches!(slot, Slot::Closed));
            }
        }
    }

    /// Forget one boss's ledger, open or finalized. History is kept.
    pub fn clear_boss(&self, boss_id: BossId) -> bool {
        self.entries.remove(&boss_id).is_some()
    }

    pub fn clear_all(&self) {
        self.entries.clear();
        self.closed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
