use bossfall_types::RewardSettings;
use rand::Rng;
use serde::Serialize;
use std::sync::{Arc, RwLock};

use super::{PARTICIPANT_PLACEHOLDER, Reward, RewardCatalog, RewardKind};
use crate::damage::{FinalizedLedger, ParticipantId};
use crate::rng::SharedRng;

/// Economy service. Returns false if the deposit did not go through.
pub trait CurrencyBackend: Send + Sync {
    fn deposit(&self, participant: ParticipantId, amount: f64) -> bool;
}

/// Delivers non-currency rewards (items, commands, external items).
/// Returns false if delivery failed.
pub trait InventoryBackend: Send + Sync {
    fn give(&self, participant: ParticipantId, reward: &RewardKind) -> bool;
}

/// Rewards handed to one participant by a distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardOutcome {
    pub participant: ParticipantId,
    pub rank: usize,
    pub damage_percent: f64,
    pub rewards: Vec<Reward>,
}

/// Rolls and delivers rewards against a copy-on-write pool catalog.
///
/// Without an inventory backend, non-currency rewards are returned
/// undelivered for the caller to apply.
pub struct RewardEngine {
    catalog: RwLock<Arc<RewardCatalog>>,
    settings: RewardSettings,
    currency: Option<Arc<dyn CurrencyBackend>>,
    inventory: Option<Arc<dyn InventoryBackend>>,
    rng: SharedRng,
}

impl RewardEngine {
    pub fn new(catalog: RewardCatalog, settings: RewardSettings, rng: SharedRng) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            settings,
            currency: None,
            inventory: None,
            rng,
        }
    }

    pub fn with_currency(mut self, backend: Arc<dyn CurrencyBackend>) -> Self {
        self.currency = Some(backend);
        self
    }

    pub fn with_inventory(mut self, backend: Arc<dyn InventoryBackend>) -> Self {
        self.inventory = Some(backend);
        self
    }

    pub fn settings(&self) -> &RewardSettings {
        &self.settings
    }

    pub fn catalog(&self) -> Arc<RewardCatalog> {
        Arc::clone(&self.catalog.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn replace_catalog(&self, catalog: RewardCatalog) {
        let pools = catalog.pool_count();
        *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(catalog);
        tracing::info!(pools, "Reward catalog reloaded");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Distribution
    // ─────────────────────────────────────────────────────────────────────────

    /// Roll and deliver the pool for (tier, rank). Numeric rewards scale by
    /// `rank_multiplier * (0.5 + damage_percent)`.
    pub fn give_rewards(
        &self,
        participant: ParticipantId,
        tier: u32,
        rank: usize,
        damage_percent: f64,
    ) -> Vec<Reward> {
        if !self.settings.enabled {
            return Vec::new();
        }

        let damage_percent = if damage_percent.is_nan() {
            0.0
        } else {
            damage_percent.clamp(0.0, 1.0)
        };
        let pool = self.catalog().resolve(tier, rank);
        let multiplier = pool.rank_multiplier * (0.5 + damage_percent);

        let mut granted = Vec::new();
        for reward in &pool.rewards {
            let roll = self.rng.with(|rng| rng.random::<f64>());
            if roll >= reward.chance {
                continue;
            }

            let mut reward = reward.scaled(multiplier);
            if let RewardKind::Command { command } = &mut reward.kind {
                *command = command.replace(PARTICIPANT_PLACEHOLDER, &participant.to_string());
            }
            if self.deliver(participant, &reward) {
                granted.push(reward);
            }
        }

        tracing::debug!(
            participant,
            tier,
            rank,
            multiplier,
            granted = granted.len(),
            pool = %pool.name,
            "Rewards rolled"
        );
        granted
    }

    /// Reward every participant ranked within the configured cutoff.
    pub fn distribute(&self, ledger: &FinalizedLedger, tier: u32) -> Vec<RewardOutcome> {
        if !self.settings.enabled {
            return Vec::new();
        }

        let outcomes: Vec<RewardOutcome> = ledger
            .ranking
            .iter()
            .take(self.settings.max_reward_ranks)
            .map(|entry| RewardOutcome {
                participant: entry.participant,
                rank: entry.rank,
                damage_percent: entry.percentage,
                rewards: self.give_rewards(entry.participant, tier, entry.rank, entry.percentage),
            })
            .collect();

        if self.settings.broadcast {
            for outcome in &outcomes {
                let labels: Vec<String> = outcome.rewards.iter().map(Reward::display_label).collect();
                tracing::info!(
                    boss_id = ledger.boss_id,
                    participant = outcome.participant,
                    rank = outcome.rank,
                    damage_percent = %format!("{:.1}%", outcome.damage_percent * 100.0),
                    rewards = %labels.join(", "),
                    "Rewards distributed"
                );
            }
        }
        outcomes
    }

    /// Hand a reward to its backend. Currency without a working backend is
    /// skipped silently; failed deliveries drop just that reward.
    fn deliver(&self, participant: ParticipantId, reward: &Reward) -> bool {
        if let RewardKind::Currency { amount } = reward.kind {
            if !self.settings.currency_enabled {
                return false;
            }
            let Some(currency) = &self.currency else {
                tracing::debug!(participant, "No currency backend, skipping currency reward");
                return false;
            };
            if !currency.deposit(participant, amount) {
                tracing::warn!(participant, amount, "Currency deposit failed");
                return false;
            }
            return true;
        }

        match &self.inventory {
            Some(inventory) => {
                let delivered = inventory.give(participant, &reward.kind);
                if !delivered {
                    tracing::warn!(participant, reward = %reward.display_label(), "Reward delivery failed");
                }
                delivered
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::RankingEntry;
    use crate::reward::RewardPool;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBank {
        deposits: Mutex<Vec<(ParticipantId, f64)>>,
        fail: bool,
    }

    impl CurrencyBackend for RecordingBank {
        fn deposit(&self, participant: ParticipantId, amount: f64) -> bool {
            if self.fail {
                return false;
            }
            self.deposits.lock().unwrap().push((participant, amount));
            true
        }
    }

    #[derive(Default)]
    struct RecordingInventory {
        given: Mutex<Vec<(ParticipantId, RewardKind)>>,
    }

    impl InventoryBackend for RecordingInventory {
        fn give(&self, participant: ParticipantId, reward: &RewardKind) -> bool {
            if matches!(reward, RewardKind::ExternalItem { .. }) {
                return false;
            }
            self.given.lock().unwrap().push((participant, reward.clone()));
            true
        }
    }

    fn make_catalog() -> RewardCatalog {
        let mut catalog = RewardCatalog::new();
        catalog.insert_pool(
            1,
            1,
            RewardPool {
                name: "first".to_string(),
                rank_multiplier: 2.0,
                rewards: vec![
                    Reward::guaranteed(RewardKind::Experience { amount: 100 }),
                    Reward::guaranteed(RewardKind::Item {
                        material: "DIAMOND".to_string(),
                        amount: 3,
                    }),
                    Reward::guaranteed(RewardKind::Command {
                        command: "title {participant} Slayer".to_string(),
                    }),
                ],
            },
        );
        catalog
    }

    fn make_engine(catalog: RewardCatalog) -> RewardEngine {
        RewardEngine::new(catalog, RewardSettings::default(), SharedRng::seeded(21))
    }

    fn experience(rewards: &[Reward]) -> Option<u64> {
        rewards.iter().find_map(|r| match r.kind {
            RewardKind::Experience { amount } => Some(amount),
            _ => None,
        })
    }

    #[test]
    fn test_full_contribution_scales_numeric_reward() {
        let engine = make_engine(make_catalog());
        let rewards = engine.give_rewards(7, 1, 1, 1.0);
        assert_eq!(experience(&rewards), Some(300));
    }

    #[test]
    fn test_zero_contribution_keeps_participation_floor() {
        let engine = make_engine(make_catalog());
        let rewards = engine.give_rewards(7, 1, 1, 0.0);
        assert_eq!(experience(&rewards), Some(100));
    }

    #[test]
    fn test_out_of_range_percent_is_clamped() {
        let engine = make_engine(make_catalog());
        assert_eq!(experience(&engine.give_rewards(7, 1, 1, 4.0)), Some(300));
        assert_eq!(experience(&engine.give_rewards(7, 1, 1, -1.0)), Some(100));
        assert_eq!(experience(&engine.give_rewards(7, 1, 1, f64::NAN)), Some(100));
    }

    #[test]
    fn test_non_numeric_rewards_are_not_scaled() {
        let engine = make_engine(make_catalog());
        let rewards = engine.give_rewards(42, 1, 1, 1.0);

        assert!(rewards.iter().any(|r| r.kind
            == RewardKind::Item {
                material: "DIAMOND".to_string(),
                amount: 3
            }));
        assert!(rewards.iter().any(|r| r.kind
            == RewardKind::Command {
                command: "title 42 Slayer".to_string()
            }));
    }

    #[test]
    fn test_zero_chance_never_triggers() {
        let mut catalog = RewardCatalog::new();
        catalog.insert_tier_fallback(
            1,
            Some(1.0),
            vec![Reward::new(RewardKind::Experience { amount: 10 }, 0.0)],
        );
        let engine = make_engine(catalog);
        for _ in 0..200 {
            assert!(engine.give_rewards(1, 1, 1, 0.5).is_empty());
        }
    }

    #[test]
    fn test_currency_skipped_without_backend() {
        let engine = make_engine(RewardCatalog::new());
        let rewards = engine.give_rewards(1, 2, 1, 1.0);

        assert_eq!(rewards.len(), 1);
        assert_eq!(experience(&rewards), Some(300));
    }

    #[test]
    fn test_currency_deposited_with_backend() {
        let bank = Arc::new(RecordingBank::default());
        let engine = make_engine(RewardCatalog::new()).with_currency(bank.clone());
        let rewards = engine.give_rewards(5, 2, 1, 0.0);

        assert_eq!(rewards.len(), 2);
        assert_eq!(*bank.deposits.lock().unwrap(), vec![(5, 200.0)]);
    }

    #[test]
    fn test_failed_delivery_drops_only_that_reward() {
        let bank = Arc::new(RecordingBank {
            fail: true,
            ..Default::default()
        });
        let inventory = Arc::new(RecordingInventory::default());
        let mut catalog = make_catalog();
        catalog.insert_tier_fallback(
            3,
            Some(1.0),
            vec![
                Reward::guaranteed(RewardKind::Currency { amount: 50.0 }),
                Reward::guaranteed(RewardKind::ExternalItem {
                    item_id: "relic".to_string(),
                    amount: 1,
                }),
                Reward::guaranteed(RewardKind::Item {
                    material: "GOLD".to_string(),
                    amount: 2,
                }),
            ],
        );
        let engine = make_engine(catalog)
            .with_currency(bank)
            .with_inventory(inventory.clone());

        let rewards = engine.give_rewards(9, 3, 4, 0.5);
        assert_eq!(rewards.len(), 1);
        assert_eq!(inventory.given.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_distribute_stops_at_rank_cutoff() {
        let settings = RewardSettings {
            max_reward_ranks: 2,
            ..RewardSettings::default()
        };
        let engine = RewardEngine::new(RewardCatalog::new(), settings, SharedRng::seeded(1));
        let ledger = FinalizedLedger {
            boss_id: 1,
            boss_type: None,
            total_damage: 100.0,
            total_hits: 3,
            ranking: (1..=3)
                .map(|rank| RankingEntry {
                    rank,
                    participant: rank as u64 * 10,
                    damage: 100.0 / 3.0,
                    hits: 1,
                    percentage: 1.0 / 3.0,
                })
                .collect(),
            opened_at: Utc::now(),
            finalized_at: Utc::now(),
        };

        let outcomes = engine.distribute(&ledger, 1);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].participant, 10);
        assert_eq!(outcomes[1].rank, 2);
        assert!(outcomes.iter().all(|o| !o.rewards.is_empty()));
    }

    #[test]
    fn test_disabled_rewards_give_nothing() {
        let settings = RewardSettings {
            enabled: false,
            ..RewardSettings::default()
        };
        let engine = RewardEngine::new(make_catalog(), settings, SharedRng::seeded(1));
        assert!(engine.give_rewards(1, 1, 1, 1.0).is_empty());
    }
}
