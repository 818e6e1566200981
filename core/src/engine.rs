//! Composition root
//!
//! [`BossEngine`] wires the generator, location scorer, spawn scheduler,
//! damage ledger and reward engine together. Every collaborator is passed in
//! or built from [`EngineConfig`]; nothing is global.
//!
//! A boss ends exactly once. `boss_killed` and `boss_despawned` both start by
//! finalizing the ledger, and only the caller that wins that race goes on to
//! release the zone slot (and, for kills, hand out rewards).

use bossfall_types::{EngineConfig, SpawnSettings};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::boss::{BossGenerator, BossId, CatalogStats, TemplateCatalog};
use crate::catalog::{CatalogError, load_rewards, load_templates};
use crate::damage::{DamageLedger, FinalizedLedger, ParticipantId, RankingEntry};
use crate::location::LocationScorer;
use crate::reward::{CurrencyBackend, InventoryBackend, RewardCatalog, RewardEngine, RewardOutcome};
use crate::rng::SharedRng;
use crate::spawn::{
    SchedulerStats, SpawnCondition, SpawnError, SpawnEvent, SpawnScheduler, WorldService,
    ZoneObserver,
};
use crate::storage::EncounterStore;

/// How a boss encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Killed,
    Despawned,
}

/// Everything produced when a boss encounter ends.
#[derive(Debug, Clone, Serialize)]
pub struct EncounterOutcome {
    pub resolution: Resolution,
    pub ledger: FinalizedLedger,
    /// `None` if the boss was never spawned through the scheduler.
    pub event: Option<SpawnEvent>,
    pub rewards: Vec<RewardOutcome>,
}

#[derive(Debug, Clone)]
pub struct EngineStats {
    pub scheduler: SchedulerStats,
    pub catalog: CatalogStats,
    pub reward_pools: usize,
    pub tracked_ledgers: usize,
    pub finalized_encounters: usize,
    pub occupied_locations: usize,
}

/// Sizes of the catalogs swapped in by a reload. `None` means the file is
/// not configured or its contents were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub templates: Option<usize>,
    pub reward_pools: Option<usize>,
}

pub struct BossEngine {
    config: EngineConfig,
    generator: Arc<BossGenerator>,
    scorer: Arc<LocationScorer>,
    scheduler: SpawnScheduler,
    ledger: DamageLedger,
    rewards: RewardEngine,
}

impl BossEngine {
    /// Build an engine with entropy-seeded randomness.
    pub fn new(config: EngineConfig, world: Arc<dyn WorldService>) -> Self {
        Self::build(config, world, |_| SharedRng::from_entropy())
    }

    /// Build an engine whose random streams derive from `seed`.
    pub fn with_seed(config: EngineConfig, world: Arc<dyn WorldService>, seed: u64) -> Self {
        Self::build(config, world, |stream| {
            SharedRng::seeded(seed.wrapping_add(stream))
        })
    }

    fn build(
        config: EngineConfig,
        world: Arc<dyn WorldService>,
        rng: impl Fn(u64) -> SharedRng,
    ) -> Self {
        let templates = initial_templates(config.catalog.templates_path.as_ref());
        let reward_catalog = initial_rewards(config.catalog.rewards_path.as_ref());

        let generator = Arc::new(BossGenerator::with_catalog(templates, rng(0)));
        let scorer = Arc::new(LocationScorer::with_rng(config.world.spawn_floor, rng(1)));
        let scheduler = SpawnScheduler::new(
            Arc::clone(&generator),
            Arc::clone(&scorer),
            world,
            &config.spawn,
            &config.world,
            rng(2),
        );
        let rewards = RewardEngine::new(reward_catalog, config.rewards.clone(), rng(3));
        let ledger = DamageLedger::with_history_limit(config.ledger.history_limit);

        for zone in &config.zones {
            if let Err(e) = scheduler.create_zone(zone) {
                tracing::warn!(zone = %zone.id, error = %e, "Skipping configured zone");
            }
        }

        tracing::info!(
            zones = scheduler.zones().len(),
            templates = generator.catalog().len(),
            reward_pools = rewards.catalog().pool_count(),
            "Boss engine ready"
        );

        Self {
            config,
            generator,
            scorer,
            scheduler,
            ledger,
            rewards,
        }
    }

    pub fn with_currency(mut self, backend: Arc<dyn CurrencyBackend>) -> Self {
        self.rewards = self.rewards.with_currency(backend);
        self
    }

    pub fn with_inventory(mut self, backend: Arc<dyn InventoryBackend>) -> Self {
        self.rewards = self.rewards.with_inventory(backend);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn spawn_settings(&self) -> &SpawnSettings {
        &self.config.spawn
    }

    pub fn generator(&self) -> &BossGenerator {
        &self.generator
    }

    pub fn scorer(&self) -> &LocationScorer {
        &self.scorer
    }

    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    pub fn ledger(&self) -> &DamageLedger {
        &self.ledger
    }

    pub fn rewards(&self) -> &RewardEngine {
        &self.rewards
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Spawning
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_zone(&self, zone: &bossfall_types::ZoneConfig) -> Result<(), SpawnError> {
        self.scheduler.create_zone(zone)
    }

    /// Run one scheduler pass and open a ledger for every new boss.
    pub fn tick_all(&self, observer: &dyn ZoneObserver) -> Vec<SpawnEvent> {
        let events = self.scheduler.tick_all(observer);
        for event in &events {
            self.open_ledger(event);
        }
        events
    }

    pub fn try_spawn(&self, zone_id: &str, condition: &SpawnCondition) -> Option<SpawnEvent> {
        let event = self.scheduler.try_spawn(zone_id, condition)?;
        self.open_ledger(&event);
        Some(event)
    }

    fn open_ledger(&self, event: &SpawnEvent) {
        self.ledger
            .open_ledger(event.boss_id, &event.boss.template.id);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Combat
    // ─────────────────────────────────────────────────────────────────────────

    pub fn record_damage(&self, boss_id: BossId, participant: ParticipantId, amount: f64) -> bool {
        self.ledger.record_damage(boss_id, participant, amount)
    }

    /// Ranking capped at the configured `top_damagers`.
    pub fn top_damagers(&self, boss_id: BossId) -> Vec<RankingEntry> {
        self.ledger
            .get_damage_ranking(boss_id, self.config.ledger.top_damagers)
    }

    /// Finalize, release the zone slot and distribute rewards by the boss's
    /// tier. `None` if the encounter already ended or was never tracked.
    pub fn boss_killed(&self, boss_id: BossId) -> Option<EncounterOutcome> {
        self.end_encounter(boss_id, Resolution::Killed)
    }

    /// Finalize and release the zone slot without rewards.
    pub fn boss_despawned(&self, boss_id: BossId) -> Option<EncounterOutcome> {
        self.end_encounter(boss_id, Resolution::Despawned)
    }

    fn end_encounter(&self, boss_id: BossId, resolution: Resolution) -> Option<EncounterOutcome> {
        let ledger = match self.ledger.finalize_boss_damage(boss_id) {
            Some(ledger) => ledger,
            None => self.close_untracked(boss_id)?,
        };
        let event = self.scheduler.record_boss_death(boss_id);

        let rewards = match (resolution, &event) {
            (Resolution::Killed, Some(event)) => self.rewards.distribute(&ledger, event.boss.tier),
            (Resolution::Killed, None) => {
                tracing::debug!(boss_id, "Killed boss has no spawn record, using tier 1");
                self.rewards.distribute(&ledger, 1)
            }
            (Resolution::Despawned, _) => Vec::new(),
        };

        tracing::info!(
            boss_id,
            resolution = ?resolution,
            participants = ledger.participant_count(),
            rewarded = rewards.len(),
            "Boss encounter resolved"
        );
        Some(EncounterOutcome {
            resolution,
            ledger,
            event,
            rewards,
        })
    }

    /// A live boss whose ledger was never opened or was cleared still holds a
    /// zone slot. Close it with an empty ledger so the slot is released.
    fn close_untracked(&self, boss_id: BossId) -> Option<FinalizedLedger> {
        let event = self
            .scheduler
            .event_for_boss(boss_id)
            .filter(|event| event.active)?;
        tracing::warn!(boss_id, zone = %event.zone_id, "Live boss has no damage ledger, closing it empty");
        self.ledger.open_ledger(boss_id, &event.boss.template.id);
        self.ledger.finalize_boss_damage(boss_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalogs
    // ─────────────────────────────────────────────────────────────────────────

    /// Paths of the configured catalog files, for the watcher.
    pub fn catalog_paths(&self) -> Vec<PathBuf> {
        let catalog = &self.config.catalog;
        [&catalog.templates_path, &catalog.rewards_path]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Re-read both catalog files. Nothing is swapped unless every configured
    /// file parses.
    pub fn reload_catalogs(&self) -> Result<ReloadSummary, CatalogError> {
        let catalog = &self.config.catalog;
        let templates = catalog
            .templates_path
            .as_deref()
            .map(load_templates)
            .transpose()?;
        let rewards = catalog
            .rewards_path
            .as_deref()
            .map(load_rewards)
            .transpose()?;

        let mut summary = ReloadSummary::default();
        if let Some(templates) = templates {
            let count = templates.len();
            if self.generator.replace_catalog(templates) {
                summary.templates = Some(count);
            }
        }
        if let Some(rewards) = rewards {
            summary.reward_pools = Some(rewards.pool_count());
            self.rewards.replace_catalog(rewards);
        }
        Ok(summary)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            scheduler: self.scheduler.stats(),
            catalog: self.generator.stats(),
            reward_pools: self.rewards.catalog().pool_count(),
            tracked_ledgers: self.ledger.tracked_bosses().len(),
            finalized_encounters: self.ledger.history().count().unwrap_or(0),
            occupied_locations: self.scorer.occupied_count(),
        }
    }

    /// Drop every zone counter, spawn record, live ledger and occupancy mark.
    /// Zones themselves and finalized history are kept.
    pub fn reset(&self) {
        self.scheduler.reset();
        self.ledger.clear_all();
        tracing::info!("Boss engine reset");
    }
}

fn initial_templates(path: Option<&PathBuf>) -> TemplateCatalog {
    let Some(path) = path else {
        return TemplateCatalog::with_defaults();
    };
    match load_templates(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Template catalog unusable, using built-in templates");
            TemplateCatalog::with_defaults()
        }
    }
}

fn initial_rewards(path: Option<&PathBuf>) -> RewardCatalog {
    let Some(path) = path else {
        return RewardCatalog::new();
    };
    match load_rewards(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Reward catalog unusable, using default pools");
            RewardCatalog::new()
        }
    }
}
