use bossfall_types::{SpawnSettings, WorldSettings, ZoneConfig};
use chrono::Utc;
use hashbrown::HashMap;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::{
    SpawnCondition, SpawnError, SpawnEvent, SpawnZone, WorldService, ZoneObserver,
    compute_probability, resolve_tier,
};
use crate::boss::{BossGenerator, BossId};
use crate::location::LocationScorer;
use crate::rng::SharedRng;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStats {
    pub zones: usize,
    pub active_bosses: usize,
    pub total_events: usize,
    pub bosses_per_zone: BTreeMap<String, u32>,
    /// Mean lifetime of finished encounters, if any have finished.
    pub average_lifetime_secs: Option<f64>,
}

#[derive(Debug, Default)]
struct EventLog {
    events: HashMap<u64, SpawnEvent>,
    by_boss: HashMap<BossId, u64>,
}

/// Owns the zones and the spawn history.
///
/// Each zone sits behind its own mutex so a spawn decision (probability,
/// roll, counter update) is serialized per zone. The event log lock is
/// never taken while a caller still needs a zone lock afterwards.
pub struct SpawnScheduler {
    zones: RwLock<HashMap<String, Arc<Mutex<SpawnZone>>>>,
    log: Mutex<EventLog>,
    generator: Arc<BossGenerator>,
    scorer: Arc<LocationScorer>,
    world: Arc<dyn WorldService>,
    base_rate: f64,
    location_attempts: u32,
    bounds: WorldSettings,
    rng: SharedRng,
    next_event_id: AtomicU64,
}

impl SpawnScheduler {
    pub fn new(
        generator: Arc<BossGenerator>,
        scorer: Arc<LocationScorer>,
        world: Arc<dyn WorldService>,
        spawn: &SpawnSettings,
        world_settings: &WorldSettings,
        rng: SharedRng,
    ) -> Self {
        Self {
            zones: RwLock::new(HashMap::new()),
            log: Mutex::new(EventLog::default()),
            generator,
            scorer,
            world,
            base_rate: spawn.base_rate,
            location_attempts: spawn.location_attempts,
            bounds: world_settings.clone(),
            rng,
            next_event_id: AtomicU64::new(1),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Zone Administration
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_zone(&self, config: &ZoneConfig) -> Result<(), SpawnError> {
        validate_zone(config)?;
        if !self.world.world_exists(&config.world) {
            return Err(SpawnError::UnknownWorld {
                id: config.id.clone(),
                world: config.world.clone(),
            });
        }

        let mut zones = self.zones.write().unwrap_or_else(|e| e.into_inner());
        if zones.contains_key(&config.id) {
            return Err(SpawnError::DuplicateZone {
                id: config.id.clone(),
            });
        }
        zones.insert(
            config.id.clone(),
            Arc::new(Mutex::new(SpawnZone::from_config(config))),
        );

        tracing::info!(zone = %config.id, world = %config.world, "Spawn zone created");
        Ok(())
    }

    /// Remove a zone. Bosses it spawned stay in the history and can still
    /// be resolved.
    pub fn remove_zone(&self, zone_id: &str) -> Option<SpawnZone> {
        let removed = self
            .zones
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(zone_id)?;
        tracing::info!(zone = %zone_id, "Spawn zone removed");
        Some(lock_zone(&removed).clone())
    }

    /// Snapshot of one zone.
    pub fn zone(&self, zone_id: &str) -> Option<SpawnZone> {
        self.zone_handle(zone_id).map(|z| lock_zone(&z).clone())
    }

    /// Snapshots of every zone, ordered by id.
    pub fn zones(&self) -> Vec<SpawnZone> {
        let mut zones: Vec<SpawnZone> = self
            .zone_handles()
            .iter()
            .map(|z| lock_zone(z).clone())
            .collect();
        zones.sort_by(|a, b| a.id.cmp(&b.id));
        zones
    }

    fn zone_handle(&self, zone_id: &str) -> Option<Arc<Mutex<SpawnZone>>> {
        self.zones
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(zone_id)
            .cloned()
    }

    fn zone_handles(&self) -> Vec<Arc<Mutex<SpawnZone>>> {
        self.zones
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Spawning
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluate one zone. Returns the spawn event if the roll succeeded.
    pub fn try_spawn(&self, zone_id: &str, condition: &SpawnCondition) -> Option<SpawnEvent> {
        let handle = self.zone_handle(zone_id)?;
        let mut zone = lock_zone(&handle);

        let probability = compute_probability(&zone, condition, self.base_rate);
        let roll = self.rng.with(|rng| rng.random::<f64>());
        tracing::debug!(zone = %zone.id, probability, roll, "Spawn roll");
        if roll >= probability {
            return None;
        }

        let tier = resolve_tier(&zone, condition);
        let boss = self.generator.generate_random_boss(tier);
        let area = zone.placement_area(&self.bounds);
        let placed = match zone.placement_kind() {
            Some(kind) => self.scorer.generate_themed_location(&area, kind),
            None => self
                .scorer
                .generate_safe_location(&area, self.location_attempts),
        };
        let location = self.world.materialize(placed.location.clone());
        if !placed.fallback && location != placed.location {
            self.scorer.free(&placed.location);
            self.scorer.mark_occupied(&location);
        }

        let now = Utc::now();
        zone.live_boss_count += 1;
        zone.last_spawn_at = Some(now);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("probability".to_string(), format!("{probability:.4}"));
        metadata.insert("location_score".to_string(), placed.score.to_string());
        metadata.insert("fallback_location".to_string(), placed.fallback.to_string());
        metadata.insert("population".to_string(), condition.population.to_string());

        let event = SpawnEvent {
            id: self.next_event_id.fetch_add(1, Ordering::Relaxed),
            zone_id: zone.id.clone(),
            boss_id: boss.id,
            boss,
            location,
            spawned_at: now,
            ended_at: None,
            active: true,
            metadata,
        };

        tracing::info!(
            zone = %zone.id,
            boss_id = event.boss_id,
            template = %event.boss.template.id,
            tier = event.boss.tier,
            live = zone.live_boss_count,
            "Boss spawned"
        );

        let mut log = self.lock_log();
        log.by_boss.insert(event.boss_id, event.id);
        log.events.insert(event.id, event.clone());
        Some(event)
    }

    /// Evaluate every zone once, in id order. Zones the observer skips are
    /// left untouched.
    pub fn tick_all(&self, observer: &dyn ZoneObserver) -> Vec<SpawnEvent> {
        let now = Utc::now();
        self.zones()
            .iter()
            .filter_map(|zone| {
                let condition = observer.observe(zone, now)?;
                self.try_spawn(&zone.id, &condition)
            })
            .collect()
    }

    /// Mark the boss's spawn event inactive and release its zone slot and
    /// location. Returns the finished event the first time; later calls return `None`.
    pub fn record_boss_death(&self, boss_id: BossId) -> Option<SpawnEvent> {
        let finished = {
            let mut log = self.lock_log();
            let event_id = *log.by_boss.get(&boss_id)?;
            let event = log.events.get_mut(&event_id)?;
            if !event.active {
                tracing::debug!(boss_id, "Boss already resolved, ignoring");
                return None;
            }
            event.active = false;
            event.ended_at = Some(Utc::now());
            event.clone()
        };

        self.scorer.free(&finished.location);
        match self.zone_handle(&finished.zone_id) {
            Some(handle) => {
                let mut zone = lock_zone(&handle);
                zone.live_boss_count = zone.live_boss_count.saturating_sub(1);
                tracing::info!(
                    zone = %zone.id,
                    boss_id,
                    live = zone.live_boss_count,
                    "Boss encounter ended"
                );
            }
            None => {
                tracing::debug!(zone = %finished.zone_id, boss_id, "Boss ended in removed zone");
            }
        }

        Some(finished)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn event(&self, event_id: u64) -> Option<SpawnEvent> {
        self.lock_log().events.get(&event_id).cloned()
    }

    pub fn event_for_boss(&self, boss_id: BossId) -> Option<SpawnEvent> {
        let log = self.lock_log();
        let event_id = log.by_boss.get(&boss_id)?;
        log.events.get(event_id).cloned()
    }

    pub fn active_bosses(&self, zone_id: &str) -> Vec<SpawnEvent> {
        self.collect_events(|e| e.active && e.zone_id == zone_id)
    }

    pub fn all_active_bosses(&self) -> Vec<SpawnEvent> {
        self.collect_events(|e| e.active)
    }

    fn collect_events(&self, filter: impl Fn(&SpawnEvent) -> bool) -> Vec<SpawnEvent> {
        let log = self.lock_log();
        let mut events: Vec<SpawnEvent> = log.events.values().filter(|e| filter(e)).cloned().collect();
        events.sort_by_key(|e| e.id);
        events
    }

    pub fn stats(&self) -> SchedulerStats {
        let zones = self.zones();
        let bosses_per_zone = zones
            .iter()
            .map(|z| (z.id.clone(), z.live_boss_count))
            .collect();

        let log = self.lock_log();
        let lifetimes: Vec<f64> = log
            .events
            .values()
            .filter_map(SpawnEvent::lifetime_secs)
            .collect();
        let average_lifetime_secs = if lifetimes.is_empty() {
            None
        } else {
            Some(lifetimes.iter().sum::<f64>() / lifetimes.len() as f64)
        };

        SchedulerStats {
            zones: zones.len(),
            active_bosses: log.events.values().filter(|e| e.active).count(),
            total_events: log.events.len(),
            bosses_per_zone,
            average_lifetime_secs,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop finished events. Active ones are kept so they can still resolve.
    pub fn clear_history(&self) -> usize {
        let mut log = self.lock_log();
        let before = log.events.len();
        log.events.retain(|_, e| e.active);
        let EventLog { events, by_boss } = &mut *log;
        by_boss.retain(|_, id| events.contains_key(id));
        before - log.events.len()
    }

    /// Forget every boss: zero all zone counters, drop the history and free
    /// all occupied positions.
    pub fn reset(&self) {
        for handle in self.zone_handles() {
            let mut zone = lock_zone(&handle);
            zone.live_boss_count = 0;
            zone.last_spawn_at = None;
        }
        let mut log = self.lock_log();
        log.events.clear();
        log.by_boss.clear();
        self.scorer.clear_occupied();
        tracing::info!("Spawn scheduler reset");
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, EventLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn lock_zone(zone: &Mutex<SpawnZone>) -> std::sync::MutexGuard<'_, SpawnZone> {
    zone.lock().unwrap_or_else(|e| e.into_inner())
}

fn validate_zone(config: &ZoneConfig) -> Result<(), SpawnError> {
    let invalid = |reason: &str| {
        Err(SpawnError::InvalidZone {
            id: config.id.clone(),
            reason: reason.to_string(),
        })
    };

    if config.id.trim().is_empty() {
        return invalid("empty id");
    }
    if config.min_population > config.max_population {
        return invalid("min_population exceeds max_population");
    }
    if !(config.min_power.is_finite() && config.max_power.is_finite())
        || config.min_power > config.max_power
    {
        return invalid("power bounds must be finite with min <= max");
    }
    if !config.radius.is_finite() || config.radius <= 0.0 {
        return invalid("radius must be positive");
    }
    if !config.spawn_rate.is_finite() || config.spawn_rate < 0.0 {
        return invalid("spawn_rate must be non-negative");
    }
    Ok(())
}
