//! Tests for SpawnScheduler zone lifecycle and spawn bookkeeping

use bossfall_types::{SpawnSettings, WorldSettings, ZoneConfig};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::boss::{BossGenerator, TemplateCatalog};
use crate::location::LocationScorer;
use crate::rng::SharedRng;

use super::{
    OpenWorld, SpawnCondition, SpawnError, SpawnScheduler, SpawnZone, WorldService, ZoneObserver,
};

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

struct OnlyOverworld;

impl WorldService for OnlyOverworld {
    fn world_exists(&self, world: &str) -> bool {
        world == "overworld"
    }
}

/// Favorable conditions for every zone except those listed in `skip`.
struct FixedObserver {
    skip: Vec<&'static str>,
}

impl ZoneObserver for FixedObserver {
    fn observe(&self, zone: &SpawnZone, now: DateTime<Utc>) -> Option<SpawnCondition> {
        if self.skip.contains(&zone.id.as_str()) {
            return None;
        }
        Some(SpawnCondition::for_zone(zone, 4, 3.0, true, true, now))
    }
}

fn make_scheduler_with(base_rate: f64, world: Arc<dyn WorldService>) -> SpawnScheduler {
    let generator = Arc::new(BossGenerator::with_catalog(
        TemplateCatalog::with_defaults(),
        SharedRng::seeded(11),
    ));
    let scorer = Arc::new(LocationScorer::with_rng(64.0, SharedRng::seeded(12)));
    let spawn = SpawnSettings {
        base_rate,
        ..SpawnSettings::default()
    };
    SpawnScheduler::new(
        generator,
        scorer,
        world,
        &spawn,
        &WorldSettings::default(),
        SharedRng::seeded(13),
    )
}

/// Base rate high enough that every allowed roll succeeds.
fn make_scheduler() -> SpawnScheduler {
    make_scheduler_with(100.0, Arc::new(OpenWorld))
}

fn make_zone(id: &str, max_concurrent: u32) -> ZoneConfig {
    let mut zone = ZoneConfig::new(id, "overworld", 0.0, 64.0, 0.0);
    zone.max_concurrent_bosses = max_concurrent;
    zone
}

fn favorable(scheduler: &SpawnScheduler, zone_id: &str) -> SpawnCondition {
    let zone = scheduler.zone(zone_id).unwrap();
    SpawnCondition {
        // A fresh spawn resets the clock; pretend the cooldown already passed.
        seconds_since_last_spawn: 3600.0,
        ..SpawnCondition::for_zone(&zone, 12, 3.0, true, true, Utc::now())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Zone Administration
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicate_zone_is_rejected() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 1)).unwrap();

    let err = scheduler.create_zone(&make_zone("crypt", 2)).unwrap_err();
    assert!(matches!(err, SpawnError::DuplicateZone { .. }));
}

#[test]
fn test_unknown_world_is_rejected() {
    let scheduler = make_scheduler_with(1.0, Arc::new(OnlyOverworld));
    let mut zone = make_zone("hell", 1);
    zone.world = "nether".to_string();

    let err = scheduler.create_zone(&zone).unwrap_err();
    assert!(matches!(err, SpawnError::UnknownWorld { .. }));
    assert!(scheduler.zone("hell").is_none());
}

#[test]
fn test_inverted_bounds_are_rejected() {
    let scheduler = make_scheduler();
    let mut zone = make_zone("crypt", 1);
    zone.min_population = 8;
    zone.max_population = 2;

    let err = scheduler.create_zone(&zone).unwrap_err();
    assert!(matches!(err, SpawnError::InvalidZone { .. }));
}

// ═══════════════════════════════════════════════════════════════════════════
// Spawning
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_zone_never_spawns() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 1)).unwrap();

    let first = scheduler.try_spawn("crypt", &favorable(&scheduler, "crypt"));
    assert!(first.is_some());
    assert_eq!(scheduler.zone("crypt").unwrap().live_boss_count, 1);

    for _ in 0..100 {
        assert!(scheduler.try_spawn("crypt", &favorable(&scheduler, "crypt")).is_none());
    }
    assert_eq!(scheduler.zone("crypt").unwrap().live_boss_count, 1);
    assert_eq!(scheduler.stats().total_events, 1);
}

#[test]
fn test_zero_rate_zone_never_spawns() {
    let scheduler = make_scheduler_with(0.0, Arc::new(OpenWorld));
    scheduler.create_zone(&make_zone("crypt", 3)).unwrap();

    for _ in 0..100 {
        assert!(scheduler.try_spawn("crypt", &favorable(&scheduler, "crypt")).is_none());
    }
}

#[test]
fn test_spawn_event_is_populated() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 3)).unwrap();

    let event = scheduler
        .try_spawn("crypt", &favorable(&scheduler, "crypt"))
        .unwrap();
    assert!(event.active);
    assert_eq!(event.zone_id, "crypt");
    assert_eq!(event.boss_id, event.boss.id);
    assert_eq!(event.location.world, "overworld");
    // population 12 bumps the mid-power tier up by one
    assert_eq!(event.boss.tier, 4);
    assert!(event.metadata.contains_key("probability"));

    let zone = scheduler.zone("crypt").unwrap();
    assert!(zone.last_spawn_at.is_some());
    assert_eq!(scheduler.event_for_boss(event.boss_id).unwrap().id, event.id);
}

#[test]
fn test_unknown_zone_yields_nothing() {
    let scheduler = make_scheduler();
    let condition = SpawnCondition {
        population: 5,
        average_power: 3.0,
        seconds_since_last_spawn: 600.0,
        is_night: false,
        special_event: false,
        world: "overworld".to_string(),
    };
    assert!(scheduler.try_spawn("nowhere", &condition).is_none());
}

#[test]
fn test_tick_all_skips_unobserved_zones() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 3)).unwrap();
    scheduler.create_zone(&make_zone("swamp", 3)).unwrap();

    let observer = FixedObserver { skip: vec!["swamp"] };
    let events = scheduler.tick_all(&observer);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].zone_id, "crypt");
    assert_eq!(scheduler.zone("swamp").unwrap().live_boss_count, 0);
}

#[test]
fn test_tick_respects_cooldown_after_spawn() {
    // Unit base rate: the first tick saturates at 1.0 from the night and
    // event bonuses, the second is held near zero by the cooldown.
    let scheduler = make_scheduler_with(1.0, Arc::new(OpenWorld));
    scheduler.create_zone(&make_zone("crypt", 3)).unwrap();
    let observer = FixedObserver { skip: Vec::new() };

    assert_eq!(scheduler.tick_all(&observer).len(), 1);
    // The zone clock was just reset, so the time factor is ~0.
    assert!(scheduler.tick_all(&observer).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Death and Maintenance
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_death_is_recorded_once() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 1)).unwrap();
    let event = scheduler
        .try_spawn("crypt", &favorable(&scheduler, "crypt"))
        .unwrap();

    let finished = scheduler.record_boss_death(event.boss_id).unwrap();
    assert!(!finished.active);
    assert!(finished.ended_at.is_some());
    assert_eq!(scheduler.zone("crypt").unwrap().live_boss_count, 0);

    assert!(scheduler.record_boss_death(event.boss_id).is_none());
    assert_eq!(scheduler.zone("crypt").unwrap().live_boss_count, 0);
    assert!(scheduler.record_boss_death(9_999).is_none());

    // Slot is free again.
    assert!(scheduler.try_spawn("crypt", &favorable(&scheduler, "crypt")).is_some());
}

#[test]
fn test_death_in_removed_zone_still_resolves() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 1)).unwrap();
    let event = scheduler
        .try_spawn("crypt", &favorable(&scheduler, "crypt"))
        .unwrap();

    assert!(scheduler.remove_zone("crypt").is_some());
    assert!(scheduler.record_boss_death(event.boss_id).is_some());
}

#[test]
fn test_clear_history_keeps_active_events() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 3)).unwrap();
    let a = scheduler.try_spawn("crypt", &favorable(&scheduler, "crypt")).unwrap();
    let b = scheduler.try_spawn("crypt", &favorable(&scheduler, "crypt")).unwrap();
    scheduler.record_boss_death(a.boss_id);

    assert_eq!(scheduler.clear_history(), 1);
    assert!(scheduler.event(a.id).is_none());
    assert_eq!(scheduler.all_active_bosses().len(), 1);
    assert!(scheduler.record_boss_death(b.boss_id).is_some());
}

#[test]
fn test_stats_and_reset() {
    let scheduler = make_scheduler();
    scheduler.create_zone(&make_zone("crypt", 3)).unwrap();
    scheduler.create_zone(&make_zone("swamp", 3)).unwrap();
    let a = scheduler.try_spawn("crypt", &favorable(&scheduler, "crypt")).unwrap();
    scheduler.try_spawn("swamp", &favorable(&scheduler, "swamp")).unwrap();
    scheduler.record_boss_death(a.boss_id);

    let stats = scheduler.stats();
    assert_eq!(stats.zones, 2);
    assert_eq!(stats.active_bosses, 1);
    assert_eq!(stats.total_events, 2);
    assert_eq!(stats.bosses_per_zone["crypt"], 0);
    assert_eq!(stats.bosses_per_zone["swamp"], 1);
    assert!(stats.average_lifetime_secs.is_some());

    scheduler.reset();
    let stats = scheduler.stats();
    assert_eq!(stats.total_events, 0);
    assert_eq!(stats.bosses_per_zone["swamp"], 0);
    assert!(scheduler.active_bosses("swamp").is_empty());
}

/// Snaps every placement to a fixed height.
struct SnapToGround;

impl WorldService for SnapToGround {
    fn world_exists(&self, _world: &str) -> bool {
        true
    }

    fn materialize(&self, mut location: crate::location::Location) -> crate::location::Location {
        location.y = 70.0;
        location
    }
}

#[test]
fn test_death_releases_materialized_location() {
    let generator = Arc::new(BossGenerator::with_catalog(
        TemplateCatalog::with_defaults(),
        SharedRng::seeded(21),
    ));
    let scorer = Arc::new(LocationScorer::with_rng(64.0, SharedRng::seeded(22)));
    let scheduler = SpawnScheduler::new(
        generator,
        Arc::clone(&scorer),
        Arc::new(SnapToGround),
        &SpawnSettings {
            base_rate: 100.0,
            ..SpawnSettings::default()
        },
        &WorldSettings::default(),
        SharedRng::seeded(23),
    );
    scheduler.create_zone(&make_zone("crypt", 2)).unwrap();

    let event = scheduler
        .try_spawn("crypt", &favorable(&scheduler, "crypt"))
        .unwrap();
    assert_eq!(event.location.y, 70.0);
    if event.metadata["fallback_location"] == "false" {
        assert!(scorer.is_occupied(&event.location));
    }

    scheduler.record_boss_death(event.boss_id).unwrap();
    assert_eq!(scorer.occupied_count(), 0);
}

#[test]
fn test_placement_property_uses_themed_band() {
    let scheduler = make_scheduler();
    let mut zone = make_zone("sky", 2);
    zone.properties
        .insert(super::PLACEMENT_PROPERTY.to_string(), "floating_island".to_string());
    scheduler.create_zone(&zone).unwrap();

    let event = scheduler.try_spawn("sky", &favorable(&scheduler, "sky")).unwrap();
    assert!((150.0..=250.0).contains(&event.location.y));
    assert_eq!(event.metadata["location_score"], "60");
}

#[test]
fn test_placement_area_stays_inside_world_border() {
    let bounds = WorldSettings {
        width: 200.0,
        ..WorldSettings::default()
    };

    // radius 100 around x = 60 would reach x = 160, past the border at 100
    let edge = SpawnZone::from_config(&ZoneConfig::new("edge", "overworld", 60.0, 64.0, -20.0));
    let area = edge.placement_area(&bounds);
    assert_eq!(area.half_width, 40.0);
    assert_eq!(area.max_y, bounds.height);

    let inside = SpawnZone::from_config(&ZoneConfig::new("mid", "overworld", 0.0, 64.0, 0.0));
    assert_eq!(inside.placement_area(&WorldSettings::default()).half_width, 100.0);

    let outside = SpawnZone::from_config(&ZoneConfig::new("far", "overworld", 500.0, 64.0, 0.0));
    assert_eq!(outside.placement_area(&bounds).half_width, 0.0);
}
