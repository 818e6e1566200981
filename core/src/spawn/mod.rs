//! Probabilistic spawn scheduling
//!
//! Zones are owned by the [`SpawnScheduler`]. Each tick an external driver
//! hands in a [`SpawnCondition`] per zone; the scheduler computes a spawn
//! probability, rolls it, and on success generates a boss and a placement.

mod error;
mod probability;
mod scheduler;

#[cfg(test)]
mod scheduler_tests;

pub use error::SpawnError;
pub use probability::{compute_probability, resolve_tier};
pub use scheduler::{SchedulerStats, SpawnScheduler};

use bossfall_types::{WorldSettings, ZoneConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::boss::{BossId, GeneratedBoss};
use crate::location::{Location, LocationKind, PlacementArea};

/// Zone property selecting a themed placement (`arena`, `platform`, `cave`,
/// `floating_island`).
pub const PLACEMENT_PROPERTY: &str = "placement";

// ═══════════════════════════════════════════════════════════════════════════
// Zones
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnZone {
    pub id: String,
    pub center: Location,
    pub radius: f64,
    pub min_population: u32,
    pub max_population: u32,
    pub min_power: f64,
    pub max_power: f64,
    pub spawn_rate: f64,
    pub max_concurrent_bosses: u32,
    pub live_boss_count: u32,
    pub last_spawn_at: Option<DateTime<Utc>>,
    pub properties: HashMap<String, String>,
}

impl SpawnZone {
    pub fn from_config(config: &ZoneConfig) -> Self {
        Self {
            id: config.id.clone(),
            center: Location::new(config.world.clone(), config.x, config.y, config.z),
            radius: config.radius,
            min_population: config.min_population,
            max_population: config.max_population,
            min_power: config.min_power,
            max_power: config.max_power,
            spawn_rate: config.spawn_rate,
            max_concurrent_bosses: config.max_concurrent_bosses,
            live_boss_count: 0,
            last_spawn_at: None,
            properties: config.properties.clone(),
        }
    }

    pub fn world(&self) -> &str {
        &self.center.world
    }

    pub fn can_spawn(&self) -> bool {
        self.live_boss_count < self.max_concurrent_bosses
    }

    /// Seconds since the last spawn; infinite if the zone never spawned.
    pub fn seconds_since_last_spawn(&self, now: DateTime<Utc>) -> f64 {
        match self.last_spawn_at {
            Some(at) => (now - at).num_milliseconds() as f64 / 1000.0,
            None => f64::INFINITY,
        }
    }

    /// Themed placement requested through the `placement` property.
    pub fn placement_kind(&self) -> Option<LocationKind> {
        let name = self.properties.get(PLACEMENT_PROPERTY)?;
        let kind = LocationKind::from_name(name);
        if kind.is_none() {
            tracing::warn!(zone = %self.id, placement = %name, "Unknown placement kind, using random placement");
        }
        kind
    }

    /// Square placement area around the zone center spanning the full
    /// vertical range of the world.
    /// The zone's square placement area, cut back so it stays inside the
    /// world border (`width` wide, centered on the origin).
    pub fn placement_area(&self, bounds: &WorldSettings) -> PlacementArea {
        let border = bounds.width / 2.0;
        let room = (border - self.center.x.abs()).min(border - self.center.z.abs());
        PlacementArea {
            world: self.center.world.clone(),
            center_x: self.center.x,
            center_z: self.center.z,
            half_width: self.radius.min(room).max(0.0),
            min_y: 0.0,
            max_y: bounds.height,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Conditions
// ═══════════════════════════════════════════════════════════════════════════

/// Environment snapshot for one zone at one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnCondition {
    pub population: u32,
    pub average_power: f64,
    pub seconds_since_last_spawn: f64,
    pub is_night: bool,
    pub special_event: bool,
    pub world: String,
}

impl SpawnCondition {
    pub fn for_zone(
        zone: &SpawnZone,
        population: u32,
        average_power: f64,
        is_night: bool,
        special_event: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            population,
            average_power,
            seconds_since_last_spawn: zone.seconds_since_last_spawn(now),
            is_night,
            special_event,
            world: zone.world().to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════════════════════

/// Record of one spawn. Goes inactive exactly once, on death or despawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnEvent {
    pub id: u64,
    pub zone_id: String,
    pub boss_id: BossId,
    pub boss: GeneratedBoss,
    pub location: Location,
    pub spawned_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub metadata: HashMap<String, String>,
}

impl SpawnEvent {
    pub fn lifetime_secs(&self) -> Option<f64> {
        self.ended_at
            .map(|end| (end - self.spawned_at).num_milliseconds() as f64 / 1000.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Collaborators
// ═══════════════════════════════════════════════════════════════════════════

/// Hosting environment: validates worlds and turns abstract coordinates
/// into real positions.
pub trait WorldService: Send + Sync {
    fn world_exists(&self, world: &str) -> bool;

    /// Adjust a placement to the hosting environment (snap to terrain, etc).
    fn materialize(&self, location: Location) -> Location {
        location
    }
}

/// Accepts every world and leaves placements untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenWorld;

impl WorldService for OpenWorld {
    fn world_exists(&self, _world: &str) -> bool {
        true
    }
}

/// Supplies the per-tick environment for each zone. Returning `None` skips
/// the zone for this tick.
pub trait ZoneObserver {
    fn observe(&self, zone: &SpawnZone, now: DateTime<Utc>) -> Option<SpawnCondition>;
}
