//! Shared configuration types for bossfall
//!
//! This crate contains the serializable configuration and catalog file types
//! shared between the engine (bossfall-core) and its front ends. Everything
//! here is plain data; validation and conversion into runtime types happens
//! in the core loaders.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Rarity
// ─────────────────────────────────────────────────────────────────────────────

/// Boss rarity, ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    /// Base spawn probability. The five values sum to 1.0.
    pub fn base_probability(self) -> f64 {
        match self {
            Rarity::Common => 0.5,
            Rarity::Uncommon => 0.3,
            Rarity::Rare => 0.15,
            Rarity::Epic => 0.04,
            Rarity::Legendary => 0.01,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "common" => Some(Rarity::Common),
            "uncommon" => Some(Rarity::Uncommon),
            "rare" => Some(Rarity::Rare),
            "epic" => Some(Rarity::Epic),
            "legendary" => Some(Rarity::Legendary),
            _ => None,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde Default Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_one_f64() -> f64 {
    1.0
}
fn default_one_i64() -> i64 {
    1
}
fn default_min_tier() -> i32 {
    1
}
fn default_max_tier() -> i32 {
    5
}
fn default_tick_interval() -> u64 {
    60
}
fn default_location_attempts() -> u32 {
    5
}
fn default_world_width() -> f64 {
    2000.0
}
fn default_world_height() -> f64 {
    320.0
}
fn default_spawn_floor() -> f64 {
    64.0
}
fn default_max_reward_ranks() -> usize {
    10
}
fn default_top_damagers() -> usize {
    10
}
fn default_history_limit() -> usize {
    1000
}
fn default_zone_radius() -> f64 {
    100.0
}
fn default_max_population() -> u32 {
    10
}
fn default_max_power() -> f64 {
    5.0
}
fn default_zone_spawn_rate() -> f64 {
    0.5
}
fn default_max_concurrent() -> u32 {
    3
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Config
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level engine configuration, persisted with confy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub spawn: SpawnSettings,
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub rewards: RewardSettings,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    /// Zones registered when the engine starts.
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnSettings {
    /// Global multiplier applied on top of each zone's own rate.
    #[serde(default = "default_one_f64")]
    pub base_rate: f64,
    /// Seconds between ticks of the external clock driver.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Random placement candidates tried before falling back to the zone center.
    #[serde(default = "default_location_attempts")]
    pub location_attempts: u32,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            base_rate: 1.0,
            tick_interval_secs: default_tick_interval(),
            location_attempts: default_location_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default = "default_world_width")]
    pub width: f64,
    #[serde(default = "default_world_height")]
    pub height: f64,
    /// Lowest vertical coordinate a random placement may use.
    #[serde(default = "default_spawn_floor")]
    pub spawn_floor: f64,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            width: default_world_width(),
            height: default_world_height(),
            spawn_floor: default_spawn_floor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub currency_enabled: bool,
    /// Announce distributed rewards to participants.
    #[serde(default = "default_true")]
    pub broadcast: bool,
    /// Participants ranked below this cutoff receive nothing.
    #[serde(default = "default_max_reward_ranks")]
    pub max_reward_ranks: usize,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            currency_enabled: true,
            broadcast: true,
            max_reward_ranks: default_max_reward_ranks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default = "default_top_damagers")]
    pub top_damagers: usize,
    /// Finalized ledgers kept in memory. Older ones are only in the
    /// encounter history file.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            top_damagers: default_top_damagers(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default)]
    pub templates_path: Option<PathBuf>,
    #[serde(default)]
    pub rewards_path: Option<PathBuf>,
    /// Reload catalogs when their files change on disk.
    #[serde(default)]
    pub watch: bool,
    /// Append finalized encounters to this JSON-lines file.
    #[serde(default)]
    pub history_path: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Zones
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: String,
    pub world: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default = "default_spawn_floor")]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "default_zone_radius")]
    pub radius: f64,
    #[serde(default = "default_one_u32")]
    pub min_population: u32,
    #[serde(default = "default_max_population")]
    pub max_population: u32,
    #[serde(default = "default_one_f64")]
    pub min_power: f64,
    #[serde(default = "default_max_power")]
    pub max_power: f64,
    #[serde(default = "default_zone_spawn_rate")]
    pub spawn_rate: f64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_bosses: u32,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

fn default_one_u32() -> u32 {
    1
}

impl ZoneConfig {
    /// Zone with the stock population, power and rate settings.
    pub fn new(id: impl Into<String>, world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: id.into(),
            world: world.into(),
            x,
            y,
            z,
            radius: default_zone_radius(),
            min_population: 1,
            max_population: default_max_population(),
            min_power: 1.0,
            max_power: default_max_power(),
            spawn_rate: default_zone_spawn_rate(),
            max_concurrent_bosses: default_max_concurrent(),
            properties: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Boss Template Catalog File
// ─────────────────────────────────────────────────────────────────────────────

/// One `[[template]]` table of a templates TOML file. The loader converts
/// each table on its own so a malformed entry only costs that entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub rarity: Rarity,
    #[serde(default = "default_min_tier")]
    pub min_tier: i32,
    #[serde(default = "default_max_tier")]
    pub max_tier: i32,
    pub base_health: f64,
    pub base_damage: f64,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub loot: HashMap<String, u32>,
    /// Selection weight. Defaults to the rarity's base probability.
    #[serde(default)]
    pub weight: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reward Catalog File
// ─────────────────────────────────────────────────────────────────────────────
//
// Layout of a rewards TOML file:
//
//   [tiers.<tier>]               multiplier (optional), rewards = [...]
//   [tiers.<tier>.ranks.<rank>]  multiplier (default 1.0), rewards = [...]
//
// The loader walks the tables itself; only the reward entries are typed.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardEntryConfig {
    #[serde(flatten)]
    pub kind: RewardKindConfig,
    #[serde(default = "default_one_f64")]
    pub chance: f64,
    #[serde(default)]
    pub label: Option<String>,
}

/// Reward payload as written in TOML, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardKindConfig {
    Experience {
        amount: i64,
    },
    Currency {
        amount: f64,
    },
    Item {
        material: String,
        #[serde(default = "default_one_i64")]
        amount: i64,
    },
    Command {
        command: String,
    },
    ExternalItem {
        item_id: String,
        #[serde(default = "default_one_i64")]
        amount: i64,
    },
    /// Any `type` this version does not understand. Skipped by the loader.
    #[serde(other)]
    Unknown,
}
