//! Engine configuration
//!
//! The serde types live in bossfall-types; this module adds persistence
//! through confy and range validation.

use std::path::PathBuf;

pub use bossfall_types::{
    CatalogSettings, EngineConfig, LedgerSettings, RewardSettings, SpawnSettings, WorldSettings,
    ZoneConfig,
};

use super::ConfigError;

pub const APP_NAME: &str = "bossfall";
const CONFIG_NAME: &str = "config";

/// Per-user data directory for history and catalog files.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join(APP_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// EngineConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for EngineConfig persistence and validation
pub trait EngineConfigExt: Sized {
    fn load() -> Self;
    fn load_with_defaults() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
    /// Clamp out-of-range values in place. Returns the number of repairs.
    fn validate(&mut self) -> usize;
}

impl EngineConfigExt for EngineConfig {
    fn load() -> Self {
        match Self::try_load() {
            Ok(mut config) => {
                config.validate();
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "Configuration unreadable, using defaults");
                Self::load_with_defaults()
            }
        }
    }

    /// Defaults plus a starter zone in the overworld.
    fn load_with_defaults() -> Self {
        let mut config = EngineConfig::default();
        config
            .zones
            .push(ZoneConfig::new("spawn", "overworld", 0.0, config.world.spawn_floor, 0.0));
        config
    }

    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).map_err(ConfigError::Locate)
    }

    fn validate(&mut self) -> usize {
        let mut repairs = 0;
        let mut repair = |field: &str, value: String, fixed: String| {
            tracing::warn!(field, value = %value, fixed = %fixed, "Configuration value out of range");
            repairs += 1;
        };

        let spawn = &mut self.spawn;
        if !spawn.base_rate.is_finite() || spawn.base_rate < 0.0 {
            repair("spawn.base_rate", spawn.base_rate.to_string(), "1".into());
            spawn.base_rate = 1.0;
        }
        if spawn.tick_interval_secs == 0 {
            repair("spawn.tick_interval_secs", "0".into(), "1".into());
            spawn.tick_interval_secs = 1;
        }
        if spawn.location_attempts == 0 {
            repair("spawn.location_attempts", "0".into(), "1".into());
            spawn.location_attempts = 1;
        }

        let world = &mut self.world;
        let defaults = WorldSettings::default();
        if !world.width.is_finite() || world.width <= 0.0 {
            repair("world.width", world.width.to_string(), defaults.width.to_string());
            world.width = defaults.width;
        }
        if !world.height.is_finite() || world.height <= 0.0 {
            repair("world.height", world.height.to_string(), defaults.height.to_string());
            world.height = defaults.height;
        }
        if !world.spawn_floor.is_finite() || !(0.0..=world.height).contains(&world.spawn_floor) {
            let fixed = if world.spawn_floor.is_finite() {
                world.spawn_floor.clamp(0.0, world.height)
            } else {
                defaults.spawn_floor.min(world.height)
            };
            repair("world.spawn_floor", world.spawn_floor.to_string(), fixed.to_string());
            world.spawn_floor = fixed;
        }

        if self.rewards.max_reward_ranks == 0 {
            repair("rewards.max_reward_ranks", "0".into(), "1".into());
            self.rewards.max_reward_ranks = 1;
        }
        if self.ledger.top_damagers == 0 {
            repair("ledger.top_damagers", "0".into(), "1".into());
            self.ledger.top_damagers = 1;
        }
        if self.ledger.history_limit == 0 {
            repair("ledger.history_limit", "0".into(), "1".into());
            self.ledger.history_limit = 1;
        }

        repairs
    }
}
