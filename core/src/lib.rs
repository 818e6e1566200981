pub mod boss;
pub mod catalog;
pub mod context;
pub mod damage;
pub mod engine;
pub mod location;
pub mod reward;
pub mod rng;
pub mod spawn;
pub mod storage;

// Re-exports for convenience
pub use boss::{BossGenerator, BossId, BossModifier, BossTemplate, GeneratedBoss, Rarity, TemplateCatalog};
pub use catalog::{CatalogError, CatalogEvent, CatalogWatcher};
pub use context::{ConfigError, EngineConfigExt};
pub use damage::{DamageLedger, FinalizedLedger, ParticipantId, RankingEntry};
pub use engine::{BossEngine, EncounterOutcome, EngineStats, ReloadSummary, Resolution};
pub use location::{Location, LocationKind, LocationScorer, PlacementArea};
pub use reward::{CurrencyBackend, InventoryBackend, Reward, RewardEngine, RewardKind, RewardOutcome};
pub use rng::SharedRng;
pub use spawn::{
    OpenWorld, SpawnCondition, SpawnError, SpawnEvent, SpawnScheduler, SpawnZone, WorldService,
    ZoneObserver,
};
pub use storage::{EncounterStore, InMemoryStore, JsonLinesStore, Page, StorageError};

pub use bossfall_types::{EngineConfig, ZoneConfig};
