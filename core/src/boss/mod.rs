//! Boss templates and generation
//!
//! This module provides:
//! - **BossTemplate**: Static template (rarity, tier bounds, base stats) loaded at startup
//! - **GeneratedBoss**: A concrete boss with tier-scaled stats and applied modifiers
//! - **BossGenerator**: Weighted / rarity-filtered selection over a copy-on-write catalog

mod generator;
mod template;

#[cfg(test)]
mod generator_tests;

pub use generator::{BossGenerator, CatalogStats};
pub use template::{BossModifier, BossTemplate, GeneratedBoss, TemplateCatalog, default_templates};

pub use bossfall_types::Rarity;

/// Unique id of a generated boss. Shared by the spawn and resolution pipelines.
pub type BossId = u64;

/// Shift a base tier for the size of the group facing the boss: one step up
/// for five or more participants, one step down (never below 1) when solo.
pub fn adjust_tier_for_group(participants: u32, base_tier: i32) -> i32 {
    match participants {
        0 | 1 => (base_tier - 1).max(1),
        n if n >= 5 => base_tier.saturating_add(1),
        _ => base_tier,
    }
}
