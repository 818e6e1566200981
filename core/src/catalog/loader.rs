//! Template and reward catalog loading
//!
//! A file that cannot be read or is not valid TOML is an error. Past that,
//! every entry is converted on its own: malformed entries are repaired where
//! the intent is obvious (swapped tier bounds, negative weights) and skipped
//! otherwise, each with a warning, so one bad entry never costs the rest of
//! the file.

use std::fs;
use std::path::Path;

use bossfall_types::{RewardEntryConfig, RewardKindConfig, TemplateConfig};
use hashbrown::HashSet;
use serde::de::DeserializeOwned;
use toml::{Table, Value};

use super::CatalogError;
use crate::boss::{BossTemplate, TemplateCatalog};
use crate::reward::{Reward, RewardCatalog, RewardKind, RewardPool};

// ═══════════════════════════════════════════════════════════════════════════
// Templates
// ═══════════════════════════════════════════════════════════════════════════

/// Load a `[[template]]` catalog from disk.
pub fn load_templates(path: &Path) -> Result<TemplateCatalog, CatalogError> {
    let content = read(path)?;
    parse_templates(&content, path)
}

/// Parse a templates file. `path` is only used for error context.
pub fn parse_templates(content: &str, path: &Path) -> Result<TemplateCatalog, CatalogError> {
    let root = parse_table(content, path)?;
    let entries = array_field(&root, "template", path);

    let mut seen = HashSet::new();
    let mut templates = Vec::with_capacity(entries.len());
    for (index, value) in entries.iter().enumerate() {
        let Some(config) = decode_entry::<TemplateConfig>(value, index, "template", path) else {
            continue;
        };
        if !seen.insert(config.id.clone()) {
            tracing::warn!(id = %config.id, path = %path.display(), "Duplicate template id, skipping");
            continue;
        }
        if let Some(template) = template_from_config(config) {
            templates.push(template);
        }
    }

    tracing::debug!(count = templates.len(), path = %path.display(), "Templates parsed");
    Ok(TemplateCatalog::new(templates))
}

fn template_from_config(config: TemplateConfig) -> Option<BossTemplate> {
    let id = config.id.trim().to_string();
    if id.is_empty() {
        tracing::warn!("Template without id, skipping");
        return None;
    }
    if !config.base_health.is_finite() || config.base_health <= 0.0 {
        tracing::warn!(id = %id, base_health = config.base_health, "Invalid base health, skipping template");
        return None;
    }
    if !config.base_damage.is_finite() || config.base_damage < 0.0 {
        tracing::warn!(id = %id, base_damage = config.base_damage, "Invalid base damage, skipping template");
        return None;
    }

    let (mut min_tier, mut max_tier) = (config.min_tier.max(1), config.max_tier.max(1));
    if min_tier > max_tier {
        tracing::warn!(id = %id, min_tier, max_tier, "Tier bounds inverted, swapping");
        std::mem::swap(&mut min_tier, &mut max_tier);
    }

    let weight = match config.weight {
        None => config.rarity.base_probability(),
        Some(w) if w.is_finite() && w >= 0.0 => w,
        Some(w) => {
            tracing::warn!(id = %id, weight = w, "Invalid weight, template will never be selected");
            0.0
        }
    };

    let mut template = BossTemplate::new(
        id.clone(),
        config.name.unwrap_or_else(|| id.clone()),
        config.rarity,
        config.base_health,
        config.base_damage,
    );
    template.min_tier = min_tier as u32;
    template.max_tier = max_tier as u32;
    template.weight = weight;
    template.abilities = config.abilities;
    template.loot = config.loot.into_iter().collect();
    Some(template)
}

// ═══════════════════════════════════════════════════════════════════════════
// Rewards
// ═══════════════════════════════════════════════════════════════════════════

/// Load a `[tiers.<tier>]` reward catalog from disk.
pub fn load_rewards(path: &Path) -> Result<RewardCatalog, CatalogError> {
    let content = read(path)?;
    parse_rewards(&content, path)
}

/// Parse a rewards file. `path` is only used for error context.
pub fn parse_rewards(content: &str, path: &Path) -> Result<RewardCatalog, CatalogError> {
    let root = parse_table(content, path)?;
    let empty = Table::new();
    let tiers = table_field(&root, "tiers", &empty, path);

    let mut catalog = RewardCatalog::new();
    for (tier_key, tier_value) in tiers {
        let Some(tier) = parse_positive(tier_key) else {
            tracing::warn!(key = %tier_key, path = %path.display(), "Invalid tier key, skipping");
            continue;
        };
        let Value::Table(tier_table) = tier_value else {
            tracing::warn!(tier, path = %path.display(), "Tier is not a table, skipping");
            continue;
        };

        let rewards = convert_rewards(tier_table, tier, path);
        if !rewards.is_empty() {
            let multiplier = match tier_table.get("multiplier") {
                None => None,
                Some(value) => match as_number(value) {
                    Some(m) if m.is_finite() && m >= 0.0 => Some(m),
                    _ => {
                        tracing::warn!(tier, multiplier = %value, "Invalid tier multiplier, using rank table");
                        None
                    }
                },
            };
            catalog.insert_tier_fallback(tier, multiplier, rewards);
        }

        for (rank_key, rank_value) in table_field(tier_table, "ranks", &empty, path) {
            let Some(rank) = parse_positive(rank_key) else {
                tracing::warn!(tier, key = %rank_key, "Invalid rank key, skipping");
                continue;
            };
            let Value::Table(rank_table) = rank_value else {
                tracing::warn!(tier, rank, "Rank is not a table, skipping");
                continue;
            };

            let rank_multiplier = match rank_table.get("multiplier") {
                None => 1.0,
                Some(value) => match as_number(value) {
                    Some(m) if m.is_finite() && m >= 0.0 => m,
                    _ => {
                        tracing::warn!(tier, rank, multiplier = %value, "Invalid rank multiplier, using 1.0");
                        1.0
                    }
                },
            };
            catalog.insert_pool(
                tier,
                rank as usize,
                RewardPool {
                    name: format!("tier-{tier}-rank-{rank}"),
                    rank_multiplier,
                    rewards: convert_rewards(rank_table, tier, path),
                },
            );
        }
    }

    tracing::debug!(pools = catalog.pool_count(), path = %path.display(), "Rewards parsed");
    Ok(catalog)
}

fn parse_positive(key: &str) -> Option<u32> {
    key.trim().parse::<u32>().ok().filter(|v| *v >= 1)
}

fn convert_rewards(table: &Table, tier: u32, path: &Path) -> Vec<Reward> {
    array_field(table, "rewards", path)
        .iter()
        .enumerate()
        .filter_map(|(index, value)| decode_entry::<RewardEntryConfig>(value, index, "reward", path))
        .filter_map(|entry| reward_from_config(&entry, tier))
        .collect()
}

fn reward_from_config(entry: &RewardEntryConfig, tier: u32) -> Option<Reward> {
    let kind = match &entry.kind {
        RewardKindConfig::Experience { amount } => RewardKind::Experience {
            amount: non_negative(*amount, tier, "experience")?,
        },
        RewardKindConfig::Currency { amount } => {
            if !amount.is_finite() || *amount < 0.0 {
                tracing::warn!(tier, amount, "Invalid currency amount, skipping reward");
                return None;
            }
            RewardKind::Currency { amount: *amount }
        }
        RewardKindConfig::Item { material, amount } => RewardKind::Item {
            material: material.clone(),
            amount: item_count(*amount, tier, material)?,
        },
        RewardKindConfig::Command { command } => RewardKind::Command {
            command: command.clone(),
        },
        RewardKindConfig::ExternalItem { item_id, amount } => RewardKind::ExternalItem {
            item_id: item_id.clone(),
            amount: item_count(*amount, tier, item_id)?,
        },
        RewardKindConfig::Unknown => {
            tracing::warn!(tier, "Unknown reward type, skipping reward");
            return None;
        }
    };

    if !(0.0..=1.0).contains(&entry.chance) {
        tracing::warn!(tier, chance = entry.chance, "Reward chance out of range, clamping");
    }
    let reward = Reward::new(kind, entry.chance);
    Some(match &entry.label {
        Some(label) => reward.with_label(label.clone()),
        None => reward,
    })
}

fn non_negative(amount: i64, tier: u32, what: &str) -> Option<u64> {
    match u64::try_from(amount) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(tier, amount, kind = what, "Negative reward amount, skipping reward");
            None
        }
    }
}

fn item_count(amount: i64, tier: u32, item: &str) -> Option<u32> {
    if amount < 1 {
        tracing::warn!(tier, amount, item, "Item amount below 1, skipping reward");
        return None;
    }
    Some(u32::try_from(amount).unwrap_or(u32::MAX))
}

// ─────────────────────────────────────────────────────────────────────────────
// TOML helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_table(content: &str, path: &Path) -> Result<Table, CatalogError> {
    toml::from_str(content).map_err(|source| CatalogError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// The table under `key`, or `empty` if it is missing or not a table.
fn table_field<'a>(table: &'a Table, key: &str, empty: &'a Table, path: &Path) -> &'a Table {
    match table.get(key) {
        None => empty,
        Some(Value::Table(inner)) => inner,
        Some(_) => {
            tracing::warn!(key, path = %path.display(), "Expected a table, ignoring it");
            empty
        }
    }
}

/// The array under `key`, or empty if it is missing or not an array.
fn array_field<'a>(table: &'a Table, key: &str, path: &Path) -> &'a [Value] {
    match table.get(key) {
        None => &[],
        Some(Value::Array(values)) => values,
        Some(_) => {
            tracing::warn!(key, path = %path.display(), "Expected an array, ignoring it");
            &[]
        }
    }
}

/// Convert one entry, logging and returning `None` if it does not fit.
fn decode_entry<T: DeserializeOwned>(value: &Value, index: usize, what: &str, path: &Path) -> Option<T> {
    match value.clone().try_into::<T>() {
        Ok(entry) => Some(entry),
        Err(e) => {
            let id = value.get("id").and_then(Value::as_str).unwrap_or("?");
            tracing::warn!(
                index,
                id,
                kind = what,
                path = %path.display(),
                error = %e,
                "Malformed catalog entry, skipping"
            );
            None
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

fn read(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| CatalogError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bossfall_types::Rarity;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("catalog.toml")
    }

    #[test]
    fn test_parse_templates() {
        let content = r#"
[[template]]
id = "frost_giant"
name = "Frost Giant"
rarity = "rare"
min_tier = 2
max_tier = 4
base_health = 300.0
base_damage = 20.0
abilities = ["frost_breath"]
[template.loot]
ice_shard = 4

[[template]]
id = "bog_witch"
rarity = "uncommon"
base_health = 150.0
base_damage = 12.0
weight = 2.5
"#;
        let catalog = parse_templates(content, &path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let giant = catalog.get("frost_giant").unwrap();
        assert_eq!(giant.name, "Frost Giant");
        assert_eq!(giant.rarity, Rarity::Rare);
        assert_eq!((giant.min_tier, giant.max_tier), (2, 4));
        assert_eq!(giant.weight, Rarity::Rare.base_probability());
        assert_eq!(giant.loot.get("ice_shard"), Some(&4));

        let witch = catalog.get("bog_witch").unwrap();
        assert_eq!(witch.name, "bog_witch");
        assert_eq!(witch.weight, 2.5);
    }

    #[test]
    fn test_templates_repaired_or_skipped() {
        let content = r#"
[[template]]
id = "inverted"
rarity = "common"
min_tier = 5
max_tier = 2
base_health = 100.0
base_damage = 10.0
weight = -3.0

[[template]]
id = "inverted"
rarity = "legendary"
base_health = 999.0
base_damage = 99.0

[[template]]
id = "no_health"
rarity = "common"
base_health = -1.0
base_damage = 10.0
"#;
        let catalog = parse_templates(content, &path()).unwrap();
        assert_eq!(catalog.len(), 1);

        let template = catalog.get("inverted").unwrap();
        assert_eq!(template.rarity, Rarity::Common);
        assert_eq!((template.min_tier, template.max_tier), (2, 5));
        assert_eq!(template.weight, 0.0);
    }

    #[test]
    fn test_parse_rewards() {
        let content = r#"
[tiers.2]
multiplier = 1.25
rewards = [
    { type = "experience", amount = 40 },
    { type = "currency", amount = 15.5, chance = 0.5, label = "Purse" },
]

[tiers.2.ranks.1]
multiplier = 3.0
rewards = [
    { type = "item", material = "NETHERITE_INGOT" },
    { type = "command", command = "title {participant} Champion" },
    { type = "external_item", item_id = "relic_blade", amount = 1 },
]
"#;
        let catalog = parse_rewards(content, &path()).unwrap();
        assert_eq!(catalog.pool_count(), 2);

        let ranked = catalog.resolve(2, 1);
        assert_eq!(ranked.rank_multiplier, 3.0);
        assert_eq!(ranked.rewards.len(), 3);
        assert_eq!(
            ranked.rewards[0].kind,
            RewardKind::Item {
                material: "NETHERITE_INGOT".to_string(),
                amount: 1
            }
        );

        let fallback = catalog.resolve(2, 7);
        assert_eq!(fallback.rank_multiplier, 1.25);
        assert_eq!(fallback.rewards[1].chance, 0.5);
        assert_eq!(fallback.rewards[1].display_label(), "Purse");
    }

    #[test]
    fn test_bad_reward_entries_skipped() {
        let content = r#"
[tiers.zero]
rewards = [{ type = "experience", amount = 1 }]

[tiers.0]
rewards = [{ type = "experience", amount = 1 }]

[tiers.3.ranks.first]
rewards = [{ type = "experience", amount = 1 }]

[tiers.3.ranks.2]
multiplier = -2.0
rewards = [
    { type = "experience", amount = -5 },
    { type = "currency", amount = -1.0 },
    { type = "item", material = "DIRT", amount = 0 },
    { type = "teleport", target = "spawn" },
    { type = "experience", amount = 75, chance = 7.0 },
]
"#;
        let catalog = parse_rewards(content, &path()).unwrap();
        assert_eq!(catalog.pool_count(), 1);

        let pool = catalog.resolve(3, 2);
        assert_eq!(pool.rank_multiplier, 1.0);
        assert_eq!(pool.rewards.len(), 1);
        assert_eq!(pool.rewards[0].kind, RewardKind::Experience { amount: 75 });
        assert_eq!(pool.rewards[0].chance, 1.0);
    }

    #[test]
    fn test_malformed_template_does_not_sink_file() {
        let content = r#"
[[template]]
id = "stone_golem"
rarity = "common"
base_health = 120.0
base_damage = 8.0

[[template]]
id = "ancient_one"
rarity = "mythic"
base_health = 5000.0
base_damage = 300.0

[[template]]
id = "heavy"
rarity = "epic"
base_health = 400.0
base_damage = 30.0
weight = "heavy"

[[template]]
rarity = "rare"
base_health = 90.0
base_damage = 9.0
"#;
        let catalog = parse_templates(content, &path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("stone_golem").is_some());
        assert!(catalog.get("ancient_one").is_none());
    }

    #[test]
    fn test_malformed_reward_does_not_sink_file() {
        let content = r#"
[tiers.1]
multiplier = "big"
rewards = [
    { type = "experience", amount = "lots" },
    { type = "experience", amount = 20 },
]

[tiers.1.ranks.1]
multiplier = "double"
rewards = [
    { type = "currency", amount = 10, chance = "often" },
    { type = "currency", amount = 10 },
]

[tiers.1.ranks.2]
rewards = "none"

[tiers.4]
rewards = 5
"#;
        let catalog = parse_rewards(content, &path()).unwrap();
        assert_eq!(catalog.pool_count(), 3);

        let fallback = catalog.resolve(1, 5);
        assert_eq!(fallback.rewards.len(), 1);
        assert_eq!(fallback.rewards[0].kind, RewardKind::Experience { amount: 20 });

        let ranked = catalog.resolve(1, 1);
        assert_eq!(ranked.rank_multiplier, 1.0);
        assert_eq!(ranked.rewards.len(), 1);
        assert_eq!(ranked.rewards[0].kind, RewardKind::Currency { amount: 10.0 });

        assert!(catalog.resolve(1, 2).rewards.is_empty());
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = parse_rewards("[tiers.1", &path()).unwrap_err();
        assert!(matches!(err, CatalogError::ParseToml { ref path, .. } if path.ends_with("catalog.toml")));
    }

    #[test]
    fn test_missing_file() {
        let missing = std::env::temp_dir().join("bossfall-missing-catalog.toml");
        let err = load_templates(&missing).unwrap_err();
        assert!(matches!(err, CatalogError::ReadFile { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("bossfall-catalog-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("templates.toml");
        fs::write(
            &file,
            "[[template]]\nid = \"gargoyle\"\nrarity = \"epic\"\nbase_health = 400.0\nbase_damage = 30.0\n",
        )
        .unwrap();

        let catalog = load_templates(&file).unwrap();
        assert_eq!(catalog.by_rarity(Rarity::Epic).len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
