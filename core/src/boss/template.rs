use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{BossId, Rarity};

const HEALTH_PER_TIER: f64 = 0.3;
const DAMAGE_PER_TIER: f64 = 0.2;

// ═══════════════════════════════════════════════════════════════════════════
// Templates
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossTemplate {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    pub min_tier: u32,
    pub max_tier: u32,
    pub base_health: f64,
    pub base_damage: f64,
    pub abilities: Vec<String>,
    pub loot: BTreeMap<String, u32>,
    /// Selection weight in the weighted draw.
    pub weight: f64,
}

impl BossTemplate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rarity: Rarity,
        base_health: f64,
        base_damage: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
            min_tier: 1,
            max_tier: 5,
            base_health,
            base_damage,
            abilities: Vec::new(),
            loot: BTreeMap::new(),
            weight: rarity.base_probability(),
        }
    }

    pub fn with_abilities(mut self, abilities: &[&str]) -> Self {
        self.abilities = abilities.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Clamp a requested tier into `[min_tier, max_tier]`.
    pub fn clamp_tier(&self, tier: i32) -> u32 {
        let low = self.min_tier.min(self.max_tier);
        let high = self.min_tier.max(self.max_tier);
        i64::from(tier).clamp(i64::from(low), i64::from(high)) as u32
    }

    pub fn scaled_health(&self, tier: u32) -> f64 {
        self.base_health * (1.0 + f64::from(tier) * HEALTH_PER_TIER)
    }

    pub fn scaled_damage(&self, tier: u32) -> f64 {
        self.base_damage * (1.0 + f64::from(tier) * DAMAGE_PER_TIER)
    }
}

/// One stock template per rarity.
pub fn default_templates() -> Vec<BossTemplate> {
    vec![
        BossTemplate::new("skeleton_king", "Skeleton King", Rarity::Common, 80.0, 8.0)
            .with_abilities(&["basic-attack", "bone-throw"]),
        BossTemplate::new("zombie_lord", "Zombie Lord", Rarity::Uncommon, 120.0, 12.0)
            .with_abilities(&["grab", "summon-undead"]),
        BossTemplate::new("vampire_prince", "Vampire Prince", Rarity::Rare, 150.0, 15.0)
            .with_abilities(&["life-drain", "shadow-form", "bat-swarm"]),
        BossTemplate::new("demon_lord", "Demon Lord", Rarity::Epic, 200.0, 20.0)
            .with_abilities(&["inferno", "hellfire", "chaos-magic"]),
        BossTemplate::new("ancient_dragon", "Ancient Dragon", Rarity::Legendary, 300.0, 30.0)
            .with_abilities(&["dragon-breath", "meteor-storm", "time-warp"]),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
// Catalog
// ═══════════════════════════════════════════════════════════════════════════

/// Immutable template snapshot. Readers hold an `Arc` to it while the
/// generator swaps in replacements.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: Vec<Arc<BossTemplate>>,
    index: HashMap<String, usize>,
    total_weight: f64,
}

impl TemplateCatalog {
    /// Later templates replace earlier ones with the same id, keeping the
    /// position of the first.
    pub fn new(templates: impl IntoIterator<Item = BossTemplate>) -> Self {
        let mut catalog = Self::default();
        for template in templates {
            catalog.insert(template);
        }
        catalog
    }

    pub fn with_defaults() -> Self {
        Self::new(default_templates())
    }

    fn insert(&mut self, template: BossTemplate) {
        let template = Arc::new(template);
        match self.index.get(&template.id) {
            Some(&idx) => self.templates[idx] = template,
            None => {
                self.index.insert(template.id.clone(), self.templates.len());
                self.templates.push(template);
            }
        }
        self.total_weight = self.templates.iter().map(|t| t.weight).sum();
    }

    /// Copy of this catalog with `template` added or replaced.
    pub fn with_template(&self, template: BossTemplate) -> Self {
        let mut next = self.clone();
        next.insert(template);
        next
    }

    pub fn get(&self, id: &str) -> Option<&Arc<BossTemplate>> {
        self.index.get(id).map(|&idx| &self.templates[idx])
    }

    pub fn templates(&self) -> &[Arc<BossTemplate>] {
        &self.templates
    }

    pub fn by_rarity(&self, rarity: Rarity) -> Vec<Arc<BossTemplate>> {
        self.templates
            .iter()
            .filter(|t| t.rarity == rarity)
            .cloned()
            .collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Generated Bosses
// ═══════════════════════════════════════════════════════════════════════════

/// Multiplicative stat modifier applied after tier scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossModifier {
    pub label: String,
    pub health_multiplier: f64,
    pub damage_multiplier: f64,
}

impl BossModifier {
    pub fn new(label: impl Into<String>, health_multiplier: f64, damage_multiplier: f64) -> Self {
        Self {
            label: label.into(),
            health_multiplier,
            damage_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedBoss {
    pub id: BossId,
    pub template: Arc<BossTemplate>,
    pub tier: u32,
    pub health: f64,
    pub damage: f64,
    pub loot: BTreeMap<String, u32>,
    /// Labels of applied modifiers, in application order.
    pub modifiers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl GeneratedBoss {
    pub(crate) fn from_template(id: BossId, template: Arc<BossTemplate>, requested_tier: i32) -> Self {
        let tier = template.clamp_tier(requested_tier);
        Self {
            id,
            tier,
            health: template.scaled_health(tier),
            damage: template.scaled_damage(tier),
            loot: template.loot.clone(),
            modifiers: Vec::new(),
            created_at: Utc::now(),
            template,
        }
    }

    pub fn apply_modifier(&mut self, modifier: &BossModifier) {
        self.health *= modifier.health_multiplier;
        self.damage *= modifier.damage_multiplier;
        self.modifiers.push(modifier.label.clone());
    }

    pub fn rarity(&self) -> Rarity {
        self.template.rarity
    }

    /// Template name prefixed by modifier labels, e.g. "Enraged Giant Zombie Lord".
    pub fn display_name(&self) -> String {
        if self.modifiers.is_empty() {
            return self.template.name.clone();
        }
        format!("{} {}", self.modifiers.join(" "), self.template.name)
    }
}
