use rand::Rng;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::{
    BossId, BossModifier, BossTemplate, GeneratedBoss, Rarity, TemplateCatalog,
    adjust_tier_for_group,
};
use crate::rng::SharedRng;

/// Extra boss health per additional participant.
const HEALTH_PER_EXTRA_PARTICIPANT: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStats {
    pub total_templates: usize,
    pub total_weight: f64,
    pub by_rarity: BTreeMap<Rarity, usize>,
}

/// Selects templates and produces tier-scaled bosses.
///
/// The catalog is an immutable snapshot behind a lock held only long enough
/// to clone the `Arc`; reloads swap in a whole new snapshot.
#[derive(Debug)]
pub struct BossGenerator {
    catalog: RwLock<Arc<TemplateCatalog>>,
    rng: SharedRng,
    next_id: AtomicU64,
}

impl Default for BossGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl BossGenerator {
    pub fn new() -> Self {
        Self::with_catalog(TemplateCatalog::with_defaults(), SharedRng::from_entropy())
    }

    /// An empty catalog is replaced by the stock templates.
    pub fn with_catalog(catalog: TemplateCatalog, rng: SharedRng) -> Self {
        let catalog = if catalog.is_empty() {
            tracing::warn!("Empty template catalog, using defaults");
            TemplateCatalog::with_defaults()
        } else {
            catalog
        };
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            rng,
            next_id: AtomicU64::new(1),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    pub fn catalog(&self) -> Arc<TemplateCatalog> {
        Arc::clone(&self.catalog.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Swap in a new catalog. An empty one is rejected and the current
    /// catalog kept; returns whether the swap happened.
    pub fn replace_catalog(&self, catalog: TemplateCatalog) -> bool {
        if catalog.is_empty() {
            tracing::warn!("Refusing to load empty template catalog, keeping current templates");
            return false;
        }
        let count = catalog.len();
        *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(catalog);
        tracing::info!(templates = count, "Boss template catalog reloaded");
        true
    }

    pub fn add_template(&self, template: BossTemplate) {
        let mut guard = self.catalog.write().unwrap_or_else(|e| e.into_inner());
        let next = guard.with_template(template);
        *guard = Arc::new(next);
    }

    pub fn templates_by_rarity(&self, rarity: Rarity) -> Vec<Arc<BossTemplate>> {
        self.catalog().by_rarity(rarity)
    }

    pub fn stats(&self) -> CatalogStats {
        let catalog = self.catalog();
        let mut by_rarity = BTreeMap::new();
        for template in catalog.templates() {
            *by_rarity.entry(template.rarity).or_insert(0) += 1;
        }
        CatalogStats {
            total_templates: catalog.len(),
            total_weight: catalog.total_weight(),
            by_rarity,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generation
    // ─────────────────────────────────────────────────────────────────────────

    /// Weighted draw across the whole catalog.
    pub fn generate_random_boss(&self, tier: i32) -> GeneratedBoss {
        let catalog = self.catalog();
        let template = self.select_weighted(&catalog);
        self.build(template, tier)
    }

    /// Uniform pick among templates of `rarity`, or a weighted draw when
    /// there are none.
    pub fn generate_boss_by_rarity(&self, rarity: Rarity, tier: i32) -> GeneratedBoss {
        let candidates = self.templates_by_rarity(rarity);
        if candidates.is_empty() {
            tracing::debug!(%rarity, "No templates of rarity, using weighted selection");
            return self.generate_random_boss(tier);
        }
        let idx = self.rng.with(|rng| rng.random_range(0..candidates.len()));
        self.build(Arc::clone(&candidates[idx]), tier)
    }

    pub fn generate_boss_with_modifiers(&self, tier: i32, modifiers: &[BossModifier]) -> GeneratedBoss {
        let mut boss = self.generate_random_boss(tier);
        for modifier in modifiers {
            boss.apply_modifier(modifier);
        }
        boss
    }

    /// Tier shifted for group size, health scaled by participant count.
    pub fn generate_boss_for_player_count(&self, participants: u32, average_level: i32) -> GeneratedBoss {
        let tier = adjust_tier_for_group(participants, average_level);
        let mut boss = self.generate_random_boss(tier);
        let extra = f64::from(participants.max(1) - 1);
        boss.health *= 1.0 + extra * HEALTH_PER_EXTRA_PARTICIPANT;
        boss
    }

    pub fn generate_bosses(&self, count: usize, tier: i32) -> Vec<GeneratedBoss> {
        (0..count).map(|_| self.generate_random_boss(tier)).collect()
    }

    fn build(&self, template: Arc<BossTemplate>, tier: i32) -> GeneratedBoss {
        let id: BossId = self.next_id.fetch_add(1, Ordering::Relaxed);
        let boss = GeneratedBoss::from_template(id, template, tier);
        tracing::debug!(
            boss_id = boss.id,
            template = %boss.template.id,
            tier = boss.tier,
            health = boss.health,
            "Generated boss"
        );
        boss
    }

    /// Walk the catalog accumulating weights until the cumulative weight
    /// reaches the roll. Falls back to the first template.
    fn select_weighted(&self, catalog: &TemplateCatalog) -> Arc<BossTemplate> {
        let templates = catalog.templates();
        let roll = self.rng.with(|rng| rng.random::<f64>()) * catalog.total_weight();

        let mut cumulative = 0.0;
        for template in templates {
            cumulative += template.weight;
            if cumulative >= roll && template.weight > 0.0 {
                return Arc::clone(template);
            }
        }

        // Only reachable through float rounding or an all-zero catalog.
        Arc::clone(&templates[0])
    }
}
