//! Tests for BossGenerator selection and scaling

use std::collections::HashMap;

use crate::rng::SharedRng;

use super::{
    BossGenerator, BossModifier, BossTemplate, Rarity, TemplateCatalog, adjust_tier_for_group,
};

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn make_generator(seed: u64) -> BossGenerator {
    BossGenerator::with_catalog(TemplateCatalog::with_defaults(), SharedRng::seeded(seed))
}

fn make_template(id: &str, rarity: Rarity, weight: f64) -> BossTemplate {
    let mut template = BossTemplate::new(id, id, rarity, 100.0, 10.0);
    template.weight = weight;
    template
}

// ═══════════════════════════════════════════════════════════════════════════
// Weighted Selection
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_weighted_selection_converges_to_weights() {
    let generator = make_generator(42);
    let trials = 100_000;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..trials {
        let boss = generator.generate_random_boss(1);
        *counts.entry(boss.template.id.clone()).or_default() += 1;
    }

    for template in generator.catalog().templates() {
        let observed = counts.get(&template.id).copied().unwrap_or(0) as f64 / trials as f64;
        assert!(
            (observed - template.weight).abs() <= 0.01,
            "{}: observed {observed}, expected {}",
            template.id,
            template.weight
        );
    }
}

#[test]
fn test_unnormalized_weights_are_relative() {
    let catalog = TemplateCatalog::new([
        make_template("a", Rarity::Common, 3.0),
        make_template("b", Rarity::Rare, 1.0),
    ]);
    let generator = BossGenerator::with_catalog(catalog, SharedRng::seeded(9));

    let trials = 20_000;
    let a = (0..trials)
        .filter(|_| generator.generate_random_boss(1).template.id == "a")
        .count();
    let share = a as f64 / trials as f64;
    assert!((share - 0.75).abs() < 0.02, "share was {share}");
}

#[test]
fn test_zero_weight_template_is_never_picked() {
    let catalog = TemplateCatalog::new([
        make_template("never", Rarity::Common, 0.0),
        make_template("always", Rarity::Common, 1.0),
    ]);
    let generator = BossGenerator::with_catalog(catalog, SharedRng::seeded(3));

    for _ in 0..1_000 {
        assert_eq!(generator.generate_random_boss(1).template.id, "always");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tiers and Scaling
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_tier_is_clamped_to_template_bounds() {
    let generator = make_generator(1);
    for requested in [-5, 999] {
        for _ in 0..200 {
            let boss = generator.generate_random_boss(requested);
            assert!(boss.tier >= boss.template.min_tier);
            assert!(boss.tier <= boss.template.max_tier);
        }
    }
    assert_eq!(generator.generate_random_boss(-5).tier, 1);
    assert_eq!(generator.generate_random_boss(999).tier, 5);
}

#[test]
fn test_stats_scale_linearly_with_tier() {
    let generator = make_generator(2);
    let boss = generator.generate_boss_by_rarity(Rarity::Legendary, 2);

    assert_eq!(boss.template.id, "ancient_dragon");
    assert!((boss.health - 300.0 * 1.6).abs() < 1e-9);
    assert!((boss.damage - 30.0 * 1.4).abs() < 1e-9);
}

#[test]
fn test_modifiers_apply_after_tier_scaling() {
    let generator = make_generator(4);
    let modifiers = [
        BossModifier::new("Enraged", 1.0, 1.5),
        BossModifier::new("Giant", 2.0, 1.0),
    ];
    let boss = generator.generate_boss_with_modifiers(3, &modifiers);

    let base_health = boss.template.scaled_health(boss.tier);
    let base_damage = boss.template.scaled_damage(boss.tier);
    assert!((boss.health - base_health * 2.0).abs() < 1e-9);
    assert!((boss.damage - base_damage * 1.5).abs() < 1e-9);
    assert_eq!(boss.modifiers, vec!["Enraged", "Giant"]);
    assert!(boss.display_name().starts_with("Enraged Giant "));
}

#[test]
fn test_player_count_adjusts_tier_and_health() {
    let generator = make_generator(5);

    let solo = generator.generate_boss_for_player_count(1, 3);
    assert_eq!(solo.tier, 2);
    assert!((solo.health - solo.template.scaled_health(2)).abs() < 1e-9);

    let group = generator.generate_boss_for_player_count(6, 3);
    assert_eq!(group.tier, 4);
    assert!((group.health - group.template.scaled_health(4) * 2.0).abs() < 1e-9);
}

#[test]
fn test_adjust_tier_for_group() {
    assert_eq!(adjust_tier_for_group(1, 1), 1);
    assert_eq!(adjust_tier_for_group(0, 4), 3);
    assert_eq!(adjust_tier_for_group(3, 4), 4);
    assert_eq!(adjust_tier_for_group(5, 4), 5);
}

// ═══════════════════════════════════════════════════════════════════════════
// Catalog Management
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_rarity_without_templates_falls_back_to_weighted() {
    let catalog = TemplateCatalog::new([make_template("only", Rarity::Common, 1.0)]);
    let generator = BossGenerator::with_catalog(catalog, SharedRng::seeded(6));

    let boss = generator.generate_boss_by_rarity(Rarity::Epic, 1);
    assert_eq!(boss.template.id, "only");
}

#[test]
fn test_empty_reload_keeps_current_catalog() {
    let generator = make_generator(7);
    assert!(!generator.replace_catalog(TemplateCatalog::default()));
    assert_eq!(generator.catalog().len(), 5);

    assert!(generator.replace_catalog(TemplateCatalog::new([make_template(
        "solo",
        Rarity::Rare,
        1.0
    )])));
    assert_eq!(generator.catalog().len(), 1);
}

#[test]
fn test_reload_does_not_disturb_held_snapshot() {
    let generator = make_generator(8);
    let snapshot = generator.catalog();

    generator.add_template(make_template("newcomer", Rarity::Epic, 0.1));

    assert_eq!(snapshot.len(), 5);
    assert!(snapshot.get("newcomer").is_none());
    assert!(generator.catalog().get("newcomer").is_some());
    assert_eq!(generator.stats().by_rarity[&Rarity::Epic], 2);
}

#[test]
fn test_generated_ids_are_unique() {
    let generator = make_generator(10);
    let bosses = generator.generate_bosses(50, 2);
    let mut ids: Vec<_> = bosses.iter().map(|b| b.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}
