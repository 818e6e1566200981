use super::{SpawnCondition, SpawnZone};
use crate::boss::adjust_tier_for_group;

const OVERPOPULATION_BONUS: f64 = 1.2;
/// Power distance (from the zone midpoint) that costs a factor of e.
const POWER_FALLOFF: f64 = 5.0;
/// Seconds after a spawn until the zone is back at full rate.
const COOLDOWN_SECS: f64 = 60.0;
const NIGHT_BONUS: f64 = 1.5;
const EVENT_BONUS: f64 = 2.0;

/// Spawn probability for one zone under one condition, in `[0, 1]`.
///
/// Bonuses stack multiplicatively before the final clamp, so a busy zone at
/// night during an event can saturate at 1.0.
pub fn compute_probability(zone: &SpawnZone, condition: &SpawnCondition, base_rate: f64) -> f64 {
    if !zone.can_spawn() || condition.population < zone.min_population {
        return 0.0;
    }

    let mut p = base_rate * zone.spawn_rate;

    if condition.population > zone.max_population {
        p *= OVERPOPULATION_BONUS;
    }

    let mid_power = (zone.min_power + zone.max_power) / 2.0;
    p *= (-(condition.average_power - mid_power).abs() / POWER_FALLOFF).exp();

    let elapsed = condition.seconds_since_last_spawn.max(0.0);
    p *= (elapsed / COOLDOWN_SECS).min(1.0);

    if condition.is_night {
        p *= NIGHT_BONUS;
    }
    if condition.special_event {
        p *= EVENT_BONUS;
    }

    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}

/// Tier for a new boss: the rounded average power adjusted for group size,
/// then held inside the zone's power bounds.
pub fn resolve_tier(zone: &SpawnZone, condition: &SpawnCondition) -> i32 {
    let base = if condition.average_power.is_finite() {
        condition.average_power.round().max(1.0) as i32
    } else {
        1
    };
    let tier = adjust_tier_for_group(condition.population, base);

    let low = zone.min_power.min(zone.max_power).ceil().max(1.0) as i32;
    let high = (zone.min_power.max(zone.max_power).floor() as i32).max(low);
    tier.clamp(low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bossfall_types::ZoneConfig;

    fn make_zone() -> SpawnZone {
        // population 1..=10, power 1..=5, rate 0.5, three concurrent bosses
        SpawnZone::from_config(&ZoneConfig::new("crypt", "overworld", 0.0, 64.0, 0.0))
    }

    fn make_condition(population: u32, average_power: f64) -> SpawnCondition {
        SpawnCondition {
            population,
            average_power,
            seconds_since_last_spawn: 600.0,
            is_night: false,
            special_event: false,
            world: "overworld".to_string(),
        }
    }

    #[test]
    fn test_base_probability_at_mid_power() {
        let p = compute_probability(&make_zone(), &make_condition(4, 3.0), 1.0);
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_power_distance_decays_probability() {
        let p = compute_probability(&make_zone(), &make_condition(4, 8.0), 1.0);
        assert!((p - 0.5 * (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_underpopulated_zone_never_spawns() {
        let mut zone = make_zone();
        zone.min_population = 3;
        let mut condition = make_condition(2, 3.0);
        condition.is_night = true;
        condition.special_event = true;
        assert_eq!(compute_probability(&zone, &condition, 10.0), 0.0);
    }

    #[test]
    fn test_full_zone_never_spawns() {
        let mut zone = make_zone();
        zone.max_concurrent_bosses = 1;
        zone.live_boss_count = 1;
        let mut condition = make_condition(20, 3.0);
        condition.is_night = true;
        condition.special_event = true;
        assert_eq!(compute_probability(&zone, &condition, 10.0), 0.0);
    }

    #[test]
    fn test_cooldown_scales_linearly() {
        let mut condition = make_condition(4, 3.0);
        condition.seconds_since_last_spawn = 30.0;
        let p = compute_probability(&make_zone(), &condition, 1.0);
        assert!((p - 0.25).abs() < 1e-12);

        condition.seconds_since_last_spawn = -10.0;
        assert_eq!(compute_probability(&make_zone(), &condition, 1.0), 0.0);
    }

    #[test]
    fn test_bonuses_stack_then_clamp() {
        let mut condition = make_condition(11, 3.0);
        condition.is_night = true;
        let p = compute_probability(&make_zone(), &condition, 1.0);
        assert!((p - 0.9).abs() < 1e-12);

        condition.special_event = true;
        assert_eq!(compute_probability(&make_zone(), &condition, 1.0), 1.0);
    }

    #[test]
    fn test_probability_always_in_unit_interval() {
        let zone = make_zone();
        for population in [0, 1, 5, 10, 50] {
            for power in [-100.0, 0.0, 3.0, 7.5, f64::NAN, f64::INFINITY] {
                for secs in [-5.0, 0.0, 30.0, f64::INFINITY, f64::NAN] {
                    for base_rate in [0.0, 0.3, 1.0, 1e9] {
                        let condition = SpawnCondition {
                            seconds_since_last_spawn: secs,
                            is_night: population % 2 == 0,
                            special_event: population > 5,
                            ..make_condition(population, power)
                        };
                        let p = compute_probability(&zone, &condition, base_rate);
                        assert!((0.0..=1.0).contains(&p), "p = {p}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_tier_follows_group_size_and_bounds() {
        let zone = make_zone();
        assert_eq!(resolve_tier(&zone, &make_condition(3, 3.0)), 3);
        assert_eq!(resolve_tier(&zone, &make_condition(6, 3.0)), 4);
        assert_eq!(resolve_tier(&zone, &make_condition(1, 3.0)), 2);
        assert_eq!(resolve_tier(&zone, &make_condition(8, 5.0)), 5);
        assert_eq!(resolve_tier(&zone, &make_condition(1, 0.2)), 1);
        assert_eq!(resolve_tier(&zone, &make_condition(3, f64::NAN)), 1);
    }
}
