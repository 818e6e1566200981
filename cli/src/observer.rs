use bossfall_core::{SharedRng, SpawnCondition, SpawnZone, ZoneObserver};
use chrono::{DateTime, Timelike, Utc};
use rand::Rng;

const SPECIAL_EVENT_CHANCE: f64 = 0.05;

/// Stand-in for a live server: invents a population and power level for
/// each zone on every tick. Night is 20:00 to 06:00 UTC.
pub struct RandomObserver {
    rng: SharedRng,
}

impl RandomObserver {
    pub fn new(rng: SharedRng) -> Self {
        Self { rng }
    }
}

impl ZoneObserver for RandomObserver {
    fn observe(&self, zone: &SpawnZone, now: DateTime<Utc>) -> Option<SpawnCondition> {
        let (population, power, event) = self.rng.with(|rng| {
            let population = rng.random_range(0..=zone.max_population.saturating_add(2));
            let power = if zone.max_power > zone.min_power {
                rng.random_range(zone.min_power..=zone.max_power)
            } else {
                zone.min_power
            };
            (population, power, rng.random_bool(SPECIAL_EVENT_CHANCE))
        });
        let hour = now.hour();
        let night = !(6..20).contains(&hour);

        Some(SpawnCondition::for_zone(
            zone, population, power, night, event, now,
        ))
    }
}
