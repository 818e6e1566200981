use hashbrown::HashMap;

use super::{Reward, RewardKind, RewardPool};

const EXPERIENCE_PER_TIER: u64 = 50;
const CURRENCY_PER_TIER: f64 = 100.0;

/// Rank multiplier used when no pool configures one.
pub fn builtin_rank_multiplier(rank: usize) -> f64 {
    match rank {
        1 => 2.0,
        2 => 1.5,
        3 => 1.2,
        4 | 5 => 1.0,
        6..=8 => 0.8,
        _ => 0.5,
    }
}

/// Pool used when the catalog has nothing for a tier.
pub fn default_pool(tier: u32, rank: usize) -> RewardPool {
    let tier_factor = u64::from(tier.max(1));
    RewardPool {
        name: format!("default-t{tier}-r{rank}"),
        rank_multiplier: builtin_rank_multiplier(rank),
        rewards: vec![
            Reward::guaranteed(RewardKind::Experience {
                amount: EXPERIENCE_PER_TIER * tier_factor,
            }),
            Reward::guaranteed(RewardKind::Currency {
                amount: CURRENCY_PER_TIER * tier_factor as f64,
            }),
        ],
    }
}

/// Immutable reward configuration snapshot.
#[derive(Debug, Clone, Default)]
pub struct RewardCatalog {
    ranked: HashMap<(u32, usize), RewardPool>,
    tier_fallback: HashMap<u32, TierFallback>,
}

#[derive(Debug, Clone)]
struct TierFallback {
    multiplier: Option<f64>,
    rewards: Vec<Reward>,
}

impl RewardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pool(&mut self, tier: u32, rank: usize, pool: RewardPool) {
        self.ranked.insert((tier, rank), pool);
    }

    /// Tier-wide pool for ranks without their own entry. Without a
    /// multiplier the built-in rank table is used.
    pub fn insert_tier_fallback(&mut self, tier: u32, multiplier: Option<f64>, rewards: Vec<Reward>) {
        self.tier_fallback
            .insert(tier, TierFallback { multiplier, rewards });
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty() && self.tier_fallback.is_empty()
    }

    pub fn pool_count(&self) -> usize {
        self.ranked.len() + self.tier_fallback.len()
    }

    /// Pool for (tier, rank), else the tier fallback, else the built-in default.
    pub fn resolve(&self, tier: u32, rank: usize) -> RewardPool {
        if let Some(pool) = self.ranked.get(&(tier, rank)) {
            return pool.clone();
        }
        if let Some(fallback) = self.tier_fallback.get(&tier) {
            return RewardPool {
                name: format!("tier-{tier}"),
                rank_multiplier: fallback
                    .multiplier
                    .unwrap_or_else(|| builtin_rank_multiplier(rank)),
                rewards: fallback.rewards.clone(),
            };
        }
        default_pool(tier, rank)
    }
}
