//! Reward pools and distribution
//!
//! Pools are keyed by (tier, rank) with a tier-wide fallback and a built-in
//! rank table behind that. Numeric rewards scale with rank and contribution;
//! items, commands and external items are handed out as configured.

mod catalog;
mod engine;

pub use catalog::{RewardCatalog, builtin_rank_multiplier, default_pool};
pub use engine::{CurrencyBackend, InventoryBackend, RewardEngine, RewardOutcome};

use serde::{Deserialize, Serialize};

/// Placeholder in command rewards replaced with the participant id.
pub const PARTICIPANT_PLACEHOLDER: &str = "{participant}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardKind {
    Experience { amount: u64 },
    Currency { amount: f64 },
    Item { material: String, amount: u32 },
    Command { command: String },
    ExternalItem { item_id: String, amount: u32 },
}

impl RewardKind {
    /// Apply a multiplier. Only experience and currency scale; experience
    /// rounds down.
    pub fn scaled(&self, multiplier: f64) -> Self {
        match self {
            RewardKind::Experience { amount } => RewardKind::Experience {
                amount: (*amount as f64 * multiplier).floor().max(0.0) as u64,
            },
            RewardKind::Currency { amount } => RewardKind::Currency {
                amount: (amount * multiplier).max(0.0),
            },
            other => other.clone(),
        }
    }

    pub fn is_currency(&self) -> bool {
        matches!(self, RewardKind::Currency { .. })
    }

    fn describe(&self) -> String {
        match self {
            RewardKind::Experience { amount } => format!("{amount} experience"),
            RewardKind::Currency { amount } => format!("{amount:.2} coins"),
            RewardKind::Item { material, amount } => format!("{amount}x {material}"),
            RewardKind::Command { .. } => "special reward".to_string(),
            RewardKind::ExternalItem { item_id, amount } => format!("{amount}x {item_id}"),
        }
    }
}

/// A chance-gated reward definition, or a concrete reward once rolled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub kind: RewardKind,
    /// Trigger chance in `[0, 1]`.
    pub chance: f64,
    pub label: Option<String>,
}

impl Reward {
    /// Out-of-range chances are clamped; NaN becomes 0.
    pub fn new(kind: RewardKind, chance: f64) -> Self {
        Self {
            kind,
            chance: if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) },
            label: None,
        }
    }

    pub fn guaranteed(kind: RewardKind) -> Self {
        Self::new(kind, 1.0)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn scaled(&self, multiplier: f64) -> Self {
        Self {
            kind: self.kind.scaled(multiplier),
            chance: self.chance,
            label: self.label.clone(),
        }
    }

    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.kind.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardPool {
    pub name: String,
    pub rank_multiplier: f64,
    pub rewards: Vec<Reward>,
}
