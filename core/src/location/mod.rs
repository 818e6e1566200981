//! Spawn placement
//!
//! Scores candidate coordinates for boundary/height safety and occupancy, and
//! generates placements for new bosses. Placement never hard-fails: when no
//! random candidate qualifies, the zone center at mid-height is used.

mod scorer;

pub use scorer::{LocationScorer, SafetyAssessment, ScoredLocation};

use serde::{Deserialize, Serialize};

/// Abstract world position handed to the world service for materialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Euclidean distance, or `None` when the two points are in different worlds.
    pub fn distance(&self, other: &Location) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        Some((dx * dx + dy * dy + dz * dz).sqrt())
    }

    /// Block-quantized key used by the occupancy set.
    pub fn occupancy_key(&self) -> OccupancyKey {
        OccupancyKey {
            world: self.world.clone(),
            x: self.x.round() as i64,
            y: self.y.round() as i64,
            z: self.z.round() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccupancyKey {
    pub world: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

/// Placement flavor for the themed generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Arena,
    Platform,
    Cave,
    FloatingIsland,
}

impl LocationKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "arena" => Some(LocationKind::Arena),
            "platform" => Some(LocationKind::Platform),
            "cave" => Some(LocationKind::Cave),
            "floating_island" => Some(LocationKind::FloatingIsland),
            _ => None,
        }
    }

    /// Vertical band `(low, high)` the generator samples from.
    pub fn vertical_band(self) -> (f64, f64) {
        match self {
            LocationKind::Arena => (64.0, 64.0),
            LocationKind::Platform => (100.0, 150.0),
            LocationKind::Cave => (32.0, 64.0),
            LocationKind::FloatingIsland => (150.0, 250.0),
        }
    }

    /// Score reported for a themed placement instead of a full assessment.
    pub fn nominal_score(self) -> u8 {
        match self {
            LocationKind::Arena => 85,
            LocationKind::Platform => 80,
            LocationKind::Cave => 50,
            LocationKind::FloatingIsland => 60,
        }
    }
}

/// Region a placement must fall in: a square around the zone center plus a
/// valid vertical range.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementArea {
    pub world: String,
    pub center_x: f64,
    pub center_z: f64,
    pub half_width: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl PlacementArea {
    /// Guaranteed-valid fallback point: zone center at mid-height.
    pub fn center(&self) -> Location {
        Location::new(
            self.world.clone(),
            self.center_x,
            (self.min_y + self.max_y) / 2.0,
            self.center_z,
        )
    }
}
