use hashbrown::HashSet;
use rand::Rng;
use std::f64::consts::TAU;
use std::sync::RwLock;

use super::{Location, LocationKind, OccupancyKey, PlacementArea};
use crate::rng::SharedRng;

const START_SCORE: i32 = 100;
const OUT_OF_BOUNDS_PENALTY: i32 = 30;
const BAD_HEIGHT_PENALTY: i32 = 40;
const NEAR_EDGE_PENALTY: i32 = 10;
const OCCUPIED_PENALTY: i32 = 20;
/// Distance from either vertical extreme that earns a warning.
const EDGE_MARGIN: f64 = 10.0;
/// Minimum score a random candidate needs to be accepted.
const ACCEPT_SCORE: u8 = 70;
const SAFE_SCORE: u8 = 50;
const NEAREST_SAMPLES: usize = 10;
/// Score reported for the center fallback.
const FALLBACK_SCORE: u8 = 70;

/// Result of scoring one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyAssessment {
    pub score: u8,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub safe: bool,
}

/// A generated placement with the score it was accepted at.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLocation {
    pub location: Location,
    pub score: u8,
    /// The random search gave up and the zone center was used.
    pub fallback: bool,
}

/// Scores and generates boss placements, tracking occupied block positions.
#[derive(Debug)]
pub struct LocationScorer {
    spawn_floor: f64,
    occupied: RwLock<HashSet<OccupancyKey>>,
    rng: SharedRng,
}

impl LocationScorer {
    pub fn new(spawn_floor: f64) -> Self {
        Self::with_rng(spawn_floor, SharedRng::from_entropy())
    }

    pub fn with_rng(spawn_floor: f64, rng: SharedRng) -> Self {
        Self {
            spawn_floor,
            occupied: RwLock::new(HashSet::new()),
            rng,
        }
    }

    pub fn spawn_floor(&self) -> f64 {
        self.spawn_floor
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assessment
    // ─────────────────────────────────────────────────────────────────────────

    /// Score a candidate against the area bounds and the occupancy set.
    pub fn assess_safety(&self, candidate: &Location, area: &PlacementArea) -> SafetyAssessment {
        let mut score = START_SCORE;
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        let dx = (candidate.x - area.center_x).abs();
        let dz = (candidate.z - area.center_z).abs();
        if dx > area.half_width || dz > area.half_width {
            issues.push(format!(
                "outside zone bounds ({dx:.1}, {dz:.1} > {:.1})",
                area.half_width
            ));
            score -= OUT_OF_BOUNDS_PENALTY;
        }

        if candidate.y < area.min_y || candidate.y > area.max_y {
            issues.push(format!(
                "height {:.1} outside [{:.1}, {:.1}]",
                candidate.y, area.min_y, area.max_y
            ));
            score -= BAD_HEIGHT_PENALTY;
        } else if candidate.y < area.min_y + EDGE_MARGIN || candidate.y > area.max_y - EDGE_MARGIN {
            warnings.push(format!("height {:.1} close to world limit", candidate.y));
            score -= NEAR_EDGE_PENALTY;
        }

        if self.is_occupied(candidate) {
            warnings.push("position already occupied".to_string());
            score -= OCCUPIED_PENALTY;
        }

        let score = score.clamp(0, 100) as u8;
        SafetyAssessment {
            safe: issues.is_empty() && score > SAFE_SCORE,
            score,
            issues,
            warnings,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generation
    // ─────────────────────────────────────────────────────────────────────────

    /// Try up to `attempts` random candidates; fall back to the zone center.
    pub fn generate_safe_location(&self, area: &PlacementArea, attempts: u32) -> ScoredLocation {
        let floor = self.spawn_floor.max(area.min_y);

        for attempt in 0..attempts {
            let candidate = self.rng.with(|rng| {
                Location::new(
                    area.world.clone(),
                    sample(rng, area.center_x - area.half_width, area.center_x + area.half_width),
                    sample(rng, floor, area.max_y),
                    sample(rng, area.center_z - area.half_width, area.center_z + area.half_width),
                )
            });

            let assessment = self.assess_safety(&candidate, area);
            if assessment.safe && assessment.score > ACCEPT_SCORE {
                tracing::debug!(
                    attempt,
                    score = assessment.score,
                    x = candidate.x,
                    y = candidate.y,
                    z = candidate.z,
                    "Accepted spawn location"
                );
                self.mark_occupied(&candidate);
                return ScoredLocation {
                    location: candidate,
                    score: assessment.score,
                    fallback: false,
                };
            }
        }

        tracing::warn!(
            world = %area.world,
            attempts,
            "No safe spawn location found, using zone center"
        );
        ScoredLocation {
            location: area.center(),
            score: FALLBACK_SCORE,
            fallback: true,
        }
    }

    /// Place inside the kind's vertical band without a full assessment.
    pub fn generate_themed_location(&self, area: &PlacementArea, kind: LocationKind) -> ScoredLocation {
        let (low, high) = kind.vertical_band();
        let low = low.max(area.min_y).min(area.max_y);
        let high = high.max(area.min_y).min(area.max_y);

        let location = self.rng.with(|rng| {
            Location::new(
                area.world.clone(),
                sample(rng, area.center_x - area.half_width, area.center_x + area.half_width),
                sample(rng, low, high),
                sample(rng, area.center_z - area.half_width, area.center_z + area.half_width),
            )
        });

        self.mark_occupied(&location);
        ScoredLocation {
            location,
            score: kind.nominal_score(),
            fallback: false,
        }
    }

    /// Best-scoring safe point among random samples around `center`, or
    /// `center` itself when none is safe.
    pub fn find_nearest_safe_location(
        &self,
        center: &Location,
        area: &PlacementArea,
        search_radius: f64,
    ) -> Location {
        let candidates: Vec<Location> = self.rng.with(|rng| {
            (0..NEAREST_SAMPLES)
                .map(|_| {
                    let angle = rng.random::<f64>() * TAU;
                    let distance = rng.random::<f64>() * search_radius.max(0.0);
                    let mut candidate = center.clone();
                    candidate.x += angle.cos() * distance;
                    candidate.z += angle.sin() * distance;
                    candidate
                })
                .collect()
        });

        candidates
            .into_iter()
            .map(|c| {
                let assessment = self.assess_safety(&c, area);
                (c, assessment)
            })
            .filter(|(_, a)| a.safe)
            .max_by_key(|(_, a)| a.score)
            .map(|(c, _)| c)
            .unwrap_or_else(|| center.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Occupancy
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_occupied(&self, location: &Location) -> bool {
        let occupied = self.occupied.read().unwrap_or_else(|e| e.into_inner());
        occupied.contains(&location.occupancy_key())
    }

    /// Returns false if the position was already taken.
    pub fn mark_occupied(&self, location: &Location) -> bool {
        let mut occupied = self.occupied.write().unwrap_or_else(|e| e.into_inner());
        occupied.insert(location.occupancy_key())
    }

    /// Release a position so it can be reused. Returns false if it was free.
    pub fn free(&self, location: &Location) -> bool {
        let mut occupied = self.occupied.write().unwrap_or_else(|e| e.into_inner());
        occupied.remove(&location.occupancy_key())
    }

    pub fn clear_occupied(&self) {
        self.occupied
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Uniform draw in `[low, high)`, or `low` for an empty range.
fn sample(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    if high > low {
        rng.random_range(low..high)
    } else {
        low
    }
}
