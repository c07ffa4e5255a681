//! Separation of markers that would render on top of each other.
//!
//! Candidates that share a distance from the user almost always share a
//! geocoded point, typically because several locations broadened to the same
//! city. Each repeat is nudged north by a multiple of a small step.

use ahash::AHashMap;
use serde::Serialize;
use tracing::debug;

use crate::geocode::Coordinate;
use crate::select::Candidate;

/// Latitude shift per repeat, in degrees.
pub const DEFAULT_COLLISION_STEP: f64 = 0.0001;

/// A selected film with its final marker position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedFilm {
    pub title: String,
    pub location: String,
    pub coordinate: Coordinate,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResolver {
    step: f64,
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_COLLISION_STEP)
    }
}

impl CollisionResolver {
    pub const fn new(step: f64) -> Self {
        Self { step }
    }

    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Place candidates in order, shifting the n-th repeat of a distance
    /// (counting from zero) by `n * step` degrees of latitude.
    pub fn resolve(&self, candidates: &[Candidate]) -> Vec<PlacedFilm> {
        let mut seen: AHashMap<u64, u32> = AHashMap::with_capacity(candidates.len());
        candidates
            .iter()
            .map(|candidate| {
                let occurrence = seen.entry(candidate.distance_km.to_bits()).or_default();
                let shift = f64::from(*occurrence) * self.step;
                if *occurrence > 0 {
                    debug!(title = %candidate.title, shift, "Shifted colliding marker");
                }
                *occurrence += 1;
                PlacedFilm {
                    title: candidate.title.clone(),
                    location: candidate.location.clone(),
                    coordinate: Coordinate::new(
                        candidate.coordinate.latitude + shift,
                        candidate.coordinate.longitude,
                    ),
                    distance_km: candidate.distance_km,
                }
            })
            .collect()
    }
}
