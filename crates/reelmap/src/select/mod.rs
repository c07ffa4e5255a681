//! Nearest-k selection of matching film locations.

use rayon::prelude::*;
use reelmap_dataset::FilmLocations;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::geocode::{Coordinate, GeocodeError, Geocoder, GeocodingProvider};
use crate::matcher::CountryMatcher;

/// Upper bound on the number of selected candidates.
pub const MAX_CANDIDATES: usize = 10;

/// Mean Earth radius (IUGG), in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A film location that matched the user's region and resolved to a position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub title: String,
    pub location: String,
    pub distance_km: f64,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of candidates kept, clamped to `1..=MAX_CANDIDATES`
    pub limit: usize,
    /// Geocode candidates on the rayon pool instead of one at a time
    pub parallel_geocoding: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            limit: MAX_CANDIDATES,
            parallel_geocoding: false,
        }
    }
}

impl SelectionConfig {
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_CANDIDATES)
    }
}

/// Haversine distance between two positions.
pub fn great_circle_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[derive(Debug, Clone)]
pub struct NearestKSelector<'a> {
    matcher: &'a CountryMatcher,
    config: SelectionConfig,
}

impl<'a> NearestKSelector<'a> {
    pub fn new(matcher: &'a CountryMatcher, config: SelectionConfig) -> Self {
        Self { matcher, config }
    }

    /// The closest matching film locations, nearest first.
    ///
    /// Films are visited in dataset order, each film's locations in name order.
    /// Locations that do not match the region, or do not resolve at any level,
    /// are dropped. Ties keep visiting order. Geocoding errors abort the selection.
    #[instrument(name = "Select nearest", level = "info", skip(self, geocoder, films))]
    pub fn select<P: GeocodingProvider>(
        &self,
        geocoder: &Geocoder<P>,
        position: Coordinate,
        films: &FilmLocations,
        country: &str,
        sub_region: Option<&str>,
    ) -> Result<Vec<Candidate>, GeocodeError> {
        let t_select = std::time::Instant::now();
        let pairs: Vec<(&str, &str)> = films
            .iter()
            .flat_map(|(title, locations)| {
                locations
                    .iter()
                    .map(move |location| (title.as_str(), location.as_str()))
            })
            .filter(|(_, location)| self.matcher.matches(location, country, sub_region))
            .collect();
        debug!(matching = pairs.len(), "Filtered film locations by region");

        let resolve = |&(title, location): &(&str, &str)| -> Result<Option<Candidate>, GeocodeError> {
            let Some(coordinate) = geocoder.progressive_forward(location)? else {
                debug!(title, location, "Dropping unresolved location");
                return Ok(None);
            };
            Ok(Some(Candidate {
                title: title.to_string(),
                location: location.to_string(),
                distance_km: great_circle_km(position, coordinate),
                coordinate,
            }))
        };

        let resolved: Vec<Option<Candidate>> = if self.config.parallel_geocoding {
            pairs.par_iter().map(resolve).collect::<Result<_, _>>()?
        } else {
            pairs.iter().map(resolve).collect::<Result<_, _>>()?
        };

        let mut candidates: Vec<Candidate> = resolved.into_iter().flatten().collect();
        let resolved_count = candidates.len();
        candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        candidates.truncate(self.config.effective_limit());

        info!(
            resolved = resolved_count,
            selected = candidates.len(),
            elapsed = ?t_select.elapsed(),
            "Selected nearest film locations"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::geocode::{InMemoryProvider, RetryPolicy, RunBudget};
    use crate::matcher::CountryTables;

    fn films(entries: &[(&str, Vec<&str>)]) -> FilmLocations {
        entries
            .iter()
            .map(|(title, locations)| {
                (
                    (*title).to_string(),
                    locations.iter().map(|l| (*l).to_string()).collect::<BTreeSet<_>>(),
                )
            })
            .collect()
    }

    fn geocoder(provider: &InMemoryProvider) -> Geocoder<&InMemoryProvider> {
        Geocoder::new(provider, RetryPolicy::immediate(2), RunBudget::unlimited())
    }

    #[test]
    fn test_great_circle_distance() {
        let paris = Coordinate::new(48.8566, 2.3522);
        let london = Coordinate::new(51.5074, -0.1278);
        let d = great_circle_km(paris, london);
        assert!((d - 343.5).abs() < 2.0, "got {d}");
        assert!(great_circle_km(paris, paris).abs() < 1e-9);
    }

    #[test]
    fn test_selects_nearest_in_order() {
        let user = Coordinate::new(49.84, 24.03);
        let provider = InMemoryProvider::new()
            .with_place("Rynok Square, Lviv, Ukraine", Coordinate::new(49.841, 24.031))
            .with_place("Khreshchatyk, Kyiv, Ukraine", Coordinate::new(50.447, 30.522))
            .with_place("Potemkin Stairs, Odesa, Ukraine", Coordinate::new(46.488, 30.741))
            .with_place("Old Town, Warsaw, Poland", Coordinate::new(52.25, 21.01));
        let films = films(&[
            ("Far", vec!["Potemkin Stairs, Odesa, Ukraine"]),
            ("Near", vec!["Rynok Square, Lviv, Ukraine"]),
            ("Middle", vec!["Khreshchatyk, Kyiv, Ukraine", "Old Town, Warsaw, Poland"]),
        ]);
        let matcher = CountryMatcher::new(CountryTables::builtin());
        let selector = NearestKSelector::new(&matcher, SelectionConfig::default());

        let selected = selector
            .select(&geocoder(&provider), user, &films, "Ukraine", None)
            .unwrap();

        let titles: Vec<&str> = selected.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Near", "Middle", "Far"]);
        assert!(selected.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
        assert!(!provider.calls().iter().any(|q| q.contains("Warsaw")));
    }

    #[test]
    fn test_output_is_capped() {
        let user = Coordinate::new(48.85, 2.35);
        let mut provider = InMemoryProvider::new();
        let mut entries = Vec::new();
        for i in 0..15 {
            let location = format!("Spot {i}, Paris, France");
            provider = provider.with_place(location.clone(), Coordinate::new(48.85 + f64::from(i) * 0.01, 2.35));
            entries.push((format!("Film {i:02}"), location));
        }
        let films: FilmLocations = entries
            .into_iter()
            .map(|(title, location)| (title, BTreeSet::from([location])))
            .collect();
        let matcher = CountryMatcher::default();

        let selector = NearestKSelector::new(&matcher, SelectionConfig::default());
        let selected = selector
            .select(&geocoder(&provider), user, &films, "France", None)
            .unwrap();
        assert_eq!(selected.len(), MAX_CANDIDATES);
        assert_eq!(selected[0].title, "Film 00");

        let selector = NearestKSelector::new(
            &matcher,
            SelectionConfig {
                limit: 3,
                parallel_geocoding: false,
            },
        );
        let selected = selector
            .select(&geocoder(&provider), user, &films, "France", None)
            .unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let user = Coordinate::new(0.0, 0.0);
        let spot = Coordinate::new(1.0, 1.0);
        let provider = InMemoryProvider::new().with_place("Lagos, Nigeria", spot);
        let films = films(&[
            ("B", vec!["Studio, Lagos, Nigeria"]),
            ("A", vec!["Beach, Lagos, Nigeria"]),
        ]);
        let matcher = CountryMatcher::default();
        let selector = NearestKSelector::new(&matcher, SelectionConfig::default());

        let selected = selector
            .select(&geocoder(&provider), user, &films, "Nigeria", None)
            .unwrap();

        let titles: Vec<&str> = selected.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(selected[0].distance_km.to_bits(), selected[1].distance_km.to_bits());
    }

    #[test]
    fn test_tied_cut_keeps_earliest_films() {
        let user = Coordinate::new(49.84, 24.03);
        let provider = InMemoryProvider::new().with_place("Lviv, Ukraine", Coordinate::new(49.84, 24.03));
        let titles = [
            "Zulu", "Yankee", "Xray", "Whiskey", "Victor", "Uniform", "Tango", "Sierra", "Romeo", "Quebec",
            "Papa", "Alpha",
        ];
        let entries: Vec<(&str, Vec<&str>)> = titles
            .iter()
            .map(|title| (*title, vec!["Set, Lviv, Ukraine"]))
            .collect();
        let films = films(&entries);
        let matcher = CountryMatcher::default();

        for parallel_geocoding in [false, true] {
            let selector = NearestKSelector::new(
                &matcher,
                SelectionConfig {
                    limit: MAX_CANDIDATES,
                    parallel_geocoding,
                },
            );
            let selected = selector
                .select(&geocoder(&provider), user, &films, "Ukraine", None)
                .unwrap();

            let kept: Vec<&str> = selected.iter().map(|c| c.title.as_str()).collect();
            assert_eq!(kept, titles[..MAX_CANDIDATES].to_vec());
        }
    }

    #[test]
    fn test_unresolved_locations_are_dropped() {
        let user = Coordinate::new(35.68, 139.69);
        let provider = InMemoryProvider::new()
            .with_place("Shibuya Crossing, Tokyo, Japan", Coordinate::new(35.659, 139.700));
        let films = films(&[
            ("Found", vec!["Shibuya Crossing, Tokyo, Japan"]),
            ("Lost", vec!["Imaginary Lane, Nowhere, Atlantis"]),
            ("Also Lost", vec!["Hidden Set, Secret Town, Japan"]),
        ]);
        let matcher = CountryMatcher::default();
        let selector = NearestKSelector::new(&matcher, SelectionConfig::default());

        let selected = selector
            .select(&geocoder(&provider), user, &films, "Japan", None)
            .unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].title, "Found");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let user = Coordinate::new(-33.87, 151.21);
        let mut provider = InMemoryProvider::new();
        let mut entries = Vec::new();
        for i in 0..20 {
            let location = format!("Set {i}, Sydney, Australia");
            let offset = f64::from((i * 7) % 20) * 0.05;
            provider = provider.with_place(location.clone(), Coordinate::new(-33.87 + offset, 151.21));
            entries.push((format!("Film {i:02}"), location));
        }
        let films: FilmLocations = entries
            .into_iter()
            .map(|(title, location)| (title, BTreeSet::from([location])))
            .collect();
        let matcher = CountryMatcher::default();

        let sequential = NearestKSelector::new(&matcher, SelectionConfig::default())
            .select(&geocoder(&provider), user, &films, "Australia", None)
            .unwrap();
        let parallel = NearestKSelector::new(
            &matcher,
            SelectionConfig {
                limit: MAX_CANDIDATES,
                parallel_geocoding: true,
            },
        )
        .select(&geocoder(&provider), user, &films, "Australia", None)
        .unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_limit_is_clamped() {
        let zero = SelectionConfig {
            limit: 0,
            parallel_geocoding: false,
        };
        let huge = SelectionConfig {
            limit: 500,
            parallel_geocoding: false,
        };
        assert_eq!(zero.effective_limit(), 1);
        assert_eq!(huge.effective_limit(), MAX_CANDIDATES);
    }
}
