//! Country and sub-region matching between the user and dataset locations.
//!
//! The user's position is reverse geocoded once. Its country (after alias
//! canonicalization) and, for addresses with more than three components, its
//! state-level sub-region decide which dataset locations are candidates. For
//! countries in the large-country set a location must also share the user's
//! sub-region.

use ahash::{AHashMap, AHashSet};
use reelmap_dataset::LocationString;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::geocode::{Coordinate, GeocodeError, Geocoder, GeocodingProvider};

/// Locations with fewer tokens than this never match.
pub const MIN_LOCATION_TOKENS: usize = 3;

/// Addresses need more tokens than this to yield a sub-region.
pub const SUB_REGION_MIN_ADDRESS_TOKENS: usize = 3;

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("United States", "USA"),
    ("United States of America", "USA"),
    ("United Kingdom", "UK"),
    ("Czechia", "Czech Republic"),
    ("Russian Federation", "Russia"),
    ("Türkiye", "Turkey"),
    ("Viet Nam", "Vietnam"),
    ("People's Republic of China", "China"),
];

const BUILTIN_LARGE_COUNTRIES: &[&str] = &[
    "USA", "Canada", "Russia", "Australia", "Brazil", "China", "India", "UK", "Germany", "Mexico",
];

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Could not determine an address for position {0}")]
    UserNotLocated(Coordinate),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Country-name aliases and the set of countries matched by sub-region.
///
/// Geocoder addresses and dataset locations name some countries differently
/// ("United States" vs "USA"); both sides are mapped to the canonical
/// spelling before comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryTables {
    aliases: AHashMap<String, String>,
    large: AHashSet<String>,
}

impl Default for CountryTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CountryTables {
    pub fn builtin() -> Self {
        Self {
            aliases: BUILTIN_ALIASES
                .iter()
                .map(|&(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
            large: BUILTIN_LARGE_COUNTRIES.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    pub fn new(
        aliases: impl IntoIterator<Item = (String, String)>,
        large: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            aliases: aliases.into_iter().collect(),
            large: large.into_iter().collect(),
        }
    }

    pub fn with_alias(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(raw.into(), canonical.into());
        self
    }

    pub fn with_large_country(mut self, country: impl Into<String>) -> Self {
        self.large.insert(country.into());
        self
    }

    /// Replace the large-country set.
    pub fn with_large_countries(mut self, countries: impl IntoIterator<Item = String>) -> Self {
        self.large = countries.into_iter().collect();
        self
    }

    /// The canonical spelling of `country`; unknown names map to themselves.
    pub fn canonical<'a>(&'a self, country: &'a str) -> &'a str {
        self.aliases.get(country).map_or(country, String::as_str)
    }

    pub fn is_large(&self, canonical_country: &str) -> bool {
        self.large.contains(canonical_country)
    }
}

/// Where the user is, as far as matching is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRegion {
    /// Canonical country name
    pub country: String,
    pub sub_region: Option<String>,
    /// The reverse-geocoded address the region was read from
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct CountryMatcher {
    tables: CountryTables,
}

impl CountryMatcher {
    pub fn new(tables: CountryTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &CountryTables {
        &self.tables
    }

    /// Reverse geocode `position` and read the user's region from the address.
    #[instrument(name = "Classify user", level = "info", skip(self, geocoder))]
    pub fn classify<P: GeocodingProvider>(
        &self,
        position: Coordinate,
        geocoder: &Geocoder<P>,
    ) -> Result<UserRegion, MatchError> {
        let address = geocoder
            .reverse(position)?
            .ok_or(MatchError::UserNotLocated(position))?;
        let region = self.region_from_address(&address);
        info!(
            country = %region.country,
            sub_region = region.sub_region.as_deref().unwrap_or("-"),
            "User located"
        );
        Ok(region)
    }

    /// Country and sub-region of a `", "`-separated address.
    pub fn region_from_address(&self, address: &str) -> UserRegion {
        let tokens = LocationString::parse(address);
        let country = self.tables.canonical(tokens.country()).to_string();
        let sub_region = if tokens.len() > SUB_REGION_MIN_ADDRESS_TOKENS {
            tokens.second_level().map(str::to_string)
        } else {
            None
        };
        UserRegion {
            country,
            sub_region,
            address: address.to_string(),
        }
    }

    /// Whether a dataset location lies in the user's country (and sub-region,
    /// for large countries when the user's sub-region is known).
    pub fn matches(&self, location: &str, country: &str, sub_region: Option<&str>) -> bool {
        let location = LocationString::parse(location);
        if location.len() < MIN_LOCATION_TOKENS {
            return false;
        }
        if self.tables.canonical(location.country()) != country {
            return false;
        }
        match sub_region {
            Some(expected) if self.tables.is_large(country) => {
                let matched = location.second_level() == Some(expected);
                if !matched {
                    debug!(location = location.as_str(), expected, "Sub-region mismatch");
                }
                matched
            }
            _ => true,
        }
    }

    pub fn matches_region(&self, location: &str, region: &UserRegion) -> bool {
        self.matches(location, &region.country, region.sub_region.as_deref())
    }
}
