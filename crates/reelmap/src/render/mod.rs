//! GeoJSON export of a [`FilmMap`].
//!
//! The document holds three layers, told apart by the `layer` property: the
//! user's position, the selected films, and one circle per counted country
//! sized and coloured by how many dataset entries name it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::Result;
use crate::finder::FilmMap;
use crate::geocode::Coordinate;

mod centroids;

pub use centroids::country_centroid;

/// Divisor turning an entry count into a circle radius.
pub const RADIUS_DIVISOR: f64 = 5000.0;

/// Marker colour for a country with `count` entries.
pub fn count_color(count: u64) -> &'static str {
    match count {
        0..1_000 => "blue",
        1_000..20_000 => "green",
        20_000..200_000 => "orange",
        _ => "red",
    }
}

pub fn count_radius(count: u64) -> f64 {
    count as f64 / RADIUS_DIVISOR
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// `[longitude, latitude]`, as GeoJSON orders them
    Point { coordinates: [f64; 2] },
}

impl From<Coordinate> for Geometry {
    fn from(coordinate: Coordinate) -> Self {
        Self::Point {
            coordinates: [coordinate.longitude, coordinate.latitude],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum Properties {
    User {
        address: String,
        country: String,
        sub_region: Option<String>,
        year: i32,
    },
    Film {
        title: String,
        location: String,
        distance_km: f64,
    },
    FilmCount {
        country: String,
        count: u64,
        radius: f64,
        color: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub generated_at: DateTime<Utc>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn layer(&self, name: &str) -> impl Iterator<Item = &Feature> + '_ {
        let name = name.to_string();
        self.features
            .iter()
            .filter(move |feature| feature.properties.layer_name() == name)
    }
}

impl Properties {
    pub fn layer_name(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Film { .. } => "film",
            Self::FilmCount { .. } => "film_count",
        }
    }
}

/// Build the GeoJSON document for `map`, stamped with `generated_at`.
pub fn render(map: &FilmMap, generated_at: DateTime<Utc>) -> FeatureCollection {
    let mut features = Vec::with_capacity(1 + map.films.len() + map.country_counts.len());

    features.push(Feature {
        geometry: map.position.into(),
        properties: Properties::User {
            address: map.region.address.clone(),
            country: map.region.country.clone(),
            sub_region: map.region.sub_region.clone(),
            year: map.year,
        },
    });

    features.extend(map.films.iter().map(|film| Feature {
        geometry: film.coordinate.into(),
        properties: Properties::Film {
            title: film.title.clone(),
            location: film.location.clone(),
            distance_km: film.distance_km,
        },
    }));

    features.extend(map.country_counts.iter().filter_map(|(country, count)| {
        let centre = country_centroid(country)?;
        Some(Feature {
            geometry: centre.into(),
            properties: Properties::FilmCount {
                country: country.to_string(),
                count,
                radius: count_radius(count),
                color: count_color(count),
            },
        })
    }));

    FeatureCollection {
        generated_at,
        features,
    }
}

/// Render `map` and write it to `path` as pretty-printed GeoJSON.
#[instrument(name = "Write map", level = "info", skip(map, path), fields(path = %path.as_ref().display()))]
pub fn write_geojson(map: &FilmMap, path: impl AsRef<Path>) -> Result<FeatureCollection> {
    let document = render(map, Utc::now());
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!(features = document.features.len(), "Map written");
    Ok(document)
}
