//! End-to-end pipeline: user input and dataset in, [`FilmMap`] out.

use std::path::Path;

use reelmap_dataset::{CountryCounts, ParsedDataset, read_dataset};
use serde::Serialize;
use tracing::{info, instrument};

use crate::collision::{CollisionResolver, PlacedFilm};
use crate::config::FinderConfig;
use crate::error::{ReelmapError, Result};
use crate::geocode::{CancelHandle, Coordinate, Geocoder, GeocodingProvider, RunBudget};
use crate::matcher::{CountryMatcher, UserRegion};
use crate::select::{Candidate, NearestKSelector, SelectionConfig};

/// Earliest and latest years accepted as a target year.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

/// A validated position and target year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UserInput {
    pub position: Coordinate,
    pub year: i32,
}

impl UserInput {
    pub fn new(latitude: f64, longitude: f64, year: i32) -> Result<Self> {
        let position = Coordinate::new(latitude, longitude);
        if !position.is_valid() {
            return Err(ReelmapError::InvalidInput(format!(
                "position ({position}) is outside [-90, 90] x [-180, 180]"
            )));
        }
        if !YEAR_RANGE.contains(&year) {
            return Err(ReelmapError::InvalidInput(format!(
                "year {year} is not a four-digit year"
            )));
        }
        Ok(Self { position, year })
    }
}

/// Everything the map renderer consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilmMap {
    pub position: Coordinate,
    pub year: i32,
    pub region: UserRegion,
    /// Selected candidates, nearest first, before collision resolution
    pub nearest: Vec<Candidate>,
    /// The same films with their final marker positions
    pub films: Vec<PlacedFilm>,
    #[serde(skip)]
    pub country_counts: CountryCounts,
}

/// Runs the pipeline for one user against one provider.
///
/// The run deadline starts when the finder is created.
#[derive(Debug)]
pub struct FilmFinder<P> {
    geocoder: Geocoder<P>,
    matcher: CountryMatcher,
    selection: SelectionConfig,
    resolver: CollisionResolver,
    layout: reelmap_dataset::DatasetLayout,
}

impl<P: GeocodingProvider> FilmFinder<P> {
    pub fn new(provider: P, config: &FinderConfig) -> Self {
        Self::with_budget(provider, config, RunBudget::from_timeout(config.deadline))
    }

    pub fn with_budget(provider: P, config: &FinderConfig, budget: RunBudget) -> Self {
        Self {
            geocoder: Geocoder::new(provider, config.retry, budget)
                .with_language(config.language.clone()),
            matcher: CountryMatcher::new(config.country_tables.clone()),
            selection: config.selection,
            resolver: CollisionResolver::new(config.collision_step),
            layout: config.layout,
        }
    }

    /// Handle that aborts the run from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.geocoder.budget().cancel_handle()
    }

    pub fn geocoder(&self) -> &Geocoder<P> {
        &self.geocoder
    }

    /// Find the films nearest to the user among an already parsed dataset.
    #[instrument(name = "Find films", level = "info", skip(self, dataset), fields(year = input.year))]
    pub fn find(&self, input: UserInput, dataset: &ParsedDataset) -> Result<FilmMap> {
        let t_find = std::time::Instant::now();
        if dataset.year != input.year {
            return Err(ReelmapError::InvalidInput(format!(
                "dataset was parsed for {} but {} was requested",
                dataset.year, input.year
            )));
        }

        let region = self.matcher.classify(input.position, &self.geocoder)?;

        let nearest = NearestKSelector::new(&self.matcher, self.selection).select(
            &self.geocoder,
            input.position,
            &dataset.film_locations,
            &region.country,
            region.sub_region.as_deref(),
        )?;
        let films = self.resolver.resolve(&nearest);

        info!(films = films.len(), elapsed = ?t_find.elapsed(), "Film search complete");
        Ok(FilmMap {
            position: input.position,
            year: input.year,
            region,
            nearest,
            films,
            country_counts: dataset.country_counts.clone(),
        })
    }

    /// Parse the dataset at `path` for the input year, then [`Self::find`].
    pub fn find_in_file(&self, input: UserInput, path: impl AsRef<Path>) -> Result<FilmMap> {
        let dataset = read_dataset(path, input.year, self.layout)?;
        self.find(input, &dataset)
    }
}
