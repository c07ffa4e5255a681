//! Reelmap - find where the films of a given year were shot near you
//!
//! Reelmap reads the IMDb locations list, keeps the films of one year, and
//! picks the ten shooting locations closest to a position, restricted to the
//! user's country (and state or province, for large countries). Locations are
//! geocoded through a [`GeocodingProvider`], by default the public Nominatim
//! service, broadening each location string until something resolves.
//!
//! # Quick Start
//!
//! ```rust
//! use reelmap::{Coordinate, FilmFinder, FinderConfigBuilder, InMemoryProvider, UserInput};
//! use reelmap::dataset::{DatasetLayout, parse_lines};
//!
//! let provider = InMemoryProvider::new()
//!     .with_address(Coordinate::new(49.84, 24.03), "Rynok Square, Lviv, Lviv Oblast, 79000, Ukraine")
//!     .with_place("Lviv, Lviv Oblast, Ukraine", Coordinate::new(49.84, 24.03));
//!
//! let lines = ["Lviv Story (2012)\tOpera House, Lviv, Lviv Oblast, Ukraine"];
//! let dataset = parse_lines(&lines, 2012, DatasetLayout::Fixed { header_lines: 0, footer_lines: 0 })?;
//!
//! let config = FinderConfigBuilder::new().build()?;
//! let finder = FilmFinder::new(&provider, &config);
//! let map = finder.find(UserInput::new(49.84, 24.03, 2012)?, &dataset)?;
//!
//! assert_eq!(map.films[0].title, "Lviv Story");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Pipeline
//!
//! - **Dataset**: [`dataset::read_dataset`] parses the list into films of the
//!   requested year and per-country entry totals
//! - **Matching**: [`CountryMatcher`] reverse geocodes the user and filters
//!   locations by country and sub-region
//! - **Selection**: [`NearestKSelector`] geocodes the survivors and keeps the
//!   closest ones
//! - **Collisions**: [`CollisionResolver`] separates markers that share a point
//! - **Rendering**: [`render::write_geojson`] exports the result as GeoJSON
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod collision;
mod config;
pub mod error;
mod finder;
mod geocode;
mod matcher;
pub mod render;
mod select;

pub use collision::{CollisionResolver, DEFAULT_COLLISION_STEP, PlacedFilm};
pub use config::{ConfigFile, FinderConfig, FinderConfigBuilder, LayoutFile, RetryFile};
pub use finder::{FilmFinder, FilmMap, UserInput, YEAR_RANGE};
pub use geocode::{
    CancelHandle, Coordinate, DEFAULT_LANGUAGE, GeocodeError, Geocoder, GeocodingProvider,
    InMemoryProvider, NOMINATIM_URL, NominatimConfig, NominatimProvider, ProviderError,
    RetryPolicy, RunBudget, duration_secs,
};
pub use matcher::{
    CountryMatcher, CountryTables, MIN_LOCATION_TOKENS, MatchError, SUB_REGION_MIN_ADDRESS_TOKENS,
    UserRegion,
};
pub use reelmap_dataset as dataset;
pub use select::{
    Candidate, EARTH_RADIUS_KM, MAX_CANDIDATES, NearestKSelector, SelectionConfig, great_circle_km,
};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Reelmap library.
///
/// `RUST_LOG` takes precedence over `level` when set. Subsequent calls are
/// no-ops.
///
/// ```rust
/// use reelmap::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), reelmap::error::ReelmapError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::ReelmapError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
