//! Forward and reverse geocoding.
//!
//! [`GeocodingProvider`] is the seam to the outside world: it answers a single
//! query and may fail with a timeout. [`Geocoder`] wraps a provider with
//! bounded retries on timeouts and with progressive broadening, where a
//! location string that does not resolve is retried without its most specific
//! component until something resolves or only the country is left.

use std::fmt;

use reelmap_dataset::LocationString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

mod memory;
mod nominatim;
mod retry;

pub use memory::InMemoryProvider;
pub use nominatim::{NOMINATIM_URL, NominatimConfig, NominatimProvider, duration_secs};
pub use retry::{CancelHandle, GeocodeError, RetryPolicy, RunBudget};

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite, with latitude in [-90, 90] and longitude in [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("HTTP status {status} from geocoding provider")]
    Http { status: u16 },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Could not decode provider response: {0}")]
    Decode(String),
    #[error("Async runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ProviderError {
    /// Timeout-class failures are the only ones worth retrying.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// An external geocoding service.
///
/// `Ok(None)` means the service answered but knows no such place.
pub trait GeocodingProvider: Send + Sync {
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, ProviderError>;

    /// Address of `position` as a `", "`-separated string, most specific part first.
    fn reverse(&self, position: Coordinate, language: &str)
    -> Result<Option<String>, ProviderError>;
}

impl<P: GeocodingProvider + ?Sized> GeocodingProvider for &P {
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, ProviderError> {
        (**self).forward(query)
    }

    fn reverse(
        &self,
        position: Coordinate,
        language: &str,
    ) -> Result<Option<String>, ProviderError> {
        (**self).reverse(position, language)
    }
}

impl<P: GeocodingProvider + ?Sized> GeocodingProvider for Box<P> {
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, ProviderError> {
        (**self).forward(query)
    }

    fn reverse(
        &self,
        position: Coordinate,
        language: &str,
    ) -> Result<Option<String>, ProviderError> {
        (**self).reverse(position, language)
    }
}

pub const DEFAULT_LANGUAGE: &str = "en";

/// A provider plus the retry policy and run budget every request obeys.
#[derive(Debug)]
pub struct Geocoder<P> {
    provider: P,
    retry: RetryPolicy,
    budget: RunBudget,
    language: String,
}

impl<P: GeocodingProvider> Geocoder<P> {
    pub fn new(provider: P, retry: RetryPolicy, budget: RunBudget) -> Self {
        Self {
            provider,
            retry,
            budget,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Language requested for reverse-geocoded addresses.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn budget(&self) -> &RunBudget {
        &self.budget
    }

    /// Run `call` against the provider, retrying timeouts with backoff.
    ///
    /// Non-timeout errors are returned at once. After `max_attempts` timeouts
    /// the query fails with [`GeocodeError::ProviderUnavailable`]. The run
    /// budget is checked before every attempt and during every wait.
    pub fn resolve_with_retry<T>(
        &self,
        query: &str,
        call: impl Fn(&P) -> Result<T, ProviderError>,
    ) -> Result<T, GeocodeError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0;
        loop {
            self.budget.check()?;
            attempt += 1;
            match call(&self.provider) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_timeout() => {
                    if attempt >= self.retry.max_attempts {
                        warn!(query, attempts = attempt, "Giving up on geocoding query");
                        return Err(GeocodeError::ProviderUnavailable {
                            query: query.to_string(),
                            attempts: attempt,
                            last_error: err,
                        });
                    }
                    warn!(query, attempt, ?backoff, error = %err, "Geocoding request timed out, retrying");
                    self.budget.sleep(backoff)?;
                    backoff = self.retry.next_backoff(backoff);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn forward(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        self.resolve_with_retry(query, |provider| provider.forward(query))
    }

    #[instrument(name = "Reverse geocode", level = "debug", skip(self))]
    pub fn reverse(&self, position: Coordinate) -> Result<Option<String>, GeocodeError> {
        let query = position.to_string();
        self.resolve_with_retry(&query, |provider| {
            provider.reverse(position, &self.language)
        })
    }

    /// Resolve a location string, broadening it on every miss.
    ///
    /// The full string is tried first, then the string without its first
    /// token, and so on. The first hit wins; if even the last token alone does
    /// not resolve, `Ok(None)` is returned. At most one query per token is
    /// issued (not counting timeout retries).
    #[instrument(name = "Progressive forward", level = "debug", skip(self))]
    pub fn progressive_forward(&self, location: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let location = LocationString::parse(location);
        let total = location.len();

        for (i, query) in location.broadening_queries().enumerate() {
            let found = self.forward(&query)?;
            if let Some(coordinate) = found {
                debug!(%query, %coordinate, dropped_tokens = i, "Resolved location");
                return Ok(Some(coordinate));
            }
            if i + 1 < total {
                trace!(%query, "No match, broadening");
            }
        }

        debug!(location = location.as_str(), "Location did not resolve at any level");
        Ok(None)
    }
}
