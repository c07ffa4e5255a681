//! Deterministic provider backed by lookup tables.
//!
//! Used by tests and demos in place of a network service. Timeouts and HTTP
//! failures can be scripted per query to exercise retry handling.

use std::sync::Mutex;

use ahash::AHashMap;

use super::{Coordinate, GeocodingProvider, ProviderError};
use crate::select::great_circle_km;

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    places: AHashMap<String, Coordinate>,
    addresses: Vec<(Coordinate, String)>,
    timeouts: Mutex<AHashMap<String, u32>>,
    failures: AHashMap<String, u16>,
    calls: Mutex<Vec<String>>,
    languages: Mutex<Vec<String>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer forward queries equal to `query` with `coordinate`.
    pub fn with_place(mut self, query: impl Into<String>, coordinate: Coordinate) -> Self {
        self.places.insert(query.into(), coordinate);
        self
    }

    /// Reverse queries resolve to the address registered nearest to the position.
    pub fn with_address(mut self, coordinate: Coordinate, address: impl Into<String>) -> Self {
        self.addresses.push((coordinate, address.into()));
        self
    }

    /// Time out the first `count` requests for `query`.
    pub fn with_timeouts(self, query: impl Into<String>, count: u32) -> Self {
        if let Ok(mut timeouts) = self.timeouts.lock() {
            timeouts.insert(query.into(), count);
        }
        self
    }

    /// Fail every request for `query` with an HTTP status.
    pub fn with_failure(mut self, query: impl Into<String>, status: u16) -> Self {
        self.failures.insert(query.into(), status);
        self
    }

    /// Every query received so far, in order, retries included.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    /// Languages requested by reverse queries.
    pub fn languages(&self) -> Vec<String> {
        self.languages
            .lock()
            .map(|languages| languages.clone())
            .unwrap_or_default()
    }

    fn record(&self, query: &str) -> Result<(), ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.to_string());
        }
        if let Some(&status) = self.failures.get(query) {
            return Err(ProviderError::Http { status });
        }
        if let Ok(mut timeouts) = self.timeouts.lock()
            && let Some(remaining) = timeouts.get_mut(query)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ProviderError::Timeout(format!("scripted timeout for '{query}'")));
        }
        Ok(())
    }
}

impl GeocodingProvider for InMemoryProvider {
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, ProviderError> {
        self.record(query)?;
        Ok(self.places.get(query).copied())
    }

    fn reverse(
        &self,
        position: Coordinate,
        language: &str,
    ) -> Result<Option<String>, ProviderError> {
        self.record(&position.to_string())?;
        if let Ok(mut languages) = self.languages.lock() {
            languages.push(language.to_string());
        }
        Ok(self
            .addresses
            .iter()
            .min_by(|(a, _), (b, _)| {
                great_circle_km(position, *a).total_cmp(&great_circle_km(position, *b))
            })
            .map(|(_, address)| address.clone()))
    }
}
