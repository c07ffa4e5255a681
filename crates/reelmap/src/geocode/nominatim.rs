//! Blocking client for the OpenStreetMap Nominatim API.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tracing::{debug, trace};

use super::{Coordinate, GeocodingProvider, ProviderError};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying user agent
    pub user_agent: String,
    /// Per-request timeout; hitting it counts as a retryable timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Minimum spacing between consecutive requests
    #[serde(with = "duration_secs")]
    pub min_request_interval: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_URL.to_string(),
            user_agent: concat!("reelmap/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(10),
            min_request_interval: Duration::from_secs(1),
        }
    }
}

/// Durations in config files are written as (fractional) seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Nominatim over HTTP, driven from synchronous code on a private runtime.
#[derive(Debug)]
pub struct NominatimProvider {
    client: Client,
    runtime: Runtime,
    config: NominatimConfig,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimProvider {
    pub fn new(config: NominatimConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        Ok(Self {
            client,
            runtime,
            config,
            last_request: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &NominatimConfig {
        &self.config
    }

    /// Block until `min_request_interval` has passed since the previous request.
    fn throttle(&self) {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            let wait = self
                .config
                .min_request_interval
                .saturating_sub(previous.elapsed());
            if !wait.is_zero() {
                trace!(?wait, "Throttling Nominatim request");
                std::thread::sleep(wait);
            }
        }
        *last = Some(Instant::now());
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        self.throttle();
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        let t_request = Instant::now();

        let result = self.runtime.block_on(async {
            let response = self
                .client
                .get(&url)
                .query(params)
                .send()
                .await
                .map_err(classify)?;
            let status = response.status();
            if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
                return Err(ProviderError::Timeout(format!("{url} answered {status}")));
            }
            if !status.is_success() {
                return Err(ProviderError::Http {
                    status: status.as_u16(),
                });
            }
            response.json::<T>().await.map_err(classify)
        });

        debug!(endpoint, ok = result.is_ok(), elapsed = ?t_request.elapsed(), "Nominatim request");
        result
    }
}

fn classify(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_decode() {
        ProviderError::Decode(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

fn parse_degrees(value: &str) -> Result<f64, ProviderError> {
    value
        .parse()
        .map_err(|_| ProviderError::Decode(format!("Invalid coordinate value '{value}'")))
}

impl SearchHit {
    fn coordinate(&self) -> Result<Coordinate, ProviderError> {
        Ok(Coordinate::new(
            parse_degrees(&self.lat)?,
            parse_degrees(&self.lon)?,
        ))
    }
}

impl GeocodingProvider for NominatimProvider {
    fn forward(&self, query: &str) -> Result<Option<Coordinate>, ProviderError> {
        let hits: Vec<SearchHit> = self.get_json(
            "search",
            &[
                ("q", query.to_string()),
                ("format", "jsonv2".to_string()),
                ("limit", "1".to_string()),
            ],
        )?;
        hits.first().map(SearchHit::coordinate).transpose()
    }

    fn reverse(
        &self,
        position: Coordinate,
        language: &str,
    ) -> Result<Option<String>, ProviderError> {
        let response: ReverseResponse = self.get_json(
            "reverse",
            &[
                ("lat", position.latitude.to_string()),
                ("lon", position.longitude.to_string()),
                ("format", "jsonv2".to_string()),
                ("accept-language", language.to_string()),
            ],
        )?;
        if let Some(error) = response.error {
            debug!(%position, %error, "Reverse geocoding found nothing");
            return Ok(None);
        }
        Ok(response.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_hit_parses_string_coordinates() {
        let hits: Vec<SearchHit> =
            serde_json::from_str(r#"[{"lat": "49.8397", "lon": "24.0297", "name": "Lviv"}]"#).unwrap();
        let coordinate = hits[0].coordinate().unwrap();
        assert_eq!(coordinate, Coordinate::new(49.8397, 24.0297));
    }

    #[test]
    fn test_search_hit_rejects_garbage() {
        let hit = SearchHit {
            lat: "north".into(),
            lon: "0".into(),
        };
        assert!(matches!(hit.coordinate(), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn test_reverse_response_variants() {
        let found: ReverseResponse =
            serde_json::from_str(r#"{"display_name": "Lviv, Lviv Oblast, 79000, Ukraine"}"#).unwrap();
        assert_eq!(found.display_name.as_deref(), Some("Lviv, Lviv Oblast, 79000, Ukraine"));

        let missing: ReverseResponse = serde_json::from_str(r#"{"error": "Unable to geocode"}"#).unwrap();
        assert!(missing.display_name.is_none());
        assert!(missing.error.is_some());
    }

    #[test]
    fn test_config_reads_seconds() {
        let config: NominatimConfig =
            serde_json::from_str(r#"{"request_timeout": 2.5, "min_request_interval": 0}"#).unwrap();
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.min_request_interval, Duration::ZERO);
        assert_eq!(config.base_url, NOMINATIM_URL);
    }

    #[test]
    fn test_throttle_spaces_requests() {
        let provider = NominatimProvider::new(NominatimConfig {
            min_request_interval: Duration::from_millis(40),
            ..NominatimConfig::default()
        })
        .unwrap();
        let started = Instant::now();
        provider.throttle();
        provider.throttle();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
