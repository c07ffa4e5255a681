use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use reelmap_dataset::DatasetLayout;
use serde::Deserialize;

use crate::collision::DEFAULT_COLLISION_STEP;
use crate::error::{ReelmapError, Result};
use crate::geocode::{DEFAULT_LANGUAGE, NominatimConfig, RetryPolicy};
use crate::matcher::CountryTables;
use crate::select::{MAX_CANDIDATES, SelectionConfig};

/// Everything a [`crate::FilmFinder`] run needs besides the provider and its input.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderConfig {
    pub retry: RetryPolicy,
    /// Overall time limit for the run, measured from finder construction
    pub deadline: Option<Duration>,
    pub selection: SelectionConfig,
    /// Latitude shift applied per repeated distance, in degrees
    pub collision_step: f64,
    /// Language requested for the user's reverse-geocoded address
    pub language: String,
    pub layout: DatasetLayout,
    pub country_tables: CountryTables,
    pub nominatim: NominatimConfig,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            deadline: None,
            selection: SelectionConfig::default(),
            collision_step: DEFAULT_COLLISION_STEP,
            language: DEFAULT_LANGUAGE.to_string(),
            layout: DatasetLayout::default(),
            country_tables: CountryTables::builtin(),
            nominatim: NominatimConfig::default(),
        }
    }
}

/// Builder for creating finder configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct FinderConfigBuilder {
    config: FinderConfig,
}

impl FinderConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: FinderConfig::default(),
        }
    }

    /// Create a builder for a busy provider: many retries, long waits, no deadline
    pub fn patient() -> Self {
        let mut builder = Self::new();
        builder.config.retry = RetryPolicy::patient();
        builder.config.deadline = None;
        builder
    }

    /// Create a builder that gives up early: few retries and a five minute deadline
    pub fn fast() -> Self {
        let mut builder = Self::new();
        builder.config.retry = RetryPolicy::fast();
        builder.config.deadline = Some(Duration::from_secs(300));
        builder.config.nominatim.request_timeout = Duration::from_secs(5);
        builder
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the total attempts per geocoding query, including the first
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn backoff(mut self, initial: Duration, multiplier: f64, max: Duration) -> Self {
        self.config.retry.initial_backoff = initial;
        self.config.retry.backoff_multiplier = multiplier;
        self.config.retry.max_backoff = max;
        self
    }

    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.config.deadline = deadline;
        self
    }

    /// Set the number of films selected (1 to 10)
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.selection.limit = limit.clamp(1, MAX_CANDIDATES);
        self
    }

    pub fn parallel_geocoding(mut self, enabled: bool) -> Self {
        self.config.selection.parallel_geocoding = enabled;
        self
    }

    pub fn collision_step(mut self, step: f64) -> Self {
        self.config.collision_step = step;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn layout(mut self, layout: DatasetLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn country_tables(mut self, tables: CountryTables) -> Self {
        self.config.country_tables = tables;
        self
    }

    pub fn nominatim(mut self, nominatim: NominatimConfig) -> Self {
        self.config.nominatim = nominatim;
        self
    }

    /// Layer a config file over the current settings
    pub fn with_file(self, file: ConfigFile) -> Result<Self> {
        file.apply(self)
    }

    /// Validate and build the final configuration
    pub fn build(self) -> Result<FinderConfig> {
        let config = self.config;
        if config.retry.max_attempts == 0 {
            return Err(ReelmapError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !config.retry.backoff_multiplier.is_finite() || config.retry.backoff_multiplier < 1.0 {
            return Err(ReelmapError::ConfigError(format!(
                "backoff_multiplier must be at least 1.0, got {}",
                config.retry.backoff_multiplier
            )));
        }
        if !config.collision_step.is_finite() || config.collision_step < 0.0 {
            return Err(ReelmapError::ConfigError(format!(
                "collision_step must be a non-negative number, got {}",
                config.collision_step
            )));
        }
        if config.language.trim().is_empty() {
            return Err(ReelmapError::ConfigError(
                "language must not be empty".to_string(),
            ));
        }
        if let DatasetLayout::Fixed {
            header_lines,
            footer_lines,
        } = config.layout
            && header_lines.checked_add(footer_lines).is_none()
        {
            return Err(ReelmapError::ConfigError(
                "layout header and footer are too large".to_string(),
            ));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryFile {
    pub max_attempts: Option<u32>,
    pub initial_backoff_secs: Option<f64>,
    pub backoff_multiplier: Option<f64>,
    pub max_backoff_secs: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LayoutFile {
    Fixed {
        header_lines: usize,
        footer_lines: usize,
    },
    Detect,
}

impl From<LayoutFile> for DatasetLayout {
    fn from(layout: LayoutFile) -> Self {
        match layout {
            LayoutFile::Fixed {
                header_lines,
                footer_lines,
            } => Self::Fixed {
                header_lines,
                footer_lines,
            },
            LayoutFile::Detect => Self::Detect,
        }
    }
}

/// On-disk configuration. Every field is optional; missing fields keep the
/// builder's value. `aliases` extend the built-in alias table,
/// `large_countries` replaces the built-in set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub retry: RetryFile,
    pub deadline_secs: Option<f64>,
    pub limit: Option<usize>,
    pub parallel_geocoding: Option<bool>,
    pub collision_step: Option<f64>,
    pub language: Option<String>,
    pub layout: Option<LayoutFile>,
    pub aliases: BTreeMap<String, String>,
    pub large_countries: Option<Vec<String>>,
    pub nominatim: Option<NominatimConfig>,
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| ReelmapError::ConfigError(format!("{field}: {e}")))
}

impl ConfigFile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn apply(self, mut builder: FinderConfigBuilder) -> Result<FinderConfigBuilder> {
        let config = &mut builder.config;

        if let Some(attempts) = self.retry.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(secs) = self.retry.initial_backoff_secs {
            config.retry.initial_backoff = seconds("initial_backoff_secs", secs)?;
        }
        if let Some(multiplier) = self.retry.backoff_multiplier {
            config.retry.backoff_multiplier = multiplier;
        }
        if let Some(secs) = self.retry.max_backoff_secs {
            config.retry.max_backoff = seconds("max_backoff_secs", secs)?;
        }
        if let Some(secs) = self.deadline_secs {
            config.deadline = Some(seconds("deadline_secs", secs)?);
        }
        if let Some(limit) = self.limit {
            config.selection.limit = limit.clamp(1, MAX_CANDIDATES);
        }
        if let Some(parallel) = self.parallel_geocoding {
            config.selection.parallel_geocoding = parallel;
        }
        if let Some(step) = self.collision_step {
            config.collision_step = step;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(layout) = self.layout {
            config.layout = layout.into();
        }

        let mut tables = std::mem::take(&mut config.country_tables);
        for (raw, canonical) in self.aliases {
            tables = tables.with_alias(raw, canonical);
        }
        if let Some(large) = self.large_countries {
            tables = tables.with_large_countries(large);
        }
        config.country_tables = tables;

        if let Some(nominatim) = self.nominatim {
            config.nominatim = nominatim;
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_builder() {
        let config = FinderConfigBuilder::new().build().unwrap();
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.selection.limit, MAX_CANDIDATES);
        assert!(!config.selection.parallel_geocoding);
        assert_eq!(config.deadline, None);
        assert_eq!(config.language, "en");
        assert_eq!(config.layout, DatasetLayout::default());
        assert!((config.collision_step - 0.0001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_presets() {
        let fast = FinderConfigBuilder::fast().build().unwrap();
        assert_eq!(fast.retry.max_attempts, 3);
        assert_eq!(fast.deadline, Some(Duration::from_secs(300)));

        let patient = FinderConfigBuilder::patient().build().unwrap();
        assert_eq!(patient.retry.max_attempts, 10);
        assert_eq!(patient.deadline, None);
    }

    #[test]
    fn test_override_presets() {
        let config = FinderConfigBuilder::fast()
            .deadline(None)
            .limit(4)
            .parallel_geocoding(true)
            .build()
            .unwrap();

        assert_eq!(config.deadline, None);
        assert_eq!(config.selection.limit, 4);
        assert!(config.selection.parallel_geocoding);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_limit_is_clamped() {
        let config = FinderConfigBuilder::new().limit(0).build().unwrap();
        assert_eq!(config.selection.limit, 1);
        let config = FinderConfigBuilder::new().limit(99).build().unwrap();
        assert_eq!(config.selection.limit, MAX_CANDIDATES);
    }

    #[test]
    fn test_validation() {
        assert!(FinderConfigBuilder::new().max_attempts(0).build().is_err());
        assert!(
            FinderConfigBuilder::new()
                .backoff(Duration::from_secs(1), 0.5, Duration::from_secs(4))
                .build()
                .is_err()
        );
        assert!(FinderConfigBuilder::new().collision_step(-1.0).build().is_err());
        assert!(FinderConfigBuilder::new().language(" ").build().is_err());
    }

    #[test]
    fn test_config_file_layers_over_defaults() {
        let file = ConfigFile::from_json_str(
            r#"{
                "retry": {"max_attempts": 7, "initial_backoff_secs": 0.25},
                "deadline_secs": 90,
                "limit": 5,
                "language": "uk",
                "layout": {"mode": "detect"},
                "aliases": {"Deutschland": "Germany"},
                "nominatim": {"base_url": "http://localhost:8080", "min_request_interval": 0}
            }"#,
        )
        .unwrap();

        let config = FinderConfigBuilder::new()
            .with_file(file)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.retry.max_backoff, RetryPolicy::default().max_backoff);
        assert_eq!(config.deadline, Some(Duration::from_secs(90)));
        assert_eq!(config.selection.limit, 5);
        assert_eq!(config.language, "uk");
        assert_eq!(config.layout, DatasetLayout::Detect);
        assert_eq!(config.country_tables.canonical("Deutschland"), "Germany");
        assert_eq!(config.country_tables.canonical("United States"), "USA");
        assert!(config.country_tables.is_large("USA"));
        assert_eq!(config.nominatim.base_url, "http://localhost:8080");
        assert_eq!(config.nominatim.min_request_interval, Duration::ZERO);
        assert_eq!(config.nominatim.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_file_replaces_large_countries() {
        let file = ConfigFile::from_json_str(
            r#"{"large_countries": ["France"], "layout": {"mode": "fixed", "header_lines": 3, "footer_lines": 0}}"#,
        )
        .unwrap();
        let config = FinderConfigBuilder::new()
            .with_file(file)
            .unwrap()
            .build()
            .unwrap();

        assert!(config.country_tables.is_large("France"));
        assert!(!config.country_tables.is_large("USA"));
        assert_eq!(
            config.layout,
            DatasetLayout::Fixed {
                header_lines: 3,
                footer_lines: 0
            }
        );
    }

    #[test]
    fn test_config_file_rejects_bad_values() {
        assert!(ConfigFile::from_json_str(r#"{"unknown_key": 1}"#).is_err());

        let file = ConfigFile::from_json_str(r#"{"deadline_secs": -5}"#).unwrap();
        assert!(matches!(
            FinderConfigBuilder::new().with_file(file),
            Err(ReelmapError::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_file_huge_multiplier_stays_capped() {
        let file = ConfigFile::from_json_str(
            r#"{"retry": {"max_attempts": 3, "initial_backoff_secs": 0.0001, "backoff_multiplier": 1e30}}"#,
        )
        .unwrap();
        let config = FinderConfigBuilder::new().with_file(file).unwrap().build().unwrap();

        let retry = config.retry;
        let second = retry.next_backoff(retry.initial_backoff);
        assert_eq!(second, retry.max_backoff);
        assert_eq!(retry.next_backoff(second), retry.max_backoff);
    }

    #[test]
    fn test_config_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"parallel_geocoding": true, "collision_step": 0.001}}"#).unwrap();

        let config = FinderConfigBuilder::new()
            .with_file(ConfigFile::from_json_file(file.path()).unwrap())
            .unwrap()
            .build()
            .unwrap();

        assert!(config.selection.parallel_geocoding);
        assert!((config.collision_step - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_config_file() {
        let result = ConfigFile::from_json_file("/no/such/reelmap/config.json");
        assert!(matches!(result, Err(ReelmapError::Io(_))));
    }
}
