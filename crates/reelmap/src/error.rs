use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelmapError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] reelmap_dataset::DataError),
    #[error("Geocoding error: {0}")]
    Geocode(#[from] crate::geocode::GeocodeError),
    #[error("Provider error: {0}")]
    Provider(#[from] crate::geocode::ProviderError),
    #[error("Country matching error: {0}")]
    Match(#[from] crate::matcher::MatchError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ReelmapError>;
