use polars::prelude::PolarsError;
use thiserror::Error;
pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Dataset file not found: {}", .0.display())]
    DatasetNotFound(std::path::PathBuf),
    #[error("Could not find the '{0}' marker in the dataset header")]
    MarkerNotFound(&'static str),
}
