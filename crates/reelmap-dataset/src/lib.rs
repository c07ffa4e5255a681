//! Ingestion of the IMDb film locations list.
//!
//! The dataset is a tab-separated, ISO-8859-1 text file. Each record pairs a
//! film's info field (`Title (YEAR) ...`) with a hierarchical location string
//! (`Studio, City, State, Country`). [`parse_lines`] turns the records into the
//! films of one year with their location sets, plus per-country entry totals
//! over the whole file.

mod counts;
mod error;
mod layout;
mod location;
mod parse;
pub mod test_data;

pub use counts::{CountryCounts, MIN_COUNTRY_ENTRIES};
pub use error::{DataError, Result};
pub use layout::{DEFAULT_FOOTER_LINES, DEFAULT_HEADER_LINES, DatasetLayout, LOCATIONS_LIST_MARKER};
pub use location::{LocationString, TOKEN_SEPARATOR, is_numeric_token};
pub use parse::{FilmLocations, FilmRecord, ParsedDataset, decode_latin1, parse_lines, read_dataset};
pub use test_data::{TestDatasetConfig, create_test_dataset};
