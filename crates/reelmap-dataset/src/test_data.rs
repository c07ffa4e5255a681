use std::io::Write;

use tempfile::NamedTempFile;
use tracing::info;

use super::error::Result;
use crate::layout::{DEFAULT_HEADER_LINES, LOCATIONS_LIST_MARKER};

/// Locations cycled through by the generator, most specific first.
pub const TEST_LOCATIONS: &[&str] = &[
    "Griffith Observatory, 2800 East Observatory Road, Los Angeles, California, USA",
    "Venice Beach, Venice, Los Angeles, California, USA",
    "Alamo Square, San Francisco, California, USA",
    "Congress Avenue Bridge, Austin, Texas, USA",
    "Central Park, Manhattan, New York City, New York, USA",
    "Pinewood Studios, Iver Heath, Buckinghamshire, England, UK",
    "Edinburgh Castle, Edinburgh, Scotland, UK",
    "Montmartre, Paris, France",
    "Vieux Lyon, Lyon, Rhône, France",
    "Rynok Square, Lviv, Lvivs'ka oblast, Ukraine",
    "Gastown, Vancouver, British Columbia, Canada",
];

/// Configuration for synthetic dataset generation
#[derive(Debug, Clone)]
pub struct TestDatasetConfig {
    /// Year whose films the tests ask for
    pub year: i32,
    /// Number of distinct films released in `year`
    pub films: usize,
    /// Number of records from other years or with unreadable year markers
    pub other_records: usize,
    /// Number of malformed lines sprinkled in the record block
    pub malformed_lines: usize,
}

impl Default for TestDatasetConfig {
    fn default() -> Self {
        Self::sample()
    }
}

impl TestDatasetConfig {
    /// Minimal data for unit tests
    pub fn minimal() -> Self {
        Self {
            year: 2012,
            films: 3,
            other_records: 12,
            malformed_lines: 1,
        }
    }

    /// Sample data for integration tests
    pub fn sample() -> Self {
        Self {
            year: 2012,
            films: 40,
            other_records: 200,
            malformed_lines: 5,
        }
    }

    pub fn films_in_year(&self) -> usize {
        self.films
    }
}

/// Title used by the generator for the `index`-th film of the target year.
pub fn test_film_title(index: usize) -> String {
    format!("\"Film {index:03}\"")
}

/// Record lines (without header or trailer) for `config`.
///
/// Every third film gets a second location and every fifth film repeats its
/// first line, so location sets must deduplicate.
pub fn test_dataset_records(config: &TestDatasetConfig) -> Vec<String> {
    let mut records = Vec::new();
    let n = TEST_LOCATIONS.len();

    for i in 0..config.films {
        let suffix = if i % 2 == 0 { " {TV}" } else { "" };
        let info = format!("{} ({}){suffix}", test_film_title(i), config.year);
        records.push(format!("{info}\t\t\t{}", TEST_LOCATIONS[i % n]));
        if i % 3 == 0 {
            records.push(format!("{info}\t\t{}", TEST_LOCATIONS[(i + 1) % n]));
        }
        if i % 5 == 0 {
            records.push(format!("{info}\t\t\t{}", TEST_LOCATIONS[i % n]));
        }
    }

    for i in 0..config.other_records {
        let info = if i % 4 == 0 {
            format!("Unknown Year {i} (????)")
        } else {
            format!("Older Film {i} ({})", config.year - 1 - (i % 7) as i32)
        };
        records.push(format!("{info}\t{}", TEST_LOCATIONS[i % n]));
    }

    for i in 0..config.malformed_lines {
        let position = (i * 7).min(records.len());
        records.insert(position, format!("Malformed {i} ({})", config.year));
    }

    records
}

/// Write a complete dataset file in the `locations.list` layout: a 15-line
/// header ending with the `LOCATIONS LIST` marker, the records, and a
/// 2-line trailer.
pub fn create_test_dataset(config: &TestDatasetConfig) -> Result<NamedTempFile> {
    info!("Creating test dataset with config: {:?}", config);

    let mut file = NamedTempFile::with_suffix(".list")?;

    for i in 0..DEFAULT_HEADER_LINES - 2 {
        writeln!(file, "# Header line {i}")?;
    }
    writeln!(file, "{LOCATIONS_LIST_MARKER}")?;
    writeln!(file, "{}", "=".repeat(LOCATIONS_LIST_MARKER.len()))?;

    for record in test_dataset_records(config) {
        // The real file is ISO-8859-1; characters outside it never appear.
        let bytes: Vec<u8> = record
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        file.write_all(&bytes)?;
        writeln!(file)?;
    }

    writeln!(file, "{}", "-".repeat(80))?;
    writeln!(file)?;

    file.flush()?;
    Ok(file)
}
