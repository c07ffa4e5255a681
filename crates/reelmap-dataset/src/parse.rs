//! Parsing of the tab-separated film locations list.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::{CountryCounts, DataError, DatasetLayout, LocationString, Result};

/// Film title → every distinct location string recorded for it.
///
/// Films iterate in the order they first appear in the dataset; that order
/// breaks distance ties during selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilmLocations {
    positions: BTreeMap<String, usize>,
    films: Vec<(String, BTreeSet<String>)>,
}

impl FilmLocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `location` for `title`, appending the film if it is new.
    /// Returns false when the pair was already present.
    pub fn insert(&mut self, title: String, location: String) -> bool {
        self.locations_mut(title).insert(location)
    }

    fn locations_mut(&mut self, title: String) -> &mut BTreeSet<String> {
        let index = match self.positions.entry(title) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = self.films.len();
                self.films.push((entry.key().clone(), BTreeSet::new()));
                *entry.insert(index)
            }
        };
        &mut self.films[index].1
    }

    pub fn get(&self, title: &str) -> Option<&BTreeSet<String>> {
        self.positions.get(title).map(|&index| &self.films[index].1)
    }

    pub fn contains_key(&self, title: &str) -> bool {
        self.positions.contains_key(title)
    }

    pub fn len(&self) -> usize {
        self.films.len()
    }

    pub fn is_empty(&self) -> bool {
        self.films.is_empty()
    }

    /// Films and their locations in dataset order.
    pub fn iter(&self) -> <&Self as IntoIterator>::IntoIter {
        self.into_iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.films.iter().map(|(title, _)| title)
    }

    pub fn values(&self) -> impl Iterator<Item = &BTreeSet<String>> {
        self.films.iter().map(|(_, locations)| locations)
    }
}

impl Index<&str> for FilmLocations {
    type Output = BTreeSet<String>;

    /// Panics when `title` is not present, like the standard maps.
    fn index(&self, title: &str) -> &Self::Output {
        &self.films[self.positions[title]].1
    }
}

type FilmEntry<'a> = (&'a String, &'a BTreeSet<String>);

impl<'a> IntoIterator for &'a FilmLocations {
    type Item = FilmEntry<'a>;
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, BTreeSet<String>)>,
        fn(&'a (String, BTreeSet<String>)) -> FilmEntry<'a>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        let split: fn(&'a (String, BTreeSet<String>)) -> FilmEntry<'a> =
            |(title, locations)| (title, locations);
        self.films.iter().map(split)
    }
}

impl FromIterator<(String, BTreeSet<String>)> for FilmLocations {
    fn from_iter<I: IntoIterator<Item = (String, BTreeSet<String>)>>(iter: I) -> Self {
        let mut films = Self::new();
        for (title, locations) in iter {
            films.locations_mut(title).extend(locations);
        }
        films
    }
}

/// Output of [`parse_lines`].
#[derive(Debug, Clone, Default)]
pub struct ParsedDataset {
    /// The year films were selected for.
    pub year: i32,
    /// Films released in `year` and their locations.
    pub film_locations: FilmLocations,
    /// Per-country entry totals over the whole dataset, irrespective of year.
    pub country_counts: CountryCounts,
}

/// A single film as seen through [`ParsedDataset::films`].
#[derive(Debug, Clone, Copy)]
pub struct FilmRecord<'a> {
    pub title: &'a str,
    pub year: i32,
    pub locations: &'a BTreeSet<String>,
}

impl ParsedDataset {
    pub fn films(&self) -> impl Iterator<Item = FilmRecord<'_>> {
        self.film_locations
            .iter()
            .map(|(title, locations)| FilmRecord {
                title,
                year: self.year,
                locations,
            })
    }

    /// Number of (film, location) pairs.
    pub fn location_count(&self) -> usize {
        self.film_locations.values().map(BTreeSet::len).sum()
    }
}

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Read and parse a dataset file stored in ISO-8859-1.
#[instrument(name = "Read dataset", level = "info", skip(path, layout), fields(path = %path.as_ref().display()))]
pub fn read_dataset(
    path: impl AsRef<Path>,
    desired_year: i32,
    layout: DatasetLayout,
) -> Result<ParsedDataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::DatasetNotFound(path.to_path_buf()));
    }
    let t_read = std::time::Instant::now();
    let text = decode_latin1(&std::fs::read(path)?);
    let lines: Vec<&str> = text.lines().collect();
    info!(lines = lines.len(), elapsed = ?t_read.elapsed(), "Loaded dataset");

    parse_lines(&lines, desired_year, layout)
}

/// Split a raw line into its info and location fields.
///
/// Alignment padding produces runs of tabs, so empty fields are dropped.
/// Lines with fewer than two fields yield `None`.
fn split_record(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.trim_end().split('\t').filter(|field| !field.is_empty());
    let info = fields.next()?;
    let location = fields.next()?;
    Some((info, location))
}

/// Title and year marker of an info field such as `"Alpha" (2012) {TV}`.
///
/// The year is the four characters after the first `(`; the title is
/// everything before that `(` minus one separator character. Returns `None`
/// when the field has no `(`.
fn split_info(info: &str) -> Option<(String, String)> {
    let open = info.find('(')?;
    let year: String = info[open + 1..].chars().take(4).collect();
    let mut title = info[..open].to_string();
    title.pop();
    Some((title, year))
}

fn is_year(candidate: &str, desired: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit()) && candidate == desired
}

/// Parse dataset lines into films of `desired_year` and per-country totals.
///
/// Lines outside the layout's record block are ignored. Malformed lines are
/// skipped. Every well-formed line counts toward its country, whatever its
/// year; only lines whose year marker equals `desired_year` contribute films.
#[instrument(name = "Parse dataset", level = "info", skip(lines), fields(total_lines = lines.len()))]
pub fn parse_lines<S: AsRef<str>>(
    lines: &[S],
    desired_year: i32,
    layout: DatasetLayout,
) -> Result<ParsedDataset> {
    let t_parse = std::time::Instant::now();
    let desired = desired_year.to_string();
    let records = layout.data_lines(lines)?;

    let mut film_locations = FilmLocations::new();
    let mut countries = Vec::with_capacity(records.len());
    let mut malformed = 0usize;

    for line in records {
        let Some((info, location)) = split_record(line.as_ref()) else {
            malformed += 1;
            continue;
        };

        countries.push(LocationString::parse(location).country().to_string());

        let Some((title, year)) = split_info(info) else {
            continue;
        };
        if !is_year(&year, &desired) {
            continue;
        }

        film_locations.insert(title, location.to_string());
    }

    if malformed > 0 {
        debug!(malformed, "Skipped malformed dataset lines");
    }

    let country_counts = CountryCounts::tally(countries)?;

    info!(
        films = film_locations.len(),
        countries = country_counts.len(),
        elapsed = ?t_parse.elapsed(),
        "Parsed dataset"
    );

    Ok(ParsedDataset {
        year: desired_year,
        film_locations,
        country_counts,
    })
}
