use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::{debug, instrument};

use crate::Result;

/// Countries need strictly more entries than this to be kept.
pub const MIN_COUNTRY_ENTRIES: u32 = 10;

/// Total number of dataset entries per country, across every year.
///
/// Only countries with more than [`MIN_COUNTRY_ENTRIES`] entries are kept, so
/// every stored count is at least 11.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryCounts(BTreeMap<String, u64>);

impl CountryCounts {
    /// Tally one entry per element of `countries` and drop the sparse ones.
    #[instrument(name = "Tally countries", level = "debug", skip_all, fields(entries = countries.len()))]
    pub fn tally(countries: Vec<String>) -> Result<Self> {
        let df = df!("country" => countries)?;

        let counted = df
            .lazy()
            .group_by([col("country")])
            .agg([len().alias("count")])
            .filter(col("count").gt(lit(MIN_COUNTRY_ENTRIES)))
            .with_column(col("count").cast(DataType::UInt64))
            .collect()?;

        let names = counted.column("country")?.str()?;
        let counts = counted.column("count")?.u64()?;

        let counts: BTreeMap<String, u64> = names
            .into_iter()
            .zip(counts)
            .filter_map(|(name, count)| Some((name?.to_owned(), count?)))
            .collect();

        debug!(countries = counts.len(), "Countries above the entry threshold");
        Ok(Self(counts))
    }

    pub fn get(&self, country: &str) -> Option<u64> {
        self.0.get(country).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Countries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

impl<'a> IntoIterator for &'a CountryCounts {
    type Item = (&'a String, &'a u64);
    type IntoIter = std::collections::btree_map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
