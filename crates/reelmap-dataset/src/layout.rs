//! Boundaries of the record block inside a dataset file.

use tracing::{debug, warn};

use crate::{DataError, Result};

/// Line that introduces the record block in the IMDb `locations.list` header.
pub const LOCATIONS_LIST_MARKER: &str = "LOCATIONS LIST";

/// Header lines in the IMDb `locations.list` distribution.
pub const DEFAULT_HEADER_LINES: usize = 15;
/// Trailer lines in the IMDb `locations.list` distribution.
pub const DEFAULT_FOOTER_LINES: usize = 2;

/// Describes which lines of a dataset file hold records.
///
/// The IMDb `locations.list` file carries a fixed preamble and a short trailer
/// around its records. [`DatasetLayout::Fixed`] skips a known number of lines on
/// each side; [`DatasetLayout::Detect`] finds the block from the file's own
/// markers so other dumps with a different preamble still parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetLayout {
    /// Skip exactly `header_lines` at the start and `footer_lines` at the end.
    Fixed {
        header_lines: usize,
        footer_lines: usize,
    },
    /// Records start after the `LOCATIONS LIST` marker and its `=` underline,
    /// and stop before the trailing line of dashes (if any).
    Detect,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self::imdb_locations_list()
    }
}

impl DatasetLayout {
    /// The fixed 15-line header / 2-line trailer of the IMDb distribution.
    pub const fn imdb_locations_list() -> Self {
        Self::Fixed {
            header_lines: DEFAULT_HEADER_LINES,
            footer_lines: DEFAULT_FOOTER_LINES,
        }
    }

    /// Slice `lines` down to the record block.
    ///
    /// A file shorter than a fixed layout's header and trailer has no records;
    /// an empty slice is returned rather than an error.
    pub fn data_lines<'a, S: AsRef<str>>(&self, lines: &'a [S]) -> Result<&'a [S]> {
        match *self {
            Self::Fixed {
                header_lines,
                footer_lines,
            } => {
                let required = header_lines.saturating_add(footer_lines);
                if lines.len() <= required {
                    warn!(
                        lines = lines.len(),
                        required, "Dataset is not longer than its header and trailer"
                    );
                    return Ok(&lines[..0]);
                }
                Ok(&lines[header_lines..lines.len() - footer_lines])
            }
            Self::Detect => detect_block(lines),
        }
    }
}

fn is_rule(line: &str, ch: char) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == ch)
}

fn detect_block<S: AsRef<str>>(lines: &[S]) -> Result<&[S]> {
    let marker = lines
        .iter()
        .position(|line| line.as_ref().trim() == LOCATIONS_LIST_MARKER)
        .ok_or(DataError::MarkerNotFound(LOCATIONS_LIST_MARKER))?;

    // The marker is normally underlined with '='; records begin right after it.
    let start = match lines.get(marker + 1) {
        Some(line) if is_rule(line.as_ref(), '=') => marker + 2,
        _ => marker + 1,
    };

    let end = lines[start..]
        .iter()
        .rposition(|line| is_rule(line.as_ref(), '-'))
        .map_or(lines.len(), |offset| start + offset);

    debug!(start, end, "Detected dataset record block");
    Ok(&lines[start..end])
}
