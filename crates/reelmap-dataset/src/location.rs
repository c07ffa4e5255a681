//! Hierarchical location descriptors.
//!
//! A location string lists its components from the most specific to the least
//! specific, separated by `", "`, with the country last:
//! `"Universal Studios, 100 Universal City Plaza, Universal City, California, USA"`.
//! The same shape is used by reverse-geocoded addresses, so both go through
//! [`LocationString`].

use itertools::Itertools;

/// Separator between the components of a location string or address.
pub const TOKEN_SEPARATOR: &str = ", ";

/// True when `token` is made only of ASCII digits, e.g. a postal code.
pub fn is_numeric_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// A location string split into its hierarchical tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationString<'a> {
    raw: &'a str,
    tokens: Vec<&'a str>,
}

impl<'a> LocationString<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            tokens: raw.split(TOKEN_SEPARATOR).collect(),
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn tokens(&self) -> &[&'a str] {
        &self.tokens
    }

    /// Number of hierarchical tokens. Never zero: an empty string is one empty token.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when the underlying string is empty. Its token count is still one,
    /// so an empty location is geocoded with a single empty query.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The least specific token.
    pub fn country(&self) -> &'a str {
        self.tokens.last().copied().unwrap_or_default()
    }

    /// The state/province-level token.
    ///
    /// This is the second-to-last token, unless that token is purely numeric
    /// (a postal code), in which case the third-to-last is used. Returns `None`
    /// when the string does not have enough tokens for the chosen position.
    pub fn second_level(&self) -> Option<&'a str> {
        let n = self.tokens.len();
        let candidate = *self.tokens.get(n.checked_sub(2)?)?;
        if is_numeric_token(candidate) {
            self.tokens.get(n.checked_sub(3)?).copied()
        } else {
            Some(candidate)
        }
    }

    /// Queries from the full string down to the country alone, each one
    /// dropping the most specific remaining token.
    pub fn broadening_queries(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.tokens.len()).map(|start| self.tokens[start..].iter().join(TOKEN_SEPARATOR))
    }
}
