//! Lenient version parsing and ordering for affected-range containment.
//!
//! Advisory feeds carry version strings from many ecosystems, so this is
//! deliberately *not* strict semver: a version is a dot/dash-separated
//! sequence of numeric and textual segments, compared segment-wise. The
//! rules are chosen so the common cases behave like semver:
//!
//! - `1.2.10 > 1.2.9` (numeric, not lexicographic)
//! - `1.0.0-alpha < 1.0.0` (textual tail marks a pre-release)
//! - `1.0 == 1.0.0` (trailing zero segments are insignificant)
//!
//! Parsing is fallible: an empty string or one containing characters
//! outside `[0-9A-Za-z._+-]` is rejected, which is what routes a corpus
//! record into the malformed-record path instead of silently matching.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A parsed, comparable version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    segments: Vec<Segment>,
    raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Segment {
    Num(u64),
    Text(String),
}

/// Error returned when a version string cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparseable version string: {raw:?}")]
pub struct VersionParseError {
    /// The offending input, for log context.
    pub raw: String,
}

impl Version {
    /// Parse a version string into comparable segments.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError`] for empty input or input containing
    /// characters outside the `[0-9A-Za-z._+-]` set.
    pub fn parse(raw: &str) -> Result<Self, VersionParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
        {
            return Err(VersionParseError { raw: raw.into() });
        }

        let segments = trimmed
            .split(['.', '-', '_', '+'])
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                chunk.parse::<u64>().map_or_else(
                    |_| Segment::Text(chunk.to_ascii_lowercase()),
                    Segment::Num,
                )
            })
            .collect::<Vec<_>>();

        if segments.is_empty() {
            return Err(VersionParseError { raw: raw.into() });
        }

        Ok(Self {
            segments,
            raw: trimmed.to_string(),
        })
    }

    /// The original (trimmed) string this version was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.segments.iter();
        let mut right = other.segments.iter();

        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) => {
                    let ord = compare_segments(a, b);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                (Some(rest), None) => return tail_ordering(rest),
                (None, Some(rest)) => return tail_ordering(rest).reverse(),
                (None, None) => return Ordering::Equal,
            }
        }
    }
}

fn compare_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Num(x), Segment::Num(y)) => x.cmp(y),
        (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
        // A numeric segment outranks a textual one at the same position:
        // "1.2" > "1.beta".
        (Segment::Num(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Num(_)) => Ordering::Less,
    }
}

/// Ordering contribution of the first extra segment on the longer side.
///
/// A textual tail is a pre-release marker, so the longer version is
/// smaller; a zero tail is insignificant; any other numeric tail makes
/// the longer version greater.
fn tail_ordering(first_extra: &Segment) -> Ordering {
    match first_extra {
        Segment::Text(_) => Ordering::Less,
        Segment::Num(0) => Ordering::Equal,
        Segment::Num(_) => Ordering::Greater,
    }
}
