//! Catalog lookups and free-text name matching.
//!
//! Services and providers are read-only at runtime. Human-entered names
//! are matched with one rule for both kinds of entry: an exact
//! (case-insensitive, trimmed) hit always wins; otherwise the configured
//! [`MatchRule`] decides, and more than one candidate is an error rather
//! than a guess.

use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::types::{Provider, Service};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchRule {
    /// The input must equal the catalog name.
    Exact,
    /// The input may contain the catalog name (e.g. a button label
    /// `"Manicure (90 min)"`) or be contained in it (e.g. `"mani"`).
    #[default]
    Substring,
}

/// Anything in the catalog that can be picked by name.
pub trait Named {
    /// Singular noun used in errors.
    const KIND: &'static str;

    fn name(&self) -> &str;
}

impl Named for Service {
    const KIND: &'static str = "service";

    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Provider {
    const KIND: &'static str = "provider";

    fn name(&self) -> &str {
        &self.name
    }
}

/// Pick the single entry of `entries` that `input` names.
///
/// # Errors
/// `NoMatch` if nothing matches, `AmbiguousMatch` (listing the candidates)
/// if more than one entry matches and none matches exactly.
pub fn match_name<'a, T: Named>(entries: &'a [T], input: &str, rule: MatchRule) -> Result<&'a T> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Err(BookingError::InvalidInput(format!("empty {} name", T::KIND)));
    }

    let exact: Vec<&T> = entries
        .iter()
        .filter(|e| e.name().trim().to_lowercase() == needle)
        .collect();
    let candidates = match (exact.len(), rule) {
        (1, _) => return Ok(exact[0]),
        (0, MatchRule::Substring) => substring_candidates(entries, &needle),
        _ => exact,
    };

    match candidates.as_slice() {
        [] => Err(BookingError::NoMatch {
            what: T::KIND,
            input: input.to_string(),
        }),
        [only] => Ok(*only),
        many => Err(BookingError::AmbiguousMatch {
            what: T::KIND,
            input: input.to_string(),
            candidates: many.iter().map(|e| e.name().to_string()).collect(),
        }),
    }
}

/// Entries named inside the input (label style) take precedence, keeping
/// only the longest names so "Women's haircut (60 min)" does not also pick
/// "Men's haircut". Failing that, entries whose name contains the input.
fn substring_candidates<'a, T: Named>(entries: &'a [T], needle: &str) -> Vec<&'a T> {
    let lowered: Vec<(String, &T)> = entries
        .iter()
        .map(|e| (e.name().trim().to_lowercase(), e))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    let inside: Vec<&(String, &T)> = lowered
        .iter()
        .filter(|(name, _)| needle.contains(name.as_str()))
        .collect();
    if !inside.is_empty() {
        return inside
            .iter()
            .filter(|(name, _)| {
                !inside
                    .iter()
                    .any(|(other, _)| other.len() > name.len() && other.contains(name.as_str()))
            })
            .map(|(_, e)| *e)
            .collect();
    }

    lowered
        .iter()
        .filter(|(name, _)| name.contains(needle))
        .map(|(_, e)| *e)
        .collect()
}
