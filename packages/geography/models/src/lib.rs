#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative region types.
//!
//! The region hierarchy (fine region -> coarse parent) comes from an
//! external spatial-reference export and is treated as a pure lookup
//! table. Country corrections override the registry's country attribution
//! for coarse regions whose boundary source disagrees with it.

pub mod admin_units;

use std::collections::{BTreeMap, HashMap};

use flood_events_event_models::Region;
use serde::{Deserialize, Serialize};

pub use admin_units::{AdminUnitRef, AdminUnitsParseError, parse_admin_units};

/// Normalizes a region code read from text.
///
/// Trims whitespace and drops a trailing `.0` left behind by tools that
/// export integer codes as floats. Returns `None` for blank input.
#[must_use]
pub fn normalize_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }
    let code = trimmed
        .strip_suffix(".0")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(trimmed);
    Some(code.to_string())
}

/// Lookup table from fine-region code to its coarse parent region.
#[derive(Debug, Clone, Default)]
pub struct RegionHierarchy {
    parents: HashMap<String, Region>,
}

impl RegionHierarchy {
    /// Builds the hierarchy from `(fine code, coarse code, coarse name)`
    /// rows. When a fine code appears more than once the first row wins.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String, Option<String>)>,
    {
        let mut parents = HashMap::new();
        let mut duplicates = 0u64;

        for (fine, coarse, name) in rows {
            if parents.contains_key(&fine) {
                duplicates += 1;
                continue;
            }
            parents.insert(fine, Region { code: coarse, name });
        }

        if duplicates > 0 {
            log::debug!("Dropped {duplicates} duplicate fine-region codes (kept first)");
        }

        Self { parents }
    }

    /// Coarse parent of `fine_code`, if known.
    #[must_use]
    pub fn resolve(&self, fine_code: &str) -> Option<&Region> {
        self.parents.get(fine_code)
    }

    /// Number of fine regions in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Coarse-region code -> corrected country name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCorrections(BTreeMap<String, String>);

impl CountryCorrections {
    /// Corrected country for a coarse-region code, if one is configured.
    #[must_use]
    pub fn country_for(&self, region_code: &str) -> Option<&str> {
        self.0.get(region_code).map(String::as_str)
    }

    /// Number of configured overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no override is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for CountryCorrections {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(String, String)> for CountryCorrections {
    fn extend<T: IntoIterator<Item = (String, String)>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for CountryCorrections {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
