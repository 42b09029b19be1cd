//! Data-quality flag taxonomy.
//!
//! Every row of the final dataset carries a [`FlagSet`]: an ordered,
//! deduplicated set of [`Flag`] codes. The numeric codes and their text
//! form (`"1; 2; 12"`) are a contract with downstream consumers and must
//! never be renumbered.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, EnumIter};

/// Separator used between codes in the serialized flag text.
pub const FLAG_SEPARATOR: &str = "; ";

/// A single data-quality or provenance condition attached to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Flag {
    /// Start day was missing in the registry and defaulted to the 1st.
    StartDayMissing = 1,
    /// End day was missing in the registry and defaulted to the month end.
    EndDayMissing = 2,
    /// Period starts before the flood-extent sensor was available.
    BeforeSensorCutoff = 3,
    /// No flood-extent image was found for the period/region.
    NoFloodImage = 4,
    /// The population grid for the region was not found.
    PopulationGridMissing = 5,
    /// Flood-extent and population grids had mismatched shapes.
    GridShapeMismatch = 6,
    /// Upstream pass-through code 7.
    Upstream7 = 7,
    /// Upstream pass-through code 8.
    Upstream8 = 8,
    /// Lost event whose start or end date could not be resolved.
    UnresolvedDates = 9,
    /// Lost event with no admin units recorded.
    MissingAdminUnits = 10,
    /// Lost event for any other reason.
    LostOther = 11,
    /// Computed flooded area is exactly zero.
    ZeroFloodedArea = 12,
    /// Upstream pass-through code 13.
    Upstream13 = 13,
    /// Upstream pass-through code 14.
    Upstream14 = 14,
    /// Upstream pass-through code 15.
    Upstream15 = 15,
}

impl Flag {
    /// Returns the numeric code of this flag.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a flag by its numeric code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::iter().find(|flag| flag.code() == code)
    }

    /// Human-readable description used in flag summaries.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::StartDayMissing => "start day originally missing",
            Self::EndDayMissing => "end day originally missing",
            Self::BeforeSensorCutoff => "start date before sensor availability",
            Self::NoFloodImage => "no flood-extent image found",
            Self::PopulationGridMissing => "population grid file not found",
            Self::GridShapeMismatch => "flood/population grid shape mismatch",
            Self::Upstream7 | Self::Upstream8 | Self::Upstream13 | Self::Upstream14
            | Self::Upstream15 => "upstream pass-through code",
            Self::UnresolvedDates => "lost event: missing start/end date",
            Self::MissingAdminUnits => "lost event: missing admin units",
            Self::LostOther => "lost event: other reasons",
            Self::ZeroFloodedArea => "flooded area = 0",
        }
    }

    /// Flags copied verbatim from numeric codes in the processing notes.
    #[must_use]
    pub const fn is_pass_through(self) -> bool {
        matches!(
            self,
            Self::Upstream7
                | Self::Upstream8
                | Self::Upstream13
                | Self::Upstream14
                | Self::Upstream15
        )
    }

    /// Flags that explain why an event is absent from the disaggregated
    /// dataset. Exactly one of these is attached to a reinserted row.
    #[must_use]
    pub const fn is_loss_cause(self) -> bool {
        matches!(
            self,
            Self::UnresolvedDates | Self::MissingAdminUnits | Self::LostOther
        )
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned when flag text contains an unknown or non-numeric code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFlagError {
    /// The offending token.
    pub token: String,
}

impl fmt::Display for InvalidFlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid flag code {:?}: expected 1-15", self.token)
    }
}

impl std::error::Error for InvalidFlagError {}

/// Ordered, deduplicated set of flags attached to one row.
///
/// Iteration and serialization are always in ascending code order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(BTreeSet<Flag>);

impl FlagSet {
    /// Creates an empty flag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a flag. Returns `true` if it was not already present.
    pub fn insert(&mut self, flag: Flag) -> bool {
        self.0.insert(flag)
    }

    /// Whether `flag` is present.
    #[must_use]
    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    /// Whether no flag is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of flags present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Flag> for FlagSet {
    fn extend<T: IntoIterator<Item = Flag>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, flag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(FLAG_SEPARATOR)?;
            }
            write!(f, "{flag}")?;
        }
        Ok(())
    }
}

impl FromStr for FlagSet {
    type Err = InvalidFlagError;

    /// Parses `"12; 2;1"`-style text. Whitespace and empty tokens are
    /// ignored, so both `""` and `"; 3"` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(';')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<u8>()
                    .ok()
                    .and_then(Flag::from_code)
                    .ok_or_else(|| InvalidFlagError {
                        token: token.to_string(),
                    })
            })
            .collect()
    }
}

impl Serialize for FlagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        raw.parse().map_err(serde::de::Error::custom)
    }
}
