#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Flood event record types shared by every pipeline stage.
//!
//! A registry [`SourceEvent`] is never mutated. Each stage produces a new
//! generation of rows that keeps the originating `id`:
//!
//! [`SourceEvent`] -> [`ExpandedRegionEvent`] -> [`MonthlyEvent`] ->
//! [`DisaggregatedRecord`] -> (external metrics) -> [`FlaggedRecord`].

pub mod columns;
pub mod flag;
pub mod month;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use flag::{Flag, FlagSet, InvalidFlagError};
pub use month::{InvalidMonthYearError, MonthYear};

/// Note appended to the processing notes when the start day was defaulted.
pub const START_DAY_MISSING_NOTE: &str = "Start day originally missing";

/// Note appended to the processing notes when the end day was defaulted.
pub const END_DAY_MISSING_NOTE: &str = "End day originally missing";

/// Separator between entries of the free-text processing notes.
pub const NOTES_SEPARATOR: &str = "; ";

/// One row of the original disaster registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceEvent {
    /// Stable, never reused event identifier.
    pub id: String,
    /// Disaster type (e.g. "Flood").
    pub disaster_type: Option<String>,
    /// Disaster subtype (e.g. "Riverine flood").
    pub disaster_subtype: Option<String>,
    /// ISO 3166 alpha-3 country code.
    pub iso: Option<String>,
    /// Country name as attributed by the registry.
    pub country: Option<String>,
    /// Start year.
    pub start_year: Option<i32>,
    /// Start month (1-12).
    pub start_month: Option<u32>,
    /// Start day, frequently absent.
    pub start_day: Option<u32>,
    /// End year.
    pub end_year: Option<i32>,
    /// End month (1-12).
    pub end_month: Option<u32>,
    /// End day, frequently absent.
    pub end_day: Option<u32>,
    /// Raw admin-unit references (JSON list of region codes).
    pub admin_units: Option<String>,
    /// Total damage in thousands of US$ (nominal).
    pub total_damage: Option<f64>,
    /// Damage re-based to the reference year.
    pub total_damage_adjusted: Option<f64>,
    /// Upstream processing notes carrying pass-through codes.
    pub processing_notes: Option<String>,
}

impl SourceEvent {
    /// Whether the registry recorded any admin units for this event.
    #[must_use]
    pub fn has_admin_units(&self) -> bool {
        self.admin_units
            .as_deref()
            .is_some_and(|units| !units.trim().is_empty())
    }
}

/// Start/end dates of an event after day defaults were applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedDates {
    /// Full start date, `None` when year/month are missing or invalid.
    pub start: Option<NaiveDate>,
    /// Full end date, `None` when year/month are missing or invalid.
    pub end: Option<NaiveDate>,
    /// The start day was absent and defaulted to the 1st.
    pub start_day_defaulted: bool,
    /// The end day was absent and defaulted to the last day of the month.
    pub end_day_defaulted: bool,
}

impl ResolvedDates {
    /// Both endpoints, if both resolved.
    #[must_use]
    pub const fn interval(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Builds the processing notes for an event: the upstream notes
    /// followed by one entry per defaulted day.
    #[must_use]
    pub fn processing_notes(&self, upstream: Option<&str>) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(upstream) = upstream.map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(upstream);
        }
        if self.start_day_defaulted {
            parts.push(START_DAY_MISSING_NOTE);
        }
        if self.end_day_defaulted {
            parts.push(END_DAY_MISSING_NOTE);
        }
        parts.join(NOTES_SEPARATOR)
    }
}

/// A resolved coarse (admin level 1) region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    /// Stable coarse-region code.
    pub code: String,
    /// Coarse-region name, when known.
    pub name: Option<String>,
}

/// A source event bound to one coarse region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRegionEvent {
    /// The originating registry row.
    pub event: SourceEvent,
    /// Dates resolved from the registry's year/month/day fields.
    pub dates: ResolvedDates,
    /// The coarse region, `None` when the reference could not be resolved.
    pub region: Option<Region>,
}

/// An event-region row clipped to one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyEvent {
    /// The event-region row this month was cut from.
    pub expanded: ExpandedRegionEvent,
    /// The calendar month covered.
    pub month_year: MonthYear,
    /// `max(event_start, first_of_month)`.
    pub period_start: NaiveDate,
    /// `min(event_end, last_of_month)`.
    pub period_end: NaiveDate,
}

/// One row of the disaggregated dataset handed to the metrics computation.
///
/// `start_date`/`end_date` hold the month-clipped period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisaggregatedRecord {
    /// Originating registry id.
    pub id: String,
    /// `{month_year}-{id}-{region1_code}`, `None` without a region.
    pub composite_id: Option<String>,
    /// Calendar month covered.
    pub month_year: MonthYear,
    /// Period start.
    pub start_date: NaiveDate,
    /// Period end.
    pub end_date: NaiveDate,
    /// Disaster type.
    pub disaster_type: Option<String>,
    /// Disaster subtype.
    pub disaster_subtype: Option<String>,
    /// ISO country code.
    pub iso: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// Coarse-region name.
    pub region1_name: Option<String>,
    /// Coarse-region code.
    pub region1_code: Option<String>,
    /// Damage re-based to the reference year.
    pub total_damage_adjusted: Option<f64>,
    /// Free-text notes from date resolution and upstream codes.
    #[serde(default)]
    pub processing_notes: String,
}

/// One row of the external metrics dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Join key into the disaggregated dataset.
    pub composite_id: String,
    /// Population inside the flood extent.
    #[serde(default)]
    pub flooded_population: Option<f64>,
    /// Flooded area.
    #[serde(default)]
    pub flooded_area: Option<f64>,
    /// Flooded area normalized by region area.
    #[serde(default)]
    pub flooded_area_norm: Option<f64>,
    /// Free-text error when the computation failed.
    #[serde(default)]
    pub metrics_error: Option<String>,
    /// Processing notes echoed by the metrics computation.
    #[serde(default)]
    pub processing_notes: Option<String>,
}

/// One row of the final, quality-flagged dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlaggedRecord {
    /// Originating registry id.
    pub id: String,
    /// Composite id, `None` for reinserted lost events.
    pub composite_id: Option<String>,
    /// Calendar month, `None` for reinserted lost events.
    pub month_year: Option<MonthYear>,
    /// Period start (full event start for lost events).
    pub start_date: Option<NaiveDate>,
    /// Period end (full event end for lost events).
    pub end_date: Option<NaiveDate>,
    /// Inclusive day count of the period.
    pub event_duration_days: Option<i64>,
    /// Disaster type.
    pub disaster_type: Option<String>,
    /// Disaster subtype.
    pub disaster_subtype: Option<String>,
    /// ISO country code.
    pub iso: Option<String>,
    /// Country name after corrections.
    pub country: Option<String>,
    /// Coarse-region name.
    pub region1_name: Option<String>,
    /// Coarse-region code.
    pub region1_code: Option<String>,
    /// Damage re-based to the reference year.
    pub total_damage_adjusted: Option<f64>,
    /// Population inside the flood extent.
    pub flooded_population: Option<f64>,
    /// Flooded area.
    pub flooded_area: Option<f64>,
    /// Normalized flooded area.
    pub flooded_area_norm: Option<f64>,
    /// Data-quality flags.
    pub flags: FlagSet,
}

/// Per-region summary of the final dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    /// Coarse-region code.
    pub region1_code: String,
    /// Number of disaggregated rows in the region.
    pub event_count: u64,
    /// Mean flooded population over qualifying rows.
    pub mean_flooded_population: Option<f64>,
    /// Mean flooded area over qualifying rows.
    pub mean_flooded_area: Option<f64>,
    /// Mean normalized flooded area over qualifying rows.
    pub mean_flooded_area_norm: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_notes_join_upstream_and_defaults() {
        let dates = ResolvedDates {
            start_day_defaulted: true,
            end_day_defaulted: true,
            ..ResolvedDates::default()
        };
        assert_eq!(
            dates.processing_notes(Some("7")),
            "7; Start day originally missing; End day originally missing"
        );
    }

    #[test]
    fn processing_notes_empty_when_nothing_to_report() {
        assert_eq!(ResolvedDates::default().processing_notes(Some("  ")), "");
    }

    #[test]
    fn blank_admin_units_count_as_missing() {
        let mut event = SourceEvent {
            admin_units: Some("   ".to_string()),
            ..SourceEvent::default()
        };
        assert!(!event.has_admin_units());
        event.admin_units = Some("[{\"adm1_code\": 1}]".to_string());
        assert!(event.has_admin_units());
    }

    #[test]
    fn flagged_record_serializes_flag_text() {
        let record = FlaggedRecord {
            id: "E1".to_string(),
            flags: [Flag::ZeroFloodedArea, Flag::StartDayMissing]
                .into_iter()
                .collect(),
            ..FlaggedRecord::default()
        };
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(&record).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.ends_with(",flags"));
        assert!(lines.next().unwrap().ends_with(",1; 12"));
    }
}
