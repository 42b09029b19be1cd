//! Per-row quality flagging of surviving region-month records.

use chrono::NaiveDate;
use flood_events_event_models::{
    DisaggregatedRecord, Flag, FlagSet, FlaggedRecord, MetricsRecord, NOTES_SEPARATOR,
};

use crate::diagnostics::{ERROR_RULES, NOTE_RULES, evaluate};

/// Computes the flag set of one disaggregated row.
///
/// Notes rules run over the record's own notes joined with the notes the
/// metrics row echoed back. Error rules run over the metrics error. The
/// no-image flag is suppressed whenever the period predates
/// `sensor_cutoff`, since no image could exist for it. A row without a
/// metrics row is flagged from its own notes and its dates only.
#[must_use]
pub fn row_flags(
    record: &DisaggregatedRecord,
    metrics: Option<&MetricsRecord>,
    sensor_cutoff: NaiveDate,
) -> FlagSet {
    let echoed = metrics.and_then(|m| m.processing_notes.as_deref());
    let notes = combined_notes(&record.processing_notes, echoed);
    let mut flags = evaluate(&NOTE_RULES, &notes);

    let before_cutoff = record.start_date < sensor_cutoff;
    if before_cutoff {
        flags.insert(Flag::BeforeSensorCutoff);
    }

    let Some(metrics) = metrics else {
        return flags;
    };

    let error = metrics.metrics_error.as_deref().unwrap_or_default();
    flags.extend(
        evaluate(&ERROR_RULES, error)
            .iter()
            .filter(|flag| !(before_cutoff && *flag == Flag::NoFloodImage)),
    );

    if finite(metrics.flooded_area) == Some(0.0) {
        flags.insert(Flag::ZeroFloodedArea);
    }

    flags
}

/// Merges a record with its metrics row, if any, and flags it.
///
/// Without a metrics row the impact columns stay empty.
#[must_use]
pub fn flag_record(
    record: &DisaggregatedRecord,
    metrics: Option<&MetricsRecord>,
    sensor_cutoff: NaiveDate,
) -> FlaggedRecord {
    FlaggedRecord {
        id: record.id.clone(),
        composite_id: record.composite_id.clone(),
        month_year: Some(record.month_year),
        start_date: Some(record.start_date),
        end_date: Some(record.end_date),
        event_duration_days: None,
        disaster_type: record.disaster_type.clone(),
        disaster_subtype: record.disaster_subtype.clone(),
        iso: record.iso.clone(),
        country: record.country.clone(),
        region1_name: record.region1_name.clone(),
        region1_code: record.region1_code.clone(),
        total_damage_adjusted: record.total_damage_adjusted,
        flooded_population: metrics.and_then(|m| finite(m.flooded_population)),
        flooded_area: metrics.and_then(|m| finite(m.flooded_area)),
        flooded_area_norm: metrics.and_then(|m| finite(m.flooded_area_norm)),
        flags: row_flags(record, metrics, sensor_cutoff),
    }
}

fn combined_notes(own: &str, echoed: Option<&str>) -> String {
    [Some(own), echoed]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
        .collect::<Vec<_>>()
        .join(NOTES_SEPARATOR)
}

/// NaN and infinities from the metrics table count as missing.
const fn finite(value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() => Some(v),
        _ => None,
    }
}
