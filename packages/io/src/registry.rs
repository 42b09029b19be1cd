//! Registry table reader.
//!
//! Registry exports routinely store integer fields as floats (`2019.0`)
//! and use `nan` for blanks, so numeric columns are read as text and
//! parsed leniently. A value that is not a number becomes missing.

use std::io::Read;

use flood_events_event_models::{SourceEvent, columns};
use serde::Deserialize;

use crate::{IoError, read_table};

#[derive(Debug, Deserialize)]
struct RegistryRow {
    id: String,
    #[serde(default)]
    disaster_type: Option<String>,
    #[serde(default)]
    disaster_subtype: Option<String>,
    #[serde(default)]
    iso: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    start_year: Option<String>,
    #[serde(default)]
    start_month: Option<String>,
    #[serde(default)]
    start_day: Option<String>,
    #[serde(default)]
    end_year: Option<String>,
    #[serde(default)]
    end_month: Option<String>,
    #[serde(default)]
    end_day: Option<String>,
    #[serde(default)]
    admin_units: Option<String>,
    #[serde(default)]
    total_damage: Option<String>,
    #[serde(default)]
    processing_notes: Option<String>,
}

impl RegistryRow {
    fn into_event(self) -> SourceEvent {
        let id = self.id.trim().to_string();
        SourceEvent {
            start_year: parse_integer(&id, columns::START_YEAR, self.start_year.as_deref()),
            start_month: parse_integer(&id, columns::START_MONTH, self.start_month.as_deref()),
            start_day: parse_integer(&id, columns::START_DAY, self.start_day.as_deref()),
            end_year: parse_integer(&id, columns::END_YEAR, self.end_year.as_deref()),
            end_month: parse_integer(&id, columns::END_MONTH, self.end_month.as_deref()),
            end_day: parse_integer(&id, columns::END_DAY, self.end_day.as_deref()),
            total_damage: parse_float(&id, self.total_damage.as_deref()),
            disaster_type: non_blank(self.disaster_type),
            disaster_subtype: non_blank(self.disaster_subtype),
            iso: non_blank(self.iso),
            country: non_blank(self.country),
            admin_units: non_blank(self.admin_units),
            total_damage_adjusted: None,
            processing_notes: non_blank(self.processing_notes),
            id,
        }
    }
}

/// Reads registry events from CSV.
///
/// # Errors
///
/// * [`IoError::MissingColumn`] if a required registry column is absent
/// * [`IoError::Csv`] on malformed CSV
pub fn read_registry(reader: impl Read, source: &str) -> Result<Vec<SourceEvent>, IoError> {
    let rows: Vec<RegistryRow> = read_table(reader, source, columns::REGISTRY_REQUIRED)?;
    Ok(rows.into_iter().map(RegistryRow::into_event).collect())
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("none")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !is_missing(v))
}

/// Parses an integer field, accepting a zero fractional part (`2019.0`).
fn parse_integer<T: std::str::FromStr>(id: &str, column: &str, raw: Option<&str>) -> Option<T> {
    let value = raw.map(str::trim).filter(|v| !is_missing(v))?;
    let whole = match value.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => whole,
        Some(_) => {
            log::debug!("[{id}] {column} '{value}' is not a whole number");
            return None;
        }
        None => value,
    };
    let parsed = whole.parse().ok();
    if parsed.is_none() {
        log::debug!("[{id}] {column} '{value}' is not a number");
    }
    parsed
}

fn parse_float(id: &str, raw: Option<&str>) -> Option<f64> {
    let value = raw.map(str::trim).filter(|v| !is_missing(v))?;
    let parsed = value.parse::<f64>().ok().filter(|v| v.is_finite());
    if parsed.is_none() {
        log::debug!("[{id}] {} '{value}' is not a number", columns::TOTAL_DAMAGE);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,disaster_type,disaster_subtype,iso,country,start_year,start_month,\
                          start_day,end_year,end_month,end_day,admin_units,total_damage,\
                          processing_notes";

    fn read(rows: &str) -> Vec<SourceEvent> {
        let csv = format!("{HEADER}\n{rows}");
        read_registry(csv.as_bytes(), "registry").unwrap()
    }

    #[test]
    fn reads_float_exported_integers() {
        let events = read(
            "2019-0123-SRB,Flood,Riverine flood,SRB,Serbia,2019.0,3.0,15.0,2019,5,2.0,\
             \"[{\"\"adm2_code\"\": 1}]\",1200.5,7\n",
        );
        let event = &events[0];
        assert_eq!(event.id, "2019-0123-SRB");
        assert_eq!(event.start_year, Some(2019));
        assert_eq!(event.start_month, Some(3));
        assert_eq!(event.start_day, Some(15));
        assert_eq!(event.end_day, Some(2));
        assert_eq!(event.admin_units.as_deref(), Some("[{\"adm2_code\": 1}]"));
        assert_eq!(event.total_damage, Some(1200.5));
        assert_eq!(event.processing_notes.as_deref(), Some("7"));
        assert_eq!(event.total_damage_adjusted, None);
    }

    #[test]
    fn blanks_and_nan_are_missing() {
        let events = read("E2,Flood,,,,2019,6,nan,2019,7,,NaN,,\n");
        let event = &events[0];
        assert_eq!(event.start_day, None);
        assert_eq!(event.end_day, None);
        assert_eq!(event.admin_units, None);
        assert_eq!(event.disaster_subtype, None);
        assert_eq!(event.total_damage, None);
        assert_eq!(event.processing_notes, None);
    }

    #[test]
    fn fractional_or_garbage_integers_are_missing() {
        let events = read("E3,Flood,,,,2019.5,x,1,2019,5,1,,,\n");
        assert_eq!(events[0].start_year, None);
        assert_eq!(events[0].start_month, None);
        assert_eq!(events[0].start_day, Some(1));
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let csv = "id,start_year,start_month,end_year,end_month,admin_units\nE4,2019,1,2019,2,\n";
        let events = read_registry(csv.as_bytes(), "registry").unwrap();
        assert_eq!(events[0].id, "E4");
        assert_eq!(events[0].start_day, None);
        assert_eq!(events[0].total_damage, None);
    }

    #[test]
    fn required_column_missing() {
        let csv = "id,start_year,start_month,end_year,end_month\nE5,2019,1,2019,2\n";
        let err = read_registry(csv.as_bytes(), "registry").unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { column: "admin_units", .. }));
    }
}
