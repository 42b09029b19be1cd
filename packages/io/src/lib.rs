#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV input and output for every table the pipeline touches.
//!
//! Readers are generic over [`Read`] so they can be tested against
//! in-memory bytes; the `load_*`/`save_*` helpers wrap them with file
//! handling and attach the path to every error.

pub mod hierarchy;
pub mod registry;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use flood_events_event_models::columns;
use flood_events_event_models::{
    DisaggregatedRecord, FlaggedRecord, MetricsRecord, RegionSummary, SourceEvent,
};
use flood_events_geography_models::RegionHierarchy;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from reading or writing pipeline tables.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// A required input file does not exist.
    #[error("Required input not found: {0}")]
    MissingInput(String),

    /// CSV parsing or writing error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Table the error occurred in.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error opening or creating a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The header row lacks a required column.
    #[error("{path} is missing required column '{column}'")]
    MissingColumn {
        /// Table the column is missing from.
        path: String,
        /// The missing column.
        column: &'static str,
    },
}

/// Fails with [`IoError::MissingInput`] on the first path that does not
/// exist.
///
/// # Errors
///
/// Returns [`IoError::MissingInput`] naming the missing file.
pub fn ensure_inputs_exist<'a>(
    paths: impl IntoIterator<Item = &'a Path>,
) -> Result<(), IoError> {
    for path in paths {
        if !path.is_file() {
            return Err(IoError::MissingInput(path.display().to_string()));
        }
    }
    Ok(())
}

/// Reads every row of a CSV table, checking `required` columns first.
///
/// `source` names the table in error messages.
///
/// # Errors
///
/// * [`IoError::MissingColumn`] if a required column is absent
/// * [`IoError::Csv`] on malformed input
pub fn read_table<T: DeserializeOwned>(
    reader: impl Read,
    source: &str,
    required: &[&'static str],
) -> Result<Vec<T>, IoError> {
    let csv_error = |e| IoError::Csv {
        path: source.to_string(),
        source: e,
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
        .collect();

    for &column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(IoError::MissingColumn {
                path: source.to_string(),
                column,
            });
        }
    }
    reader.set_headers(csv::StringRecord::from(headers));

    let rows = reader
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error)?;
    log::debug!("Read {} rows from {source}", rows.len());
    Ok(rows)
}

/// Writes `rows` as a CSV table with a header row.
///
/// # Errors
///
/// Returns [`IoError::Csv`] if a row fails to serialize or write.
pub fn write_table<T: Serialize>(
    writer: impl Write,
    source: &str,
    rows: &[T],
) -> Result<(), IoError> {
    let csv_error = |e| IoError::Csv {
        path: source.to_string(),
        source: e,
    };

    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|e| csv_error(e.into()))?;
    log::debug!("Wrote {} rows to {source}", rows.len());
    Ok(())
}

fn open(path: &Path) -> Result<File, IoError> {
    if !path.is_file() {
        return Err(IoError::MissingInput(path.display().to_string()));
    }
    File::open(path).map_err(|e| IoError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn create(path: &Path) -> Result<File, IoError> {
    let io_error = |e| IoError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    File::create(path).map_err(io_error)
}

/// Loads the disaster registry.
///
/// # Errors
///
/// Returns an [`IoError`] if the file is missing or malformed.
pub fn load_registry(path: &Path) -> Result<Vec<SourceEvent>, IoError> {
    let events = registry::read_registry(open(path)?, &path.display().to_string())?;
    log::info!("Loaded {} registry events from {}", events.len(), path.display());
    Ok(events)
}

/// Loads the fine-to-coarse region hierarchy.
///
/// # Errors
///
/// Returns an [`IoError`] if the file is missing or malformed.
pub fn load_hierarchy(path: &Path) -> Result<RegionHierarchy, IoError> {
    let hierarchy = hierarchy::read_hierarchy(open(path)?, &path.display().to_string())?;
    log::info!(
        "Loaded {} fine regions from {}",
        hierarchy.len(),
        path.display()
    );
    if hierarchy.is_empty() {
        log::warn!(
            "Region hierarchy {} is empty; fine-region references will not resolve",
            path.display()
        );
    }
    Ok(hierarchy)
}

/// Loads a previously written disaggregated dataset.
///
/// # Errors
///
/// Returns an [`IoError`] if the file is missing or malformed.
pub fn load_disaggregated(path: &Path) -> Result<Vec<DisaggregatedRecord>, IoError> {
    read_table(
        open(path)?,
        &path.display().to_string(),
        &[columns::ID, columns::COMPOSITE_ID, columns::START_DATE, columns::END_DATE],
    )
}

/// Loads the external metrics dataset. Rows without a composite id are
/// skipped.
///
/// # Errors
///
/// Returns an [`IoError`] if the file is missing or malformed.
pub fn load_metrics(path: &Path) -> Result<Vec<MetricsRecord>, IoError> {
    let rows: Vec<MetricsRecord> = read_table(
        open(path)?,
        &path.display().to_string(),
        columns::METRICS_REQUIRED,
    )?;
    let total = rows.len();
    let rows: Vec<MetricsRecord> = rows
        .into_iter()
        .filter(|row| !row.composite_id.trim().is_empty())
        .collect();
    if rows.len() < total {
        log::warn!("Skipped {} metrics rows without a composite id", total - rows.len());
    }
    log::info!("Loaded {} metrics rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Loads a previously written final dataset.
///
/// # Errors
///
/// Returns an [`IoError`] if the file is missing or malformed.
pub fn load_final(path: &Path) -> Result<Vec<FlaggedRecord>, IoError> {
    read_table(
        open(path)?,
        &path.display().to_string(),
        &[columns::ID, columns::REGION1_CODE, columns::FLAGS],
    )
}

/// Writes any pipeline table to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an [`IoError`] if the file cannot be created or written.
pub fn save<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), IoError> {
    write_table(create(path)?, &path.display().to_string(), rows)?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Writes the per-region summary table.
///
/// # Errors
///
/// Returns an [`IoError`] if the file cannot be created or written.
pub fn save_summary(path: &Path, summary: &[RegionSummary]) -> Result<(), IoError> {
    save(path, summary)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use flood_events_event_models::{Flag, MonthYear};

    use super::*;

    #[test]
    fn metrics_tolerate_bom_extra_columns_and_nan() {
        let csv = "\u{feff}composite_id,flooded_population,flooded_area,flooded_area_norm,\
                   metrics_error,processing_notes,extra\n\
                   2019-03-E1-R1,120.5,0,0,,7,x\n\
                   2019-04-E1-R1,nan,,,RasterioIOError: a.tif: No such file or directory,,y\n";
        let rows: Vec<MetricsRecord> =
            read_table(csv.as_bytes(), "metrics", columns::METRICS_REQUIRED).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].composite_id, "2019-03-E1-R1");
        assert_eq!(rows[0].flooded_area, Some(0.0));
        assert_eq!(rows[0].processing_notes.as_deref(), Some("7"));
        assert!(rows[1].flooded_population.is_some_and(f64::is_nan));
        assert_eq!(rows[1].flooded_area, None);
        assert!(rows[1].metrics_error.as_deref().unwrap().starts_with("RasterioIOError"));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let csv = "composite_id,flooded_population\nx,1\n";
        let err = read_table::<MetricsRecord>(csv.as_bytes(), "metrics", columns::METRICS_REQUIRED)
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::MissingColumn { column: "flooded_area", .. }
        ));
    }

    #[test]
    fn malformed_value_is_a_csv_error() {
        let csv = "composite_id,flooded_area\nx,lots\n";
        let err = read_table::<MetricsRecord>(csv.as_bytes(), "metrics", columns::METRICS_REQUIRED)
            .unwrap_err();
        assert!(matches!(err, IoError::Csv { ref path, .. } if path == "metrics"));
    }

    #[test]
    fn final_rows_write_in_column_order_with_flag_text() {
        let row = FlaggedRecord {
            id: "E1".to_string(),
            composite_id: Some("2019-03-E1-R1".to_string()),
            month_year: MonthYear::new(2019, 3),
            start_date: NaiveDate::from_ymd_opt(2019, 3, 15),
            end_date: NaiveDate::from_ymd_opt(2019, 3, 31),
            event_duration_days: Some(17),
            region1_code: Some("R1".to_string()),
            flooded_area: Some(0.0),
            flags: [Flag::ZeroFloodedArea, Flag::EndDayMissing].into_iter().collect(),
            ..FlaggedRecord::default()
        };
        let mut out = Vec::new();
        write_table(&mut out, "final", std::slice::from_ref(&row)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some(
                "id,composite_id,month_year,start_date,end_date,event_duration_days,\
                 disaster_type,disaster_subtype,iso,country,region1_name,region1_code,\
                 total_damage_adjusted,flooded_population,flooded_area,flooded_area_norm,flags"
            )
        );
        assert_eq!(
            lines.next(),
            Some("E1,2019-03-E1-R1,2019-03,2019-03-15,2019-03-31,17,,,,,,R1,,,0.0,,2; 12")
        );

        let back: Vec<FlaggedRecord> =
            read_table(text.as_bytes(), "final", &[columns::FLAGS]).unwrap();
        assert_eq!(back, vec![row]);
    }

    #[test]
    fn lost_rows_read_back_with_empty_fields() {
        let csv = "id,composite_id,month_year,start_date,end_date,event_duration_days,\
                   disaster_type,disaster_subtype,iso,country,region1_name,region1_code,\
                   total_damage_adjusted,flooded_population,flooded_area,flooded_area_norm,flags\n\
                   E3,,,,,,Flood,,SRB,Serbia,,,,,,,9\n";
        let rows: Vec<FlaggedRecord> = read_table(csv.as_bytes(), "final", &[]).unwrap();
        assert_eq!(rows[0].id, "E3");
        assert!(rows[0].month_year.is_none());
        assert!(rows[0].start_date.is_none());
        assert_eq!(rows[0].flags.to_string(), "9");
    }

    #[test]
    fn missing_input_is_reported_before_reading() {
        let path = Path::new("/nonexistent/flood_events/registry.csv");
        let err = ensure_inputs_exist([path]).unwrap_err();
        assert!(matches!(err, IoError::MissingInput(ref p) if p.ends_with("registry.csv")));
        assert!(matches!(load_registry(path), Err(IoError::MissingInput(_))));
    }
}
