//! Region-hierarchy table reader.

use std::io::Read;

use flood_events_event_models::columns;
use flood_events_geography_models::{RegionHierarchy, normalize_code};
use serde::Deserialize;

use crate::{IoError, read_table};

#[derive(Debug, Deserialize)]
struct HierarchyRow {
    #[serde(rename = "adm2_code", default)]
    fine_code: Option<String>,
    #[serde(rename = "adm1_code", default)]
    coarse_code: Option<String>,
    #[serde(rename = "adm1_name", default)]
    coarse_name: Option<String>,
}

/// Reads the fine-to-coarse region lookup from CSV.
///
/// Codes are normalized with [`normalize_code`]. Rows missing either code
/// are skipped, and repeated fine codes keep their first row.
///
/// # Errors
///
/// * [`IoError::MissingColumn`] if a hierarchy column is absent
/// * [`IoError::Csv`] on malformed CSV
pub fn read_hierarchy(reader: impl Read, source: &str) -> Result<RegionHierarchy, IoError> {
    let rows: Vec<HierarchyRow> = read_table(reader, source, columns::HIERARCHY_REQUIRED)?;
    let total = rows.len();

    let pairs: Vec<(String, String, Option<String>)> = rows
        .into_iter()
        .filter_map(|row| {
            let fine = normalize_code(row.fine_code.as_deref()?)?;
            let coarse = normalize_code(row.coarse_code.as_deref()?)?;
            let name = row
                .coarse_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
            Some((fine, coarse, name))
        })
        .collect();

    if pairs.len() < total {
        log::warn!(
            "Skipped {} hierarchy rows without both region codes",
            total - pairs.len()
        );
    }

    Ok(RegionHierarchy::from_rows(pairs))
}
