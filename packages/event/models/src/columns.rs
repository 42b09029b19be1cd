//! Column names the pipeline looks up or validates by name.
//!
//! These are a contract with the external metrics computation and the
//! region-hierarchy export; keep them in sync with the `serde` renames on
//! the record types.

pub const ID: &str = "id";
pub const COMPOSITE_ID: &str = "composite_id";
pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";

pub const START_YEAR: &str = "start_year";
pub const START_MONTH: &str = "start_month";
pub const START_DAY: &str = "start_day";
pub const END_YEAR: &str = "end_year";
pub const END_MONTH: &str = "end_month";
pub const END_DAY: &str = "end_day";

pub const ADMIN_UNITS: &str = "admin_units";
pub const TOTAL_DAMAGE: &str = "total_damage";

pub const REGION1_CODE: &str = "region1_code";

pub const FINE_REGION_CODE: &str = "adm2_code";
pub const COARSE_REGION_CODE: &str = "adm1_code";
pub const COARSE_REGION_NAME: &str = "adm1_name";

pub const FLOODED_AREA: &str = "flooded_area";

pub const FLAGS: &str = "flags";

/// Columns that must be present in the registry header.
pub const REGISTRY_REQUIRED: &[&str] = &[
    ID,
    START_YEAR,
    START_MONTH,
    END_YEAR,
    END_MONTH,
    ADMIN_UNITS,
];

/// Columns that must be present in the metrics header.
pub const METRICS_REQUIRED: &[&str] = &[COMPOSITE_ID, FLOODED_AREA];

/// Columns that must be present in the region-hierarchy header.
pub const HIERARCHY_REQUIRED: &[&str] =
    &[FINE_REGION_CODE, COARSE_REGION_CODE, COARSE_REGION_NAME];
