#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Disaggregation of registry flood events into region-month records.
//!
//! Each registry event is expanded into one row per coarse region
//! ([`expand`]), each region row is split into calendar months
//! ([`months`]), and each month row receives a composite id
//! ([`identifier`]). The result is the keyed dataset that the external
//! metrics computation consumes.

pub mod damage;
pub mod dates;
pub mod expand;
pub mod identifier;
pub mod months;
pub mod progress;

use std::sync::Arc;

use flood_events_config::DamageConfig;
use flood_events_event_models::{DisaggregatedRecord, SourceEvent};
use flood_events_geography_models::RegionHierarchy;
use thiserror::Error;

use crate::progress::ProgressCallback;

pub use dates::resolve_event_dates;
pub use expand::expand_admin_units;
pub use identifier::{assign_identifier, composite_id, verify_unique_composite_ids};
pub use months::{month_periods, split_by_month};

/// Errors that can occur during disaggregation.
#[derive(Debug, Error)]
pub enum DisaggregateError {
    /// Two rows produced the same composite id.
    #[error("Composite id {composite_id} occurs {count} times")]
    DuplicateCompositeId {
        /// The duplicated key.
        composite_id: String,
        /// How many rows carry it.
        count: usize,
    },
}

/// Row counts observed during one disaggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisaggregationStats {
    /// Registry events read.
    pub events: u64,
    /// Event-region rows after expansion and deduplication.
    pub region_rows: u64,
    /// Event-region rows dropped for lack of a coarse region.
    pub unresolved_region_rows: u64,
    /// Region rows that produced no months (unresolved or inverted dates).
    pub undated_region_rows: u64,
    /// Final region-month records.
    pub records: u64,
}

/// Runs expansion, month splitting and id assignment over the registry.
///
/// Output order follows the registry, then admin-unit order, then month.
///
/// # Errors
///
/// Returns [`DisaggregateError::DuplicateCompositeId`] if two records end
/// up with the same composite id.
pub fn disaggregate(
    events: &[SourceEvent],
    hierarchy: &RegionHierarchy,
    damage: &DamageConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(Vec<DisaggregatedRecord>, DisaggregationStats), DisaggregateError> {
    let mut stats = DisaggregationStats {
        events: events.len() as u64,
        ..DisaggregationStats::default()
    };
    progress.set_total(stats.events);

    let mut records = Vec::new();
    for event in events {
        let event = damage::with_adjusted_damage(event, damage);

        for row in expand_admin_units(&event, hierarchy) {
            if row.region.is_none() {
                stats.unresolved_region_rows += 1;
                continue;
            }
            stats.region_rows += 1;

            let months = split_by_month(&row);
            if months.is_empty() {
                stats.undated_region_rows += 1;
            }
            records.extend(months.iter().map(assign_identifier));
        }

        progress.inc(1);
    }
    stats.records = records.len() as u64;

    verify_unique_composite_ids(&records)?;

    log::info!(
        "Disaggregated {} events into {} region rows and {} region-month records",
        stats.events,
        stats.region_rows,
        stats.records
    );
    if stats.unresolved_region_rows > 0 {
        log::warn!(
            "{} event-region rows had no resolvable coarse region and were dropped",
            stats.unresolved_region_rows
        );
    }
    if stats.undated_region_rows > 0 {
        log::warn!(
            "{} event-region rows had unresolved or inverted dates and produced no months",
            stats.undated_region_rows
        );
    }
    progress.finish(format!("{} records", stats.records));

    Ok((records, stats))
}
