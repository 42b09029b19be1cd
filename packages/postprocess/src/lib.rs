#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Post-processing of the disaggregated flood dataset.
//!
//! Joins the disaggregated records with the externally computed impact
//! metrics, reinserts events that did not survive, attaches quality flags
//! and restores the registry's row order.

pub mod canonical;
pub mod diagnostics;
pub mod flags;
pub mod reconcile;
pub mod summary;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use flood_events_config::PipelineConfig;
use flood_events_disaggregate::progress::ProgressCallback;
use flood_events_event_models::{
    DisaggregatedRecord, Flag, FlaggedRecord, MetricsRecord, SourceEvent,
};
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::canonical::{RegistryOrder, canonicalize};
use crate::flags::flag_record;
use crate::reconcile::{find_lost_events, lost_event_record};

pub use summary::summarize_regions;

/// Errors that can occur during post-processing.
#[derive(Debug, Error)]
pub enum PostprocessError {
    /// The metrics table has more than one row for a composite id.
    #[error("Metrics table has duplicate composite id {composite_id}")]
    DuplicateMetricsKey {
        /// The repeated key.
        composite_id: String,
    },
    /// Registry ids are missing from the final dataset.
    #[error("{count} registry ids missing from the final dataset (first: {first})")]
    MissingIds {
        /// How many ids are missing.
        count: usize,
        /// The first missing id in registry order.
        first: String,
    },
}

/// Row counts observed during one post-processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostprocessStats {
    /// Disaggregated rows matched to a metrics row.
    pub surviving_rows: u64,
    /// Disaggregated rows with no metrics row, kept with empty metrics.
    pub unmatched_rows: u64,
    /// Registry events reinserted as lost.
    pub lost_events: u64,
}

/// Builds the final flagged dataset.
///
/// # Errors
///
/// * [`PostprocessError::DuplicateMetricsKey`] if the metrics table is
///   not keyed uniquely by composite id
/// * [`PostprocessError::MissingIds`] if a registry id failed to reach the
///   output
pub fn postprocess(
    registry: &[SourceEvent],
    disaggregated: &[DisaggregatedRecord],
    metrics: &[MetricsRecord],
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(Vec<FlaggedRecord>, PostprocessStats), PostprocessError> {
    let metrics_by_key = index_metrics(metrics)?;
    let mut stats = PostprocessStats::default();

    progress.set_total(disaggregated.len() as u64);
    let mut records = Vec::with_capacity(disaggregated.len());
    let mut surviving = HashSet::new();
    for record in disaggregated {
        let matched = record
            .composite_id
            .as_deref()
            .and_then(|key| metrics_by_key.get(key))
            .copied();
        if matched.is_some() {
            surviving.insert(record.id.as_str());
            stats.surviving_rows += 1;
        } else {
            log::debug!(
                "[{}] no metrics for {}",
                record.id,
                record.composite_id.as_deref().unwrap_or("unkeyed row")
            );
            stats.unmatched_rows += 1;
        }
        records.push(flag_record(record, matched, config.sensor_cutoff));
        progress.inc(1);
    }
    progress.finish(format!("{} rows flagged", records.len()));

    log::info!(
        "Matched {} of {} disaggregated rows to metrics",
        stats.surviving_rows,
        disaggregated.len()
    );
    if stats.unmatched_rows > 0 {
        log::warn!(
            "{} disaggregated rows had no metrics row and keep empty metrics",
            stats.unmatched_rows
        );
    }

    let lost = find_lost_events(registry, &surviving);
    stats.lost_events = lost.len() as u64;
    log::info!("Reinserting {} lost events", stats.lost_events);
    let reinserted: Vec<FlaggedRecord> = lost
        .into_iter()
        .map(|event| lost_event_record(event, &config.damage))
        .collect();
    records.extend(reinserted);

    let order = RegistryOrder::new(registry);
    canonicalize(&mut records, &config.country_corrections, &order);

    verify_all_ids_present(registry, &records)?;
    log_flag_summary(&records);

    Ok((records, stats))
}

fn index_metrics(
    metrics: &[MetricsRecord],
) -> Result<HashMap<&str, &MetricsRecord>, PostprocessError> {
    let mut index = HashMap::with_capacity(metrics.len());
    for row in metrics {
        if index.insert(row.composite_id.as_str(), row).is_some() {
            return Err(PostprocessError::DuplicateMetricsKey {
                composite_id: row.composite_id.clone(),
            });
        }
    }
    Ok(index)
}

/// Checks that every registry id appears at least once in `records`.
///
/// # Errors
///
/// Returns [`PostprocessError::MissingIds`] naming the first absent id.
pub fn verify_all_ids_present(
    registry: &[SourceEvent],
    records: &[FlaggedRecord],
) -> Result<(), PostprocessError> {
    let present: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let missing: Vec<&str> = registry
        .iter()
        .map(|e| e.id.as_str())
        .filter(|id| !present.contains(id))
        .collect();

    match missing.first() {
        Some(first) => Err(PostprocessError::MissingIds {
            count: missing.len(),
            first: (*first).to_string(),
        }),
        None => Ok(()),
    }
}

/// Number of rows carrying each flag, in code order.
#[must_use]
pub fn flag_counts(records: &[FlaggedRecord]) -> BTreeMap<Flag, usize> {
    let mut counts = BTreeMap::new();
    for flag in records.iter().flat_map(|r| r.flags.iter()) {
        *counts.entry(flag).or_default() += 1;
    }
    counts
}

/// Logs one line per flag with its row count.
pub fn log_flag_summary(records: &[FlaggedRecord]) {
    let counts = flag_counts(records);
    log::info!("Flag summary over {} rows:", records.len());
    for flag in Flag::iter() {
        log::info!(
            "  flag {:>2} ({}): {}",
            flag.code(),
            flag.description(),
            counts.get(&flag).copied().unwrap_or_default()
        );
    }
}
