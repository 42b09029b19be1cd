//! Lost-event reconciliation.
//!
//! An event is lost when none of its region-month rows reached the metrics
//! dataset. Lost events are reinserted as one standalone row each, carrying
//! exactly one loss-cause flag, so that every registry id survives into the
//! final output.

use std::collections::HashSet;

use flood_events_config::DamageConfig;
use flood_events_disaggregate::damage::rebase_damage;
use flood_events_disaggregate::resolve_event_dates;
use flood_events_event_models::{Flag, FlaggedRecord, SourceEvent};

/// Registry events whose id is not in `surviving_ids`, in registry order.
#[must_use]
pub fn find_lost_events<'a>(
    registry: &'a [SourceEvent],
    surviving_ids: &HashSet<&str>,
) -> Vec<&'a SourceEvent> {
    let mut seen = HashSet::new();
    registry
        .iter()
        .filter(|event| !surviving_ids.contains(event.id.as_str()))
        .filter(|event| seen.insert(event.id.as_str()))
        .collect()
}

/// Picks the single flag explaining why `event` was lost.
///
/// Unresolvable dates take priority over missing admin units, which take
/// priority over everything else.
#[must_use]
pub fn loss_cause(event: &SourceEvent) -> Flag {
    let dates = resolve_event_dates(event);
    if dates.start.is_none() || dates.end.is_none() {
        Flag::UnresolvedDates
    } else if !event.has_admin_units() {
        Flag::MissingAdminUnits
    } else {
        Flag::LostOther
    }
}

/// Builds the standalone row reinserted for a lost event.
///
/// The row has no region, month or composite id. Its dates are the full
/// event dates where they resolve.
#[must_use]
pub fn lost_event_record(event: &SourceEvent, damage: &DamageConfig) -> FlaggedRecord {
    let dates = resolve_event_dates(event);
    FlaggedRecord {
        id: event.id.clone(),
        start_date: dates.start,
        end_date: dates.end,
        disaster_type: event.disaster_type.clone(),
        disaster_subtype: event.disaster_subtype.clone(),
        iso: event.iso.clone(),
        country: event.country.clone(),
        total_damage_adjusted: rebase_damage(event.total_damage, damage),
        flags: std::iter::once(loss_cause(event)).collect(),
        ..FlaggedRecord::default()
    }
}
