//! Admin-unit expansion.
//!
//! Turns one registry event into one row per coarse region it references.
//! References naming a coarse region are taken as-is; references naming a
//! fine region are resolved through the [`RegionHierarchy`]. Several fine
//! regions sharing one coarse parent collapse to a single row.

use std::collections::HashSet;

use flood_events_event_models::{ExpandedRegionEvent, Region, SourceEvent};
use flood_events_geography_models::{AdminUnitRef, RegionHierarchy, parse_admin_units};

use crate::dates::resolve_event_dates;

/// Expands an event into one row per distinct coarse region.
///
/// Events with blank or unparsable admin units, and references whose fine
/// region is missing from the hierarchy, yield rows with `region: None`.
/// Rows are deduplicated on the coarse-region code, keeping the first.
#[must_use]
pub fn expand_admin_units(
    event: &SourceEvent,
    hierarchy: &RegionHierarchy,
) -> Vec<ExpandedRegionEvent> {
    let dates = resolve_event_dates(event);
    let make_row = |region: Option<Region>| ExpandedRegionEvent {
        event: event.clone(),
        dates,
        region,
    };

    let units = match event.admin_units.as_deref().map(parse_admin_units) {
        None => Vec::new(),
        Some(Ok(units)) => units,
        Some(Err(e)) => {
            log::debug!("[{}] {e}", event.id);
            Vec::new()
        }
    };

    if units.is_empty() {
        return vec![make_row(None)];
    }

    let mut seen: HashSet<Option<String>> = HashSet::new();
    let mut rows = Vec::new();
    for unit in &units {
        let region = resolve_unit(unit, hierarchy);
        if region.is_none() {
            log::debug!(
                "[{}] fine region {} not in hierarchy",
                event.id,
                unit.adm2_code.as_deref().unwrap_or("?")
            );
        }
        if seen.insert(region.as_ref().map(|r| r.code.clone())) {
            rows.push(make_row(region));
        }
    }

    rows
}

/// Resolves one reference to its coarse region. A coarse code supplied by
/// the registry wins over the hierarchy lookup.
fn resolve_unit(unit: &AdminUnitRef, hierarchy: &RegionHierarchy) -> Option<Region> {
    if let Some(code) = &unit.adm1_code {
        return Some(Region {
            code: code.clone(),
            name: unit.adm1_name.clone(),
        });
    }
    unit.adm2_code
        .as_deref()
        .and_then(|fine| hierarchy.resolve(fine))
        .cloned()
}
