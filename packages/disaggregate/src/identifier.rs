//! Composite identifiers.
//!
//! `{YYYY-MM}-{event id}-{coarse region code}` keys one row of the
//! disaggregated dataset. Rows without a coarse region have no key.

use std::collections::HashMap;

use flood_events_event_models::{DisaggregatedRecord, MonthYear, MonthlyEvent};

use crate::DisaggregateError;

/// Builds the composite id, or `None` when the region code is absent.
#[must_use]
pub fn composite_id(
    month_year: MonthYear,
    id: &str,
    region_code: Option<&str>,
) -> Option<String> {
    region_code.map(|code| format!("{month_year}-{id}-{code}"))
}

/// Flattens a monthly row into a keyed disaggregated record.
#[must_use]
pub fn assign_identifier(monthly: &MonthlyEvent) -> DisaggregatedRecord {
    let expanded = &monthly.expanded;
    let event = &expanded.event;
    let region = expanded.region.as_ref();

    DisaggregatedRecord {
        id: event.id.clone(),
        composite_id: composite_id(
            monthly.month_year,
            &event.id,
            region.map(|r| r.code.as_str()),
        ),
        month_year: monthly.month_year,
        start_date: monthly.period_start,
        end_date: monthly.period_end,
        disaster_type: event.disaster_type.clone(),
        disaster_subtype: event.disaster_subtype.clone(),
        iso: event.iso.clone(),
        country: event.country.clone(),
        region1_name: region.and_then(|r| r.name.clone()),
        region1_code: region.map(|r| r.code.clone()),
        total_damage_adjusted: event.total_damage_adjusted,
        processing_notes: expanded
            .dates
            .processing_notes(event.processing_notes.as_deref()),
    }
}

/// Checks that every non-null composite id occurs exactly once.
///
/// # Errors
///
/// Returns [`DisaggregateError::DuplicateCompositeId`] naming the first
/// duplicated id (in record order).
pub fn verify_unique_composite_ids(
    records: &[DisaggregatedRecord],
) -> Result<(), DisaggregateError> {
    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for id in records.iter().filter_map(|r| r.composite_id.as_deref()) {
        *counts.entry(id).or_default() += 1;
    }

    let duplicate = records
        .iter()
        .filter_map(|r| r.composite_id.as_deref())
        .find(|id| counts.get(id).copied().unwrap_or_default() > 1);

    match duplicate {
        Some(id) => Err(DisaggregateError::DuplicateCompositeId {
            composite_id: id.to_string(),
            count: counts[id],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use flood_events_event_models::{ExpandedRegionEvent, Region, ResolvedDates, SourceEvent};

    use super::*;

    fn monthly(region: Option<&str>) -> MonthlyEvent {
        let date = NaiveDate::from_ymd_opt(2019, 3, 15).unwrap();
        MonthlyEvent {
            expanded: ExpandedRegionEvent {
                event: SourceEvent {
                    id: "E1".to_string(),
                    processing_notes: Some("7".to_string()),
                    ..SourceEvent::default()
                },
                dates: ResolvedDates {
                    start: Some(date),
                    end: Some(date),
                    start_day_defaulted: false,
                    end_day_defaulted: true,
                },
                region: region.map(|code| Region {
                    code: code.to_string(),
                    name: Some("North".to_string()),
                }),
            },
            month_year: MonthYear::of(date),
            period_start: date,
            period_end: date,
        }
    }

    #[test]
    fn builds_month_id_region_key() {
        let month = MonthYear::new(2019, 3).unwrap();
        assert_eq!(
            composite_id(month, "E1", Some("R1")).as_deref(),
            Some("2019-03-E1-R1")
        );
        assert_eq!(composite_id(month, "E1", None), None);
    }

    #[test]
    fn flattens_monthly_row() {
        let record = assign_identifier(&monthly(Some("R1")));
        assert_eq!(record.composite_id.as_deref(), Some("2019-03-E1-R1"));
        assert_eq!(record.region1_code.as_deref(), Some("R1"));
        assert_eq!(record.region1_name.as_deref(), Some("North"));
        assert_eq!(record.processing_notes, "7; End day originally missing");
    }

    #[test]
    fn missing_region_has_no_key() {
        let record = assign_identifier(&monthly(None));
        assert!(record.composite_id.is_none());
        assert!(record.region1_code.is_none());
    }

    #[test]
    fn detects_duplicates_and_ignores_nulls() {
        let a = assign_identifier(&monthly(Some("R1")));
        let unkeyed = assign_identifier(&monthly(None));
        assert!(verify_unique_composite_ids(&[a.clone(), unkeyed.clone(), unkeyed]).is_ok());

        let err = verify_unique_composite_ids(&[a.clone(), a]).unwrap_err();
        assert!(matches!(
            err,
            DisaggregateError::DuplicateCompositeId { ref composite_id, count: 2 }
                if composite_id == "2019-03-E1-R1"
        ));
    }
}
