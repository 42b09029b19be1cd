//! Month splitting.
//!
//! An event-region row spanning `[start, end]` becomes one row per
//! calendar month the interval touches. Interior months keep their full
//! calendar bounds; the first and last months are clipped to the event.

use chrono::NaiveDate;
use flood_events_event_models::{ExpandedRegionEvent, MonthYear, MonthlyEvent};

/// One month of an interval: `(month, period_start, period_end)`.
pub type MonthPeriod = (MonthYear, NaiveDate, NaiveDate);

/// Cuts the inclusive interval `[start, end]` at month boundaries.
///
/// Returns an empty list when `end < start`.
#[must_use]
pub fn month_periods(start: NaiveDate, end: NaiveDate) -> Vec<MonthPeriod> {
    let mut periods = Vec::new();
    if end < start {
        return periods;
    }

    let last = MonthYear::of(end);
    let mut month = MonthYear::of(start);
    loop {
        let (Some(first_day), Some(last_day)) = (month.first_day(), month.last_day()) else {
            break;
        };
        periods.push((month, start.max(first_day), end.min(last_day)));
        if month >= last {
            break;
        }
        month = month.succ();
    }

    periods
}

/// Splits one event-region row into monthly rows.
///
/// Rows whose dates did not resolve, or whose end precedes the start,
/// produce no months; they resurface as lost events during
/// reconciliation.
#[must_use]
pub fn split_by_month(row: &ExpandedRegionEvent) -> Vec<MonthlyEvent> {
    let Some((start, end)) = row.dates.interval() else {
        log::trace!("[{}] no resolved interval, skipping month split", row.event.id);
        return Vec::new();
    };
    if end < start {
        log::debug!(
            "[{}] end {end} precedes start {start}, producing no months",
            row.event.id
        );
        return Vec::new();
    }

    month_periods(start, end)
        .into_iter()
        .map(|(month_year, period_start, period_end)| MonthlyEvent {
            expanded: row.clone(),
            month_year,
            period_start,
            period_end,
        })
        .collect()
}
