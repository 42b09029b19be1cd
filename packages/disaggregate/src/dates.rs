//! Event date resolution.
//!
//! The registry stores start and end dates as separate year/month/day
//! fields. Year and month are required; a missing start day defaults to
//! the 1st and a missing end day to the last day of the month, and each
//! default is remembered so it can surface as a flag later.

use chrono::NaiveDate;
use flood_events_event_models::{MonthYear, ResolvedDates, SourceEvent};

/// Resolves an event's start and end to full dates.
///
/// An endpoint is `None` when its year or month is missing or when the
/// fields do not form a valid calendar date (e.g. February 30th).
#[must_use]
pub fn resolve_event_dates(event: &SourceEvent) -> ResolvedDates {
    let (start, start_day_defaulted) = resolve_endpoint(
        event.start_year,
        event.start_month,
        event.start_day,
        DayDefault::First,
    );
    let (end, end_day_defaulted) = resolve_endpoint(
        event.end_year,
        event.end_month,
        event.end_day,
        DayDefault::Last,
    );

    ResolvedDates {
        start,
        end,
        start_day_defaulted,
        end_day_defaulted,
    }
}

#[derive(Clone, Copy)]
enum DayDefault {
    First,
    Last,
}

fn resolve_endpoint(
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    default: DayDefault,
) -> (Option<NaiveDate>, bool) {
    let (Some(year), Some(month)) = (year, month) else {
        return (None, false);
    };

    match day {
        Some(day) => (NaiveDate::from_ymd_opt(year, month, day), false),
        None => {
            let month_year = MonthYear::new(year, month);
            let date = match default {
                DayDefault::First => month_year.and_then(MonthYear::first_day),
                DayDefault::Last => month_year.and_then(MonthYear::last_day),
            };
            let defaulted = date.is_some();
            (date, defaulted)
        }
    }
}
