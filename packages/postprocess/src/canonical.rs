//! Canonical form of the final dataset: country corrections, durations and
//! registry ordering.

use std::collections::HashMap;

use flood_events_event_models::{FlaggedRecord, SourceEvent};
use flood_events_geography_models::CountryCorrections;

/// Rank of each registry id in the registry's row order.
///
/// A repeated id keeps the rank of its first row.
#[derive(Debug, Clone, Default)]
pub struct RegistryOrder {
    ranks: HashMap<String, usize>,
}

impl RegistryOrder {
    /// Builds the rank lookup from the registry.
    #[must_use]
    pub fn new(registry: &[SourceEvent]) -> Self {
        let mut ranks = HashMap::with_capacity(registry.len());
        for (rank, event) in registry.iter().enumerate() {
            if ranks.contains_key(&event.id) {
                log::warn!("Registry id {} occurs more than once", event.id);
                continue;
            }
            ranks.insert(event.id.clone(), rank);
        }
        Self { ranks }
    }

    /// Rank of `id`, `None` for ids unknown to the registry.
    #[must_use]
    pub fn rank(&self, id: &str) -> Option<usize> {
        self.ranks.get(id).copied()
    }
}

/// Replaces the country of every row whose region has a correction.
///
/// Returns how many rows were changed. Running it twice changes nothing
/// the second time.
pub fn apply_country_corrections(
    records: &mut [FlaggedRecord],
    corrections: &CountryCorrections,
) -> usize {
    let mut changed = 0;
    for record in records.iter_mut() {
        let Some(country) = record
            .region1_code
            .as_deref()
            .and_then(|code| corrections.country_for(code))
        else {
            continue;
        };
        if record.country.as_deref() != Some(country) {
            record.country = Some(country.to_string());
            changed += 1;
        }
    }
    changed
}

/// Fills `event_duration_days` as the inclusive day count of each row's
/// period, leaving it empty when either date is missing.
pub fn fill_durations(records: &mut [FlaggedRecord]) {
    for record in records.iter_mut() {
        record.event_duration_days = match (record.start_date, record.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days() + 1),
            _ => None,
        };
    }
}

/// Stable sort into registry order. Ids unknown to the registry go last.
pub fn sort_by_registry_order(records: &mut [FlaggedRecord], order: &RegistryOrder) {
    records.sort_by_key(|record| order.rank(&record.id).unwrap_or(usize::MAX));
}

/// Applies corrections, durations and ordering, in that order.
pub fn canonicalize(
    records: &mut [FlaggedRecord],
    corrections: &CountryCorrections,
    order: &RegistryOrder,
) {
    let corrected = apply_country_corrections(records, corrections);
    if corrected > 0 {
        log::info!("Corrected country attribution on {corrected} rows");
    }
    fill_durations(records);
    sort_by_registry_order(records, order);
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn row(id: &str, region: Option<&str>, country: &str) -> FlaggedRecord {
        FlaggedRecord {
            id: id.to_string(),
            region1_code: region.map(str::to_string),
            country: Some(country.to_string()),
            ..FlaggedRecord::default()
        }
    }

    fn registry(ids: &[&str]) -> Vec<SourceEvent> {
        ids.iter()
            .map(|id| SourceEvent {
                id: (*id).to_string(),
                ..SourceEvent::default()
            })
            .collect()
    }

    fn corrections() -> CountryCorrections {
        [("25381".to_string(), "Serbia".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn corrections_are_idempotent() {
        let mut rows = vec![
            row("A", Some("25381"), "Kosovo"),
            row("B", Some("25381"), "Kosovo"),
            row("C", Some("999"), "Kosovo"),
            row("D", None, "Kosovo"),
        ];
        assert_eq!(apply_country_corrections(&mut rows, &corrections()), 2);
        let once = rows.clone();
        assert_eq!(apply_country_corrections(&mut rows, &corrections()), 0);
        assert_eq!(rows, once);
        assert_eq!(rows[0].country.as_deref(), Some("Serbia"));
        assert_eq!(rows[2].country.as_deref(), Some("Kosovo"));
    }

    #[test]
    fn duration_is_inclusive() {
        let mut rows = vec![
            FlaggedRecord {
                start_date: NaiveDate::from_ymd_opt(2019, 3, 15),
                end_date: NaiveDate::from_ymd_opt(2019, 3, 31),
                ..FlaggedRecord::default()
            },
            FlaggedRecord {
                start_date: NaiveDate::from_ymd_opt(2019, 4, 1),
                end_date: NaiveDate::from_ymd_opt(2019, 4, 1),
                ..FlaggedRecord::default()
            },
            FlaggedRecord {
                start_date: NaiveDate::from_ymd_opt(2019, 4, 1),
                ..FlaggedRecord::default()
            },
        ];
        fill_durations(&mut rows);
        let durations: Vec<_> = rows.iter().map(|r| r.event_duration_days).collect();
        assert_eq!(durations, vec![Some(17), Some(1), None]);
    }

    #[test]
    fn sort_is_stable_and_follows_registry() {
        let order = RegistryOrder::new(&registry(&["B", "A", "C"]));
        let mut rows = vec![
            row("A", Some("1"), "x"),
            row("Z", None, "x"),
            row("C", None, "x"),
            row("A", Some("2"), "x"),
            row("B", Some("3"), "x"),
        ];
        sort_by_registry_order(&mut rows, &order);
        let keys: Vec<(&str, Option<&str>)> = rows
            .iter()
            .map(|r| (r.id.as_str(), r.region1_code.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("B", Some("3")),
                ("A", Some("1")),
                ("A", Some("2")),
                ("C", None),
                ("Z", None),
            ]
        );
    }

    #[test]
    fn repeated_registry_id_keeps_first_rank() {
        let order = RegistryOrder::new(&registry(&["A", "B", "A"]));
        assert_eq!(order.rank("A"), Some(0));
        assert_eq!(order.rank("B"), Some(1));
        assert_eq!(order.rank("Q"), None);
    }
}
