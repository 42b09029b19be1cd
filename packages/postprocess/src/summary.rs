//! Per-region summary statistics over the final dataset.

use std::collections::HashMap;

use flood_events_event_models::{Flag, FlaggedRecord, RegionSummary};

#[derive(Default)]
struct Accumulator {
    event_count: u64,
    qualifying: u32,
    population: f64,
    area: f64,
    area_norm: f64,
}

impl Accumulator {
    fn mean(&self, total: f64) -> Option<f64> {
        (self.qualifying > 0).then(|| total / f64::from(self.qualifying))
    }
}

/// Summarizes the final dataset per coarse region.
///
/// `event_count` counts every row with a composite id. Means are taken
/// over rows without [`Flag::ZeroFloodedArea`] whose three metrics are all
/// present and strictly positive. Regions appear in the order they are
/// first encountered; rows without a region are skipped.
#[must_use]
pub fn summarize_regions(records: &[FlaggedRecord]) -> Vec<RegionSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, Accumulator> = HashMap::new();

    for record in records {
        let Some(code) = record.region1_code.as_deref() else {
            continue;
        };
        let acc = totals.entry(code).or_insert_with(|| {
            order.push(code);
            Accumulator::default()
        });

        if record.composite_id.is_some() {
            acc.event_count += 1;
        }
        if record.flags.contains(Flag::ZeroFloodedArea) {
            continue;
        }
        if let (Some(population), Some(area), Some(area_norm)) = (
            positive(record.flooded_population),
            positive(record.flooded_area),
            positive(record.flooded_area_norm),
        ) {
            acc.qualifying += 1;
            acc.population += population;
            acc.area += area;
            acc.area_norm += area_norm;
        }
    }

    order
        .into_iter()
        .filter_map(|code| {
            let acc = totals.get(code)?;
            Some(RegionSummary {
                region1_code: code.to_string(),
                event_count: acc.event_count,
                mean_flooded_population: acc.mean(acc.population),
                mean_flooded_area: acc.mean(acc.area),
                mean_flooded_area_norm: acc.mean(acc.area_norm),
            })
        })
        .collect()
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}
