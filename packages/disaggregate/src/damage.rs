//! Damage re-basing.

use flood_events_config::DamageConfig;
use flood_events_event_models::SourceEvent;

/// Expresses a nominal damage figure in reference-year US$.
#[must_use]
pub fn rebase_damage(total_damage: Option<f64>, damage: &DamageConfig) -> Option<f64> {
    total_damage
        .filter(|value| value.is_finite())
        .map(|value| value * damage.deflator_ratio)
}

/// Returns a copy of `event` with `total_damage_adjusted` filled in.
#[must_use]
pub fn with_adjusted_damage(event: &SourceEvent, damage: &DamageConfig) -> SourceEvent {
    SourceEvent {
        total_damage_adjusted: rebase_damage(event.total_damage, damage),
        ..event.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAMAGE: DamageConfig = DamageConfig {
        deflator_ratio: 1.5,
    };

    #[test]
    fn scales_by_deflator() {
        let adjusted = rebase_damage(Some(200.0), &DAMAGE).unwrap();
        assert!((adjusted - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_or_nan_damage_stays_missing() {
        assert_eq!(rebase_damage(None, &DAMAGE), None);
        assert_eq!(rebase_damage(Some(f64::NAN), &DAMAGE), None);
    }

    #[test]
    fn copies_event_with_adjusted_value() {
        let event = SourceEvent {
            id: "E1".to_string(),
            total_damage: Some(10.0),
            ..SourceEvent::default()
        };
        let adjusted = with_adjusted_damage(&event, &DAMAGE);
        assert_eq!(adjusted.id, "E1");
        assert_eq!(adjusted.total_damage, Some(10.0));
        assert_eq!(adjusted.total_damage_adjusted, Some(15.0));
    }
}
