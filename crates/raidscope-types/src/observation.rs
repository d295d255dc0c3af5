use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{speed::SpeedConfig, time_codec::minutes_between, units::UnitType};

/// One candidate unit for an observed travel time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitMatch {
    pub unit: UnitType,
    /// Whole fields, at least 1.
    pub distance: u32,
    pub predicted_minutes: f64,
    pub delta_minutes: f64,
    pub is_exact: bool,
}

/// How a match list was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    DurationOnly,
    KnownDistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationStatus {
    Active,
    Past,
}

/// A tracked incoming attack. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub detected_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    /// Countdown observed at detection time, in minutes.
    pub initial_minutes: f64,
    pub source_label: String,
    pub target_label: String,
    pub attacker_label: String,
    #[serde(default)]
    pub known_distance: Option<f64>,
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Most confident first.
    pub matches: Vec<UnitMatch>,
    pub speed: SpeedConfig,
}

impl Observation {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.arrival_at > now
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> ObservationStatus {
        if self.is_active_at(now) {
            ObservationStatus::Active
        } else {
            ObservationStatus::Past
        }
    }

    /// Minutes left until arrival, never negative.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> f64 {
        minutes_between(now, self.arrival_at).max(0.0)
    }

    pub fn primary_match(&self) -> Option<&UnitMatch> {
        self.matches.first()
    }

    pub fn exact_matches(&self) -> impl Iterator<Item = &UnitMatch> {
        self.matches.iter().filter(|m| m.is_exact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(arrival_offset_ms: i64) -> Observation {
        let now = Utc::now();
        Observation {
            id: "incoming-1".into(),
            detected_at: now,
            arrival_at: now + Duration::milliseconds(arrival_offset_ms),
            initial_minutes: arrival_offset_ms as f64 / 60_000.0,
            source_label: "500|500".into(),
            target_label: "510|500".into(),
            attacker_label: "Barbarossa".into(),
            known_distance: None,
            match_mode: MatchMode::DurationOnly,
            matches: vec![UnitMatch {
                unit: UnitType::Scout,
                distance: 10,
                predicted_minutes: 90.0,
                delta_minutes: 0.0,
                is_exact: true,
            }],
            speed: SpeedConfig::default(),
        }
    }

    #[test]
    fn status_follows_arrival() {
        let obs = sample(-1_000);
        let now = obs.detected_at;
        assert_eq!(obs.status_at(now), ObservationStatus::Past);
        assert_eq!(obs.remaining_minutes(now), 0.0);

        let obs = sample(90 * 60_000);
        let now = obs.detected_at;
        assert_eq!(obs.status_at(now), ObservationStatus::Active);
        assert!((obs.remaining_minutes(now) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn arrival_equal_to_now_is_past() {
        let obs = sample(0);
        assert!(!obs.is_active_at(obs.arrival_at));
    }

    #[test]
    fn serializes_as_flat_record() {
        let obs = sample(60_000);
        let value = serde_json::to_value(&obs).expect("serialize observation");
        assert_eq!(value["id"], "incoming-1");
        assert_eq!(value["matches"][0]["unit"], "scout");
        let back: Observation = serde_json::from_value(value.clone()).expect("deserialize observation");
        assert_eq!(back, obs);
        assert_eq!(back.primary_match().map(|m| m.unit), Some(UnitType::Scout));
        assert_eq!(back.exact_matches().count(), 1);
        assert_eq!(value["match_mode"], "duration_only");
    }

    #[test]
    fn records_without_match_mode_default_to_duration_only() {
        let mut value = serde_json::to_value(sample(60_000)).expect("serialize observation");
        value
            .as_object_mut()
            .expect("object")
            .remove("match_mode");
        let back: Observation = serde_json::from_value(value).expect("deserialize observation");
        assert_eq!(back.match_mode, MatchMode::DurationOnly);
    }
}
