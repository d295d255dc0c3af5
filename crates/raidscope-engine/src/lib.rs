//! Inverse travel-time matching: from an observed duration back to candidate units.

pub use raidscope_types::observation::MatchMode;
use raidscope_types::{
    observation::UnitMatch,
    speed::{SpeedConfig, SpeedModel},
    units::UnitType,
};
use tracing::debug;

/// Candidates predicted within this many minutes of the observation are exact.
pub const EXACT_THRESHOLD_MINUTES: f64 = 0.5;
pub const DEFAULT_TOLERANCE_MINUTES: f64 = 2.0;
/// Implied distances outside this range are implausible on a game map.
pub const MIN_IMPLIED_DISTANCE: f64 = 0.5;
pub const MAX_IMPLIED_DISTANCE: f64 = 150.0;

pub trait UnitInference {
    fn match_by_duration(&self, minutes: f64) -> Vec<UnitMatch>;
    fn match_by_distance(&self, minutes: f64, distance: f64) -> Vec<UnitMatch>;

    /// Uses the known distance when there is one.
    fn infer(&self, minutes: f64, distance: Option<f64>) -> (MatchMode, Vec<UnitMatch>) {
        match distance {
            Some(distance) => (
                MatchMode::KnownDistance,
                self.match_by_distance(minutes, distance),
            ),
            None => (MatchMode::DurationOnly, self.match_by_duration(minutes)),
        }
    }
}

/// Ranks every unit type against an observed travel time.
#[derive(Debug, Clone, Copy)]
pub struct UnitMatcher {
    model: SpeedModel,
    tolerance: f64,
}

impl UnitMatcher {
    pub fn new(speed: SpeedConfig) -> Self {
        Self {
            model: SpeedModel::new(speed),
            tolerance: DEFAULT_TOLERANCE_MINUTES,
        }
    }

    /// Negative or non-finite tolerances fall back to the default.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = if tolerance.is_finite() && tolerance >= 0.0 {
            tolerance
        } else {
            DEFAULT_TOLERANCE_MINUTES
        };
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn speed(&self) -> SpeedConfig {
        self.model.config()
    }

    fn candidate(
        &self,
        unit: UnitType,
        observed: f64,
        distance: u32,
        predicted: f64,
    ) -> Option<UnitMatch> {
        let delta = (observed - predicted).abs();
        (delta <= self.tolerance).then_some(UnitMatch {
            unit,
            distance,
            predicted_minutes: predicted,
            delta_minutes: delta,
            is_exact: delta < EXACT_THRESHOLD_MINUTES,
        })
    }
}

impl Default for UnitMatcher {
    fn default() -> Self {
        Self::new(SpeedConfig::default())
    }
}

impl UnitInference for UnitMatcher {
    fn match_by_duration(&self, minutes: f64) -> Vec<UnitMatch> {
        let mut matches: Vec<UnitMatch> = UnitType::ALL
            .iter()
            .filter_map(|&unit| {
                let per_field = self.model.minutes_per_field(unit);
                let implied = minutes / per_field;
                if !(MIN_IMPLIED_DISTANCE..=MAX_IMPLIED_DISTANCE).contains(&implied) {
                    return None;
                }
                let distance = implied.round();
                self.candidate(unit, minutes, distance as u32, distance * per_field)
            })
            .collect();
        sort_by_delta(&mut matches);
        debug!(
            minutes,
            candidates = matches.len(),
            "matched units by duration"
        );
        matches
    }

    fn match_by_distance(&self, minutes: f64, distance: f64) -> Vec<UnitMatch> {
        if !(distance.is_finite() && distance > 0.0) {
            return Vec::new();
        }
        let whole_fields = distance.round().max(1.0) as u32;
        let mut matches: Vec<UnitMatch> = UnitType::ALL
            .iter()
            .filter_map(|&unit| {
                let predicted = self.model.travel_minutes(unit, distance);
                self.candidate(unit, minutes, whole_fields, predicted)
            })
            .collect();
        sort_by_delta(&mut matches);
        debug!(
            minutes,
            distance,
            candidates = matches.len(),
            "matched units by known distance"
        );
        matches
    }
}

/// Stable, so equal deltas keep enumeration order.
fn sort_by_delta(matches: &mut [UnitMatch]) {
    matches.sort_by(|a, b| a.delta_minutes.total_cmp(&b.delta_minutes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use raidscope_types::time_codec::parse_duration;

    fn find(matches: &[UnitMatch], unit: UnitType) -> Option<&UnitMatch> {
        matches.iter().find(|m| m.unit == unit)
    }

    #[test]
    fn ninety_minutes_matches_scout_at_ten_fields() {
        let minutes = parse_duration("01:30:00");
        assert_eq!(minutes, 90.0);
        let matches = UnitMatcher::default().match_by_duration(minutes);
        let scout = find(&matches, UnitType::Scout).expect("scout candidate");
        assert_eq!(scout.distance, 10);
        assert!(scout.delta_minutes.abs() < 1e-9);
        assert!(scout.is_exact);
    }

    #[test]
    fn doubled_world_speed_doubles_implied_distance() {
        let matcher = UnitMatcher::new(SpeedConfig {
            world_speed: 2.0,
            unit_speed: 1.0,
        });
        let matches = matcher.match_by_duration(90.0);
        let scout = find(&matches, UnitType::Scout).expect("scout candidate");
        assert_eq!(scout.distance, 20);
        assert!(scout.is_exact);
    }

    #[test]
    fn near_misses_are_kept_but_not_exact() {
        let matches = UnitMatcher::default().match_by_duration(90.0);
        let heavy = find(&matches, UnitType::Heavy).expect("heavy candidate");
        assert_eq!(heavy.distance, 8);
        assert!(!heavy.is_exact);
        assert!((heavy.delta_minutes - 2.0).abs() < 1e-9);
        assert!(find(&matches, UnitType::Snob).is_none());
        assert_eq!(matches.last().map(|m| m.is_exact), Some(false));
    }

    #[test]
    fn equal_deltas_keep_enumeration_order() {
        let matches = UnitMatcher::default().match_by_duration(90.0);
        let exact: Vec<UnitType> = matches
            .iter()
            .filter(|m| m.delta_minutes == 0.0)
            .map(|m| m.unit)
            .collect();
        assert_eq!(
            exact,
            vec![
                UnitType::Spear,
                UnitType::Axe,
                UnitType::Archer,
                UnitType::Scout,
                UnitType::Light,
                UnitType::Marcher,
                UnitType::Ram,
                UnitType::Catapult,
                UnitType::Knight,
            ]
        );
    }

    #[test]
    fn implausible_distances_are_rejected() {
        let matcher = UnitMatcher::default();
        // 2 minutes is under half a field for every unit.
        assert!(matcher.match_by_duration(2.0).is_empty());
        // 200 fields of scouts is off the map even though it divides evenly.
        assert!(find(&matcher.match_by_duration(1800.0), UnitType::Scout).is_none());
        assert!(matcher.match_by_duration(0.0).is_empty());
        assert!(matcher.match_by_duration(f64::NAN).is_empty());
    }

    #[test]
    fn known_distance_ranks_closest_units_first() {
        let matches = UnitMatcher::default().match_by_distance(181.0, 10.0);
        let leading: Vec<UnitType> = matches.iter().take(3).map(|m| m.unit).collect();
        assert_eq!(leading, vec![UnitType::Spear, UnitType::Axe, UnitType::Archer]);
        for candidate in &matches[..3] {
            assert!((candidate.predicted_minutes - 180.0).abs() < 1e-9);
            assert!((candidate.delta_minutes - 1.0).abs() < 1e-9);
            assert!(!candidate.is_exact);
            assert_eq!(candidate.distance, 10);
        }
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn known_distance_with_no_plausible_unit_is_empty() {
        // Nothing covers 10 fields in roughly an hour at default speeds.
        assert!(UnitMatcher::default().match_by_distance(61.0, 10.0).is_empty());
        assert!(UnitMatcher::default().match_by_distance(90.0, 0.0).is_empty());
    }

    #[test]
    fn known_distance_skips_range_filter() {
        // 200 fields is fine when the distance is known precisely.
        let matches = UnitMatcher::default().match_by_distance(1800.0, 200.0);
        assert_eq!(matches.first().map(|m| m.unit), Some(UnitType::Scout));
    }

    #[test]
    fn tolerance_is_configurable() {
        let strict = UnitMatcher::default().with_tolerance(0.25);
        assert!(strict.match_by_duration(90.0).iter().all(|m| m.is_exact));
        let fallback = UnitMatcher::default().with_tolerance(-1.0);
        assert_eq!(fallback.tolerance(), DEFAULT_TOLERANCE_MINUTES);
    }

    #[test]
    fn infer_picks_mode_from_distance() {
        let matcher = UnitMatcher::default();
        assert_eq!(matcher.infer(90.0, None).0, MatchMode::DurationOnly);
        let (mode, matches) = matcher.infer(90.0, Some(10.0));
        assert_eq!(mode, MatchMode::KnownDistance);
        assert_eq!(matches.first().map(|m| m.unit), Some(UnitType::Scout));
    }

    proptest! {
        #[test]
        fn prop_duration_matches_are_plausible_and_sorted(
            minutes in 0.0f64..6000.0,
            world in 0.1f64..10.0,
            unit_speed in 0.1f64..10.0,
            tolerance in 0.0f64..5.0,
        ) {
            let matcher = UnitMatcher::new(SpeedConfig { world_speed: world, unit_speed })
                .with_tolerance(tolerance);
            let speed = matcher.speed();
            let matches = matcher.match_by_duration(minutes);
            for candidate in &matches {
                let per_field = candidate.unit.base_speed() / speed.multiplier();
                let implied = minutes / per_field;
                prop_assert!((MIN_IMPLIED_DISTANCE..=MAX_IMPLIED_DISTANCE).contains(&implied));
                prop_assert!(candidate.delta_minutes <= tolerance);
                prop_assert_eq!(candidate.is_exact, candidate.delta_minutes < EXACT_THRESHOLD_MINUTES);
            }
            for pair in matches.windows(2) {
                prop_assert!(pair[0].delta_minutes <= pair[1].delta_minutes);
            }
        }

        #[test]
        fn prop_distance_matches_within_tolerance(
            minutes in 0.0f64..6000.0,
            distance in 0.5f64..300.0,
        ) {
            let matches = UnitMatcher::default().match_by_distance(minutes, distance);
            for candidate in &matches {
                prop_assert!(candidate.delta_minutes <= DEFAULT_TOLERANCE_MINUTES);
                prop_assert!(candidate.distance >= 1);
            }
            for pair in matches.windows(2) {
                prop_assert!(pair[0].delta_minutes <= pair[1].delta_minutes);
            }
        }
    }
}
