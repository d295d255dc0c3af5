use chrono::{DateTime, Utc};
use raidscope_tracker::TrackerSummary;
use raidscope_types::{
    events::{TrackerEvent, TrackerPayload},
    observation::{MatchMode, Observation, ObservationStatus, UnitMatch},
    time_codec::format_duration,
};

/// Candidates shown per observation.
const MAX_LISTED_MATCHES: usize = 6;

pub fn format_matches(matches: &[UnitMatch]) -> String {
    if matches.is_empty() {
        return "no matching units".into();
    }
    matches
        .iter()
        .take(MAX_LISTED_MATCHES)
        .map(|m| {
            let marker = if m.is_exact { "*" } else { "" };
            format!("{}{} (~{} fields)", m.unit.display_name(), marker, m.distance)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_match_table(matches: &[UnitMatch]) -> String {
    if matches.is_empty() {
        return "no unit matches this duration".into();
    }
    let mut lines = vec![format!(
        "{:<16} {:>8} {:>10} {:>8}  exact",
        "unit", "fields", "predicted", "delta"
    )];
    lines.extend(matches.iter().map(|m| {
        format!(
            "{:<16} {:>8} {:>10} {:>8.2}  {}",
            m.unit.display_name(),
            m.distance,
            format_duration(m.predicted_minutes),
            m.delta_minutes,
            if m.is_exact { "yes" } else { "no" }
        )
    }));
    lines.join("\n")
}

pub fn format_observation(observation: &Observation, now: DateTime<Utc>) -> String {
    let remaining = match observation.status_at(now) {
        ObservationStatus::Active => format_duration(observation.remaining_minutes(now)),
        ObservationStatus::Past => "arrived".into(),
    };
    let distance = match (observation.match_mode, observation.known_distance) {
        (MatchMode::KnownDistance, Some(known)) => format!(" {known} fields (known)"),
        _ => observation
            .primary_match()
            .map(|m| format!(" ~{} fields", m.distance))
            .unwrap_or_default(),
    };
    let exact = observation.exact_matches().count();
    format!(
        "[{remaining:>9}] {} {} -> {}{distance} | {exact} exact | {}",
        observation.attacker_label,
        observation.source_label,
        observation.target_label,
        format_matches(&observation.matches)
    )
}

pub fn summary_line(summary: TrackerSummary) -> String {
    format!(
        "active: {} | past: {} | total: {}",
        summary.active, summary.past, summary.total
    )
}

pub fn format_event(event: &TrackerEvent, now: DateTime<Utc>) -> String {
    let timestamp = event.timestamp.format("%H:%M:%S");
    match &event.payload {
        TrackerPayload::ObservationAdded(observation) => {
            format!("[{timestamp}] new incoming {}", format_observation(observation, now))
        }
        TrackerPayload::Cleared { removed } => {
            format!("[{timestamp}] cleared {removed} observations")
        }
        TrackerPayload::SpeedChanged(speed) => format!(
            "[{timestamp}] speed world={} unit={}",
            speed.world_speed, speed.unit_speed
        ),
        TrackerPayload::ScanEmpty { source } => {
            format!("[{timestamp}] no incoming rows found in {source}")
        }
    }
}
