//! Tracker service: turns scraped rows into deduplicated, persisted observations.

pub mod normalize;
pub mod runner;

use chrono::{DateTime, Utc};
use raidscope_engine::{UnitInference, UnitMatcher};
use raidscope_network::{ChangeNotifier, ListenerRegistry};
use raidscope_ops::{
    persistence::{UNIT_SPEED_KEY, WORLD_SPEED_KEY},
    ObservationStore, PersistenceStore,
};
use raidscope_scraper::RowSource;
use raidscope_types::{
    config::{RaidscopeConfig, TrackerSettings},
    events::{TrackerEvent, TrackerPayload},
    observation::{Observation, UnitMatch},
    row::{non_empty, RawRow},
    speed::{clamp_factor, SpeedConfig},
    time_codec::{minutes_between, minutes_to_duration, parse_duration},
    RaidscopeError, Result,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::normalize::{
    identity_keys, parse_arrival, parse_distance, ArrivalKey, BatchOccurrences,
};

pub use runner::TrackerRunner;

pub const UNKNOWN_ATTACKER: &str = "unknown";
pub const UNKNOWN_VILLAGE: &str = "???";

/// Counts shown in a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackerSummary {
    pub active: usize,
    pub past: usize,
    pub total: usize,
}

/// Single-threaded orchestrator. Callers must not overlap mutating calls.
pub struct TrackerService<P, N>
where
    P: PersistenceStore + Clone,
    N: ChangeNotifier,
{
    store: ObservationStore<P>,
    persistence: P,
    notifier: N,
    listeners: ListenerRegistry,
    matcher: UnitMatcher,
    settings: TrackerSettings,
}

impl<P, N> TrackerService<P, N>
where
    P: PersistenceStore + Clone,
    N: ChangeNotifier,
{
    /// Restores persisted speeds and observations. Persisted speed factors
    /// override the configured ones.
    pub fn new(config: &RaidscopeConfig, persistence: P, notifier: N) -> Self {
        let speed = load_speed(&persistence, config.speed.into());
        let store = ObservationStore::load(persistence.clone(), config.tracker.max_observations);
        let matcher =
            UnitMatcher::new(speed).with_tolerance(config.tracker.match_tolerance_minutes);
        info!(
            world_speed = speed.world_speed,
            unit_speed = speed.unit_speed,
            restored = store.len(),
            "tracker ready"
        );
        Self {
            store,
            persistence,
            notifier,
            listeners: ListenerRegistry::new(),
            matcher,
            settings: config.tracker.clone(),
        }
    }

    /// Normalizes one row and records it. Returns the observation only when it is new.
    ///
    /// Rows without a usable positive duration, with an unparseable distance,
    /// with an arrival outside the representable range, or without enough
    /// fields to build an identity are skipped.
    pub fn ingest(&mut self, row: &RawRow, now: DateTime<Utc>) -> Option<Observation> {
        let prepared = self.prepare(row, now)?;
        self.record(row, prepared, 0, now)
    }

    /// Ingests every row against the same `now`. Returns the newly inserted observations.
    ///
    /// Rows of the batch that share attacker, source, target and arrival are
    /// kept apart by their position, so a train of commands from one village
    /// is not folded into a single observation.
    pub fn ingest_all(&mut self, rows: &[RawRow], now: DateTime<Utc>) -> Vec<Observation> {
        let mut batch = BatchOccurrences::default();
        rows.iter()
            .filter_map(|row| {
                let prepared = self.prepare(row, now)?;
                let occurrence = batch.next(row, prepared.arrival_key);
                self.record(row, prepared, occurrence, now)
            })
            .collect()
    }

    fn prepare(&self, row: &RawRow, now: DateTime<Utc>) -> Option<PreparedRow> {
        let stated_arrival = non_empty(&row.arrival).and_then(|text| parse_arrival(text, now));
        let Some(minutes) = resolve_minutes(row, now, stated_arrival) else {
            debug!(?row, "skipping row without a usable duration");
            return None;
        };
        let known_distance = match non_empty(&row.distance) {
            Some(text) => match parse_distance(text) {
                Some(distance) => Some(distance),
                None => {
                    debug!(distance = text, "skipping row with malformed distance");
                    return None;
                }
            },
            None => None,
        };
        let Some(arrival_at) =
            minutes_to_duration(minutes).and_then(|offset| now.checked_add_signed(offset))
        else {
            debug!(minutes, "skipping row with an out-of-range arrival");
            return None;
        };
        let arrival_key = match stated_arrival {
            Some(stated) => ArrivalKey::exact(stated),
            None => ArrivalKey::approximate(arrival_at),
        };
        Some(PreparedRow {
            minutes,
            known_distance,
            arrival_at,
            arrival_key,
        })
    }

    fn record(
        &mut self,
        row: &RawRow,
        prepared: PreparedRow,
        occurrence: usize,
        now: DateTime<Utc>,
    ) -> Option<Observation> {
        let Some(keys) = identity_keys(row, prepared.arrival_key, occurrence) else {
            debug!(?row, "skipping row without identity fields");
            return None;
        };
        if keys.iter().any(|key| self.store.contains(key)) {
            return None;
        }

        let (match_mode, matches) = self.matcher.infer(prepared.minutes, prepared.known_distance);
        let observation = Observation {
            id: keys[0].clone(),
            detected_at: now,
            arrival_at: prepared.arrival_at,
            initial_minutes: prepared.minutes,
            source_label: label_or(&row.source, UNKNOWN_VILLAGE),
            target_label: label_or(&row.target, UNKNOWN_VILLAGE),
            attacker_label: label_or(&row.attacker, UNKNOWN_ATTACKER),
            known_distance: prepared.known_distance,
            match_mode,
            matches,
            speed: self.matcher.speed(),
        };

        if !self.store.add(observation.clone()) {
            return None;
        }
        info!(
            id = %observation.id,
            attacker = %observation.attacker_label,
            source = %observation.source_label,
            target = %observation.target_label,
            mode = ?observation.match_mode,
            candidates = observation.matches.len(),
            leading = ?observation.primary_match().map(|m| m.unit.key()),
            "new incoming observation"
        );
        self.emit(TrackerEvent::observation_added(observation.clone()));
        Some(observation)
    }

    /// Fetches rows from `source` and ingests them. Returns how many were new.
    ///
    /// An empty fetch emits a `ScanEmpty` event so a presentation layer can
    /// report that the expected structure was not found.
    pub async fn rescan<S: RowSource + ?Sized>(&mut self, source: &S) -> Result<usize> {
        let rows = source.fetch_rows().await?;
        if rows.is_empty() {
            debug!(source = %source.describe(), "scan found no rows");
            self.emit(TrackerEvent::new(TrackerPayload::ScanEmpty {
                source: source.describe(),
            }));
            return Ok(0);
        }
        let inserted = self.ingest_all(&rows, Utc::now()).len();
        debug!(rows = rows.len(), inserted, "rescan complete");
        Ok(inserted)
    }

    /// Updates the speed factors used for future observations.
    ///
    /// Factors are clamped into range and persisted as decimal text. Stored
    /// observations keep the matches computed when they were detected.
    pub fn configure(&mut self, world_speed: f64, unit_speed: f64) -> SpeedConfig {
        let speed = SpeedConfig::clamped(world_speed, unit_speed);
        self.matcher = UnitMatcher::new(speed).with_tolerance(self.settings.match_tolerance_minutes);

        for (key, value) in [
            (WORLD_SPEED_KEY, speed.world_speed),
            (UNIT_SPEED_KEY, speed.unit_speed),
        ] {
            if let Err(err) = self.persistence.set(key, &value.to_string()) {
                warn!(key, error = %err, "failed to persist speed factor");
            }
        }
        info!(
            world_speed = speed.world_speed,
            unit_speed = speed.unit_speed,
            "speed configuration updated"
        );
        self.emit(TrackerEvent::new(TrackerPayload::SpeedChanged(speed)));
        speed
    }

    /// Candidates for a duration under the current configuration, without recording anything.
    pub fn match_units(&self, minutes: f64, distance: Option<f64>) -> Vec<UnitMatch> {
        self.matcher.infer(minutes, distance).1
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.store.clear();
        info!(removed, "cleared tracked observations");
        self.emit(TrackerEvent::new(TrackerPayload::Cleared { removed }));
        removed
    }

    /// Registers a synchronous callback for every change event.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&TrackerEvent) + Send + Sync + 'static,
    {
        self.listeners.on_change(listener);
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn snapshot(&self) -> Vec<Observation> {
        self.store.snapshot()
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<&Observation> {
        self.store.active_at(now)
    }

    pub fn past_at(&self, now: DateTime<Utc>) -> Vec<&Observation> {
        self.store.past_at(now)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> TrackerSummary {
        let active = self.store.active_at(now).len();
        TrackerSummary {
            active,
            past: self.store.len() - active,
            total: self.store.len(),
        }
    }

    pub fn speed(&self) -> SpeedConfig {
        self.matcher.speed()
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    fn emit(&self, event: TrackerEvent) {
        self.listeners.notify(&event);
        self.notifier.publish(event);
    }
}

/// Normalized fields of a row, before its identity is settled.
#[derive(Debug, Clone, Copy)]
struct PreparedRow {
    minutes: f64,
    known_distance: Option<f64>,
    arrival_at: DateTime<Utc>,
    arrival_key: ArrivalKey,
}

/// Countdown first, then arrival text. Only positive durations count.
fn resolve_minutes(
    row: &RawRow,
    now: DateTime<Utc>,
    stated_arrival: Option<DateTime<Utc>>,
) -> Option<f64> {
    let from_countdown = non_empty(&row.countdown)
        .map(parse_duration)
        .filter(|minutes| *minutes > 0.0);
    from_countdown.or_else(|| {
        Some(minutes_between(now, stated_arrival?)).filter(|minutes| *minutes > 0.0)
    })
}

fn label_or(field: &Option<String>, fallback: &str) -> String {
    non_empty(field).unwrap_or(fallback).to_owned()
}

fn load_speed<P: PersistenceStore>(persistence: &P, configured: SpeedConfig) -> SpeedConfig {
    let read = |key: &str, fallback: f64| -> f64 {
        match persistence.get(key) {
            Ok(Some(text)) => match text.trim().parse::<f64>() {
                Ok(value) if value > 0.0 => clamp_factor(value),
                _ => {
                    warn!(key, value = %text, "ignoring malformed persisted speed factor");
                    fallback
                }
            },
            Ok(None) => fallback,
            Err(err) => {
                warn!(key, error = %err, "failed to read persisted speed factor");
                fallback
            }
        }
    };
    SpeedConfig::clamped(
        read(WORLD_SPEED_KEY, configured.world_speed),
        read(UNIT_SPEED_KEY, configured.unit_speed),
    )
}

pub fn tracker_error(message: impl Into<String>) -> RaidscopeError {
    RaidscopeError::Tracker(message.into())
}
