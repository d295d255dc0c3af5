use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{observation::Observation, speed::SpeedConfig};

/// Change notification kinds emitted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerEventKind {
    ObservationAdded,
    Cleared,
    SpeedChanged,
    ScanEmpty,
}

/// Immutable event envelope handed to presentation listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEvent {
    pub id: Uuid,
    pub kind: TrackerEventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: TrackerPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackerPayload {
    ObservationAdded(Box<Observation>),
    Cleared { removed: usize },
    SpeedChanged(SpeedConfig),
    /// The scraper found nothing it could extract.
    ScanEmpty { source: String },
}

impl TrackerEvent {
    pub fn new(payload: TrackerPayload) -> Self {
        let kind = match &payload {
            TrackerPayload::ObservationAdded(_) => TrackerEventKind::ObservationAdded,
            TrackerPayload::Cleared { .. } => TrackerEventKind::Cleared,
            TrackerPayload::SpeedChanged(_) => TrackerEventKind::SpeedChanged,
            TrackerPayload::ScanEmpty { .. } => TrackerEventKind::ScanEmpty,
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn observation_added(observation: Observation) -> Self {
        Self::new(TrackerPayload::ObservationAdded(Box::new(observation)))
    }
}
