//! Bounded, deduplicated, persisted log of tracked observations.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use raidscope_types::observation::Observation;
use tracing::{debug, warn};

use crate::persistence::{PersistenceStore, OBSERVATIONS_KEY};

pub const DEFAULT_MAX_OBSERVATIONS: usize = 100;

/// Newest-first observation log.
///
/// `ids` always holds exactly the ids present in `entries`, and `entries`
/// never grows past `max_entries`. Every mutation is written through to the
/// persistence store; write failures are logged and the in-memory log stays
/// authoritative.
pub struct ObservationStore<P: PersistenceStore> {
    entries: VecDeque<Observation>,
    ids: HashSet<String>,
    max_entries: usize,
    persistence: P,
}

impl<P: PersistenceStore> ObservationStore<P> {
    /// Restores the persisted log. Missing or malformed data starts an empty log.
    pub fn load(persistence: P, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        let stored = match persistence.get(OBSERVATIONS_KEY) {
            Ok(Some(doc)) => serde_json::from_str::<Vec<Observation>>(&doc).unwrap_or_else(|err| {
                warn!(error = %err, "discarding malformed observation log");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read observation log; starting empty");
                Vec::new()
            }
        };

        let mut entries = VecDeque::with_capacity(max_entries.min(stored.len()));
        let mut ids = HashSet::new();
        for observation in stored {
            if entries.len() == max_entries {
                break;
            }
            if ids.insert(observation.id.clone()) {
                entries.push_back(observation);
            }
        }
        debug!(restored = entries.len(), max_entries, "observation log loaded");

        Self {
            entries,
            ids,
            max_entries,
            persistence,
        }
    }

    /// Inserts at the front unless the id is already tracked. Returns whether it was inserted.
    pub fn add(&mut self, observation: Observation) -> bool {
        if self.ids.contains(&observation.id) {
            return false;
        }
        self.ids.insert(observation.id.clone());
        self.entries.push_front(observation);

        while self.entries.len() > self.max_entries {
            if let Some(evicted) = self.entries.pop_back() {
                debug!(id = %evicted.id, "evicted oldest observation");
                self.ids.remove(&evicted.id);
            }
        }

        self.persist();
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Empties the log and returns how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.ids.clear();
        self.persist();
        removed
    }

    /// Entries still en route at `now`, in stored order.
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<&Observation> {
        self.entries.iter().filter(|o| o.is_active_at(now)).collect()
    }

    /// Entries that have arrived by `now`, in stored order.
    pub fn past_at(&self, now: DateTime<Utc>) -> Vec<&Observation> {
        self.entries.iter().filter(|o| !o.is_active_at(now)).collect()
    }

    pub fn snapshot(&self) -> Vec<Observation> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn persist(&self) {
        let doc = match serde_json::to_string(&self.entries) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(error = %err, "failed to serialize observation log");
                return;
            }
        };
        if let Err(err) = self.persistence.set(OBSERVATIONS_KEY, &doc) {
            warn!(error = %err, "failed to persist observation log; keeping in-memory state");
        }
    }
}
