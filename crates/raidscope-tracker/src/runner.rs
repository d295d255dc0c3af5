//! Periodic rescans driven by the host.

use std::{future::Future, time::Duration};

use raidscope_network::ChangeNotifier;
use raidscope_ops::PersistenceStore;
use raidscope_scraper::RowSource;
use raidscope_types::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::{tracker_error, TrackerService};

/// Rescans a row source on a fixed period until shut down.
///
/// Ticks never overlap: a slow scan delays the next tick instead of
/// stacking up. The first scan runs immediately.
pub struct TrackerRunner<P, N, S>
where
    P: PersistenceStore + Clone,
    N: ChangeNotifier,
    S: RowSource,
{
    service: TrackerService<P, N>,
    source: S,
    period: Duration,
}

impl<P, N, S> TrackerRunner<P, N, S>
where
    P: PersistenceStore + Clone,
    N: ChangeNotifier,
    S: RowSource,
{
    pub fn new(service: TrackerService<P, N>, source: S) -> Result<Self> {
        let period_ms = service.settings().rescan_interval_ms;
        if period_ms == 0 {
            return Err(tracker_error("rescan interval must be greater than zero"));
        }
        Ok(Self {
            service,
            source,
            period: Duration::from_millis(period_ms),
        })
    }

    pub fn service(&self) -> &TrackerService<P, N> {
        &self.service
    }

    pub fn into_service(self) -> TrackerService<P, N> {
        self.service
    }

    /// Runs until `shutdown` resolves. Returns the number of completed scans.
    ///
    /// Scan failures are logged and the loop keeps going.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            source = %self.source.describe(),
            period_ms = self.period.as_millis() as u64,
            "starting periodic rescans"
        );
        let mut scans = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.service.rescan(&self.source).await {
                        warn!(error = %err, "rescan failed; will retry next tick");
                    }
                    scans += 1;
                }
            }
        }
        info!(scans, "periodic rescans stopped");
        scans
    }
}
