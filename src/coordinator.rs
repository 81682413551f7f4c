//! Refresh cadence and snapshot publication
//!
//! The coordinator drives the fetch → ingest → derive pipeline. The loop is
//! strictly sequential, which enforces at-most-one-in-flight refresh: an
//! hour boundary that turns over while a fetch is still running is picked up
//! by the next wake-up rather than queueing a second request. The published
//! snapshot is only ever replaced atomically through the watch channel,
//! never mutated in place, so readers are safe during an in-progress
//! refresh.

use crate::config::PollingConfig;
use crate::derive::{DerivedSnapshot, derive};
use crate::error::{ElektraError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::ostrom::api::PriceSource;
use crate::ostrom::types::hour_floor;
use crate::series::PriceSeriesStore;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Drives periodic refreshes and owns the published snapshot
pub struct PollCoordinator {
    source: Box<dyn PriceSource>,
    store: Arc<RwLock<PriceSeriesStore>>,
    polling: PollingConfig,
    snapshot_tx: watch::Sender<Arc<DerivedSnapshot>>,
    consecutive_failures: u32,
    total_refreshes: u64,
    total_failures: u64,
    logger: StructuredLogger,
}

impl PollCoordinator {
    /// Create a new coordinator over the given source and store
    pub fn new(
        source: Box<dyn PriceSource>,
        store: Arc<RwLock<PriceSeriesStore>>,
        polling: PollingConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(DerivedSnapshot::empty(Utc::now())));
        Self {
            source,
            store,
            polling,
            snapshot_tx,
            consecutive_failures: 0,
            total_refreshes: 0,
            total_failures: 0,
            logger: get_logger("coordinator"),
        }
    }

    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> watch::Receiver<Arc<DerivedSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// The most recently published snapshot
    pub fn latest(&self) -> Arc<DerivedSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Consecutive failed refresh cycles since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Fetch window covering local yesterday through local tomorrow,
    /// sufficient for boundary queries at any moment
    async fn fetch_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let store = self.store.read().await;
        let day = store.local_day(now);
        let start = store
            .local_midnight_utc(day - TimeDelta::days(1))
            .unwrap_or(now - TimeDelta::days(1));
        let end = store
            .local_midnight_utc(day + TimeDelta::days(2))
            .unwrap_or(now + TimeDelta::days(2));
        (start, end)
    }

    /// Run one refresh cycle at `now`: fetch, ingest, derive, publish.
    ///
    /// On failure the previous snapshot stays published; once failures reach
    /// the configured threshold it is republished with the stale flag set.
    pub async fn refresh_once(&mut self, now: DateTime<Utc>) -> Result<()> {
        let (window_start, window_end) = self.fetch_window(now).await;

        // The cycle timeout bounds the whole fetch including the token
        // exchange and the single auth retry
        let cycle_timeout = Duration::from_secs(self.polling.request_timeout_secs * 3);
        let result = match tokio::time::timeout(
            cycle_timeout,
            self.source.fetch(window_start, window_end),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ElektraError::timeout(format!(
                "Refresh cycle exceeded {} seconds",
                cycle_timeout.as_secs()
            ))),
        };

        match result {
            Ok((points, fees)) => {
                let mut store = self.store.write().await;
                store.ingest(points, fees, now);
                let gaps = store.missing_hours();
                if !gaps.is_empty() {
                    self.logger.warn(&format!(
                        "Price series has {} missing hours, first at {}",
                        gaps.len(),
                        gaps[0]
                    ));
                }
                let snapshot = derive(&store, now);
                drop(store);

                self.consecutive_failures = 0;
                self.total_refreshes += 1;
                self.snapshot_tx.send_replace(Arc::new(snapshot));
                self.logger.debug("Published fresh snapshot");
                Ok(())
            }
            Err(err) => {
                self.consecutive_failures += 1;
                self.total_failures += 1;
                if self.consecutive_failures >= self.polling.stale_after_failures {
                    let mut previous = (**self.snapshot_tx.borrow()).clone();
                    if !previous.stale {
                        self.logger.warn(&format!(
                            "{} consecutive failures, marking snapshot stale",
                            self.consecutive_failures
                        ));
                    }
                    previous.stale = true;
                    self.snapshot_tx.send_replace(Arc::new(previous));
                }
                Err(err)
            }
        }
    }

    /// Exponential backoff for transient failures, capped at the maximum
    fn backoff_delay(&self) -> Duration {
        let exponent = self.consecutive_failures.saturating_sub(1).min(5);
        let secs = self
            .polling
            .backoff_initial_secs
            .saturating_mul(1u64 << exponent);
        Duration::from_secs(secs.min(self.polling.backoff_max_secs))
    }

    /// Delay until the next scheduled wake-up: shortly after the next hour
    /// boundary, but never longer than the safety refresh interval
    fn next_wake_delay(&self, now: DateTime<Utc>) -> Duration {
        let next_hour = hour_floor(now) + TimeDelta::hours(1);
        let to_boundary = u64::try_from((next_hour - now).num_seconds().max(0)).unwrap_or(0)
            + self.polling.hour_alignment_delay_secs;
        Duration::from_secs(to_boundary.min(self.polling.refresh_interval_secs))
    }

    /// Run the refresh loop until `shutdown` fires
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.logger.info("Poll coordinator starting");
        loop {
            let now = Utc::now();
            let delay = match self.refresh_once(now).await {
                Ok(()) => self.next_wake_delay(Utc::now()),
                Err(err) if err.is_transient() => {
                    let delay = self.backoff_delay();
                    self.logger.warn(&format!(
                        "Refresh failed ({}), retrying in {} seconds",
                        err,
                        delay.as_secs()
                    ));
                    delay
                }
                Err(err) => {
                    // Auth and data errors are not retried within the cycle;
                    // auth in particular needs user action on credentials
                    self.logger.error(&format!("Refresh failed: {}", err));
                    self.next_wake_delay(Utc::now())
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.logger.info("Poll coordinator shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ostrom::types::{FeeSnapshot, PricePoint};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct NoopSource;

    #[async_trait]
    impl PriceSource for NoopSource {
        async fn fetch(
            &mut self,
            _window_start: DateTime<Utc>,
            _window_end: DateTime<Utc>,
        ) -> Result<(Vec<PricePoint>, Option<FeeSnapshot>)> {
            Ok((Vec::new(), None))
        }
    }

    fn coordinator_with_failures(failures: u32) -> PollCoordinator {
        let store = Arc::new(RwLock::new(PriceSeriesStore::new(chrono_tz::UTC)));
        let mut coordinator =
            PollCoordinator::new(Box::new(NoopSource), store, PollingConfig::default());
        coordinator.consecutive_failures = failures;
        coordinator
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(
            coordinator_with_failures(1).backoff_delay(),
            Duration::from_secs(30)
        );
        assert_eq!(
            coordinator_with_failures(2).backoff_delay(),
            Duration::from_secs(60)
        );
        assert_eq!(
            coordinator_with_failures(3).backoff_delay(),
            Duration::from_secs(120)
        );
        // Far past the cap
        assert_eq!(
            coordinator_with_failures(12).backoff_delay(),
            Duration::from_secs(900)
        );
    }

    #[test]
    fn wake_delay_targets_the_hour_boundary() {
        let coordinator = coordinator_with_failures(0);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 50, 0).unwrap();
        // 10 minutes to the boundary plus the alignment delay
        assert_eq!(
            coordinator.next_wake_delay(now),
            Duration::from_secs(600 + 5)
        );
    }

    #[test]
    fn wake_delay_capped_by_safety_refresh_interval() {
        let coordinator = coordinator_with_failures(0);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 30).unwrap();
        assert_eq!(coordinator.next_wake_delay(now), Duration::from_secs(900));
    }

    #[tokio::test]
    async fn fetch_window_spans_yesterday_through_tomorrow() {
        let coordinator = coordinator_with_failures(0);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let (start, end) = coordinator.fetch_window(now).await;
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 30, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap());
    }
}
