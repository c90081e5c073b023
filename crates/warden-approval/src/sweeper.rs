//! Background expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use warden_core::Clock;

use crate::rate_limit::RateLimiter;
use crate::store::ApprovalStore;

/// Periodically expires overdue approvals and drops stale rate windows.
#[derive(Debug)]
pub struct ExpirySweeper {
    store: Arc<ApprovalStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl ExpirySweeper {
    /// Create a sweeper that runs every `interval`.
    #[must_use]
    pub fn new(store: Arc<ApprovalStore>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            store,
            clock,
            interval,
            rate_limiter: None,
        }
    }

    /// Also purge ended rate-limit windows on each tick.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Run one sweep now. Returns how many approvals expired.
    pub fn sweep_once(&self) -> usize {
        let now = self.clock.now();
        let expired = self.store.sweep(now).len();
        if let Some(limiter) = &self.rate_limiter {
            let purged = limiter.purge_expired(now);
            if purged > 0 {
                debug!(purged, "dropped ended rate-limit windows");
            }
        }
        expired
    }

    /// Spawn the sweep loop. It stops when `cancel` fires.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_ms = ?self.interval.as_millis(), "expiry sweeper started");
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_once();
                    },
                }
            }
            info!("expiry sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ApprovalStatus;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::sync::Mutex;
    use warden_core::{HttpVerb, InvocationRequest};

    #[derive(Debug)]
    struct FixedClock(Mutex<DateTime<Utc>>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn test_sweep_once() {
        let start = Utc::now();
        let clock = Arc::new(FixedClock(Mutex::new(start)));
        let store = Arc::new(ApprovalStore::new(Duration::from_secs(60)));
        let record = store.create(
            InvocationRequest::new("shop", "op", HttpVerb::Post, "/orders"),
            None,
            start,
        );

        let sweeper = ExpirySweeper::new(Arc::clone(&store), clock.clone(), Duration::from_secs(1));
        assert_eq!(sweeper.sweep_once(), 0);

        *clock.0.lock().unwrap() = start.checked_add_signed(TimeDelta::seconds(61)).unwrap();
        assert_eq!(sweeper.sweep_once(), 1);
        assert_eq!(store.get(&record.id).unwrap().status, ApprovalStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_sweeps_and_stops() {
        let start = Utc::now();
        let clock = Arc::new(FixedClock(Mutex::new(
            start.checked_add_signed(TimeDelta::hours(2)).unwrap(),
        )));
        let store = Arc::new(ApprovalStore::new(Duration::from_secs(3600)));
        let record = store.create(
            InvocationRequest::new("shop", "op", HttpVerb::Post, "/orders"),
            None,
            start,
        );

        let cancel = CancellationToken::new();
        let handle = ExpirySweeper::new(Arc::clone(&store), clock, Duration::from_secs(5))
            .with_rate_limiter(Arc::new(RateLimiter::new()))
            .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(store.get(&record.id).unwrap().status, ApprovalStatus::Expired);

        cancel.cancel();
        handle.await.unwrap();
    }
}
