//! Per-key fixed-window rate limiting.
//!
//! Each `(resource, caller)` key owns one window behind its own mutex. The
//! window is checked and incremented while the map entry is still held, so a
//! concurrent purge can never detach it mid-update. Only admitted requests
//! consume capacity.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use tracing::debug;

use warden_config::RateLimit;
use warden_core::ResourceId;

type WindowKey = (ResourceId, String);

#[derive(Debug, Clone, Copy)]
struct Window {
    end: DateTime<Utc>,
    count: u32,
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted and counted.
    Admitted {
        /// Requests left in the current window.
        remaining: u32,
    },
    /// Over the limit; not counted.
    Limited {
        /// The configured maximum.
        max_requests: u32,
        /// When the current window ends.
        window_end: DateTime<Utc>,
    },
}

impl RateDecision {
    /// Whether the request was admitted.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// In-memory fixed-window counters keyed by resource and caller.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use warden_approval::RateLimiter;
/// use warden_config::RateLimit;
/// use warden_core::ResourceId;
///
/// let limiter = RateLimiter::new();
/// let limit = RateLimit::new(1, 60);
/// let shop = ResourceId::new("shop");
/// let now = Utc::now();
///
/// assert!(limiter.check_and_record(&shop, "agent", &limit, now).is_admitted());
/// assert!(!limiter.check_and_record(&shop, "agent", &limit, now).is_admitted());
/// assert!(limiter.check_and_record(&shop, "other", &limit, now).is_admitted());
/// ```
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<WindowKey, Mutex<Window>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against the key's window if capacity remains.
    ///
    /// The window resets when `now` is past its end. The counter is
    /// incremented and compared to the maximum; a request over the limit
    /// leaves the counter unchanged.
    pub fn check_and_record(
        &self,
        resource: &ResourceId,
        caller: &str,
        limit: &RateLimit,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let entry = self
            .windows
            .entry((resource.clone(), caller.to_string()))
            .or_insert_with(|| {
                Mutex::new(Window {
                    end: window_end(now, limit),
                    count: 0,
                })
            });

        let mut window = entry.value().lock().unwrap_or_else(|e| {
            tracing::warn!("rate limit window lock poisoned, recovering");
            e.into_inner()
        });

        if now > window.end {
            window.end = window_end(now, limit);
            window.count = 0;
        }

        let next = window.count.saturating_add(1);
        if next > limit.max_requests {
            debug!(
                resource = %resource,
                caller,
                max_requests = limit.max_requests,
                "rate limit exceeded"
            );
            return RateDecision::Limited {
                max_requests: limit.max_requests,
                window_end: window.end,
            };
        }

        window.count = next;
        RateDecision::Admitted {
            remaining: limit.max_requests.saturating_sub(next),
        }
    }

    /// Drop windows that ended before `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, slot| {
            slot.get_mut()
                .map(|w| w.end >= now)
                // A poisoned window is dropped; the next request starts fresh.
                .unwrap_or(false)
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked windows.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

fn window_end(now: DateTime<Utc>, limit: &RateLimit) -> DateTime<Utc> {
    let secs = i64::try_from(limit.window_secs).unwrap_or(i64::MAX);
    TimeDelta::try_seconds(secs)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn shop() -> ResourceId {
        ResourceId::new("shop")
    }

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = RateLimiter::new();
        let limit = RateLimit::new(3, 60);
        let now = Utc::now();

        for expected_remaining in [2, 1, 0] {
            assert_eq!(
                limiter.check_and_record(&shop(), "a", &limit, now),
                RateDecision::Admitted {
                    remaining: expected_remaining
                }
            );
        }
        assert!(!limiter.check_and_record(&shop(), "a", &limit, now).is_admitted());
    }

    #[test]
    fn test_rejected_requests_do_not_consume() {
        let limiter = RateLimiter::new();
        let limit = RateLimit::new(1, 60);
        let start = Utc::now();

        assert!(limiter.check_and_record(&shop(), "a", &limit, start).is_admitted());
        for _ in 0..5 {
            assert!(!limiter.check_and_record(&shop(), "a", &limit, start).is_admitted());
        }

        let rolled = start.checked_add_signed(TimeDelta::seconds(61)).unwrap();
        assert!(limiter.check_and_record(&shop(), "a", &limit, rolled).is_admitted());
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let limiter = RateLimiter::new();
        let limit = RateLimit::new(1, 60);
        let start = Utc::now();
        assert!(limiter.check_and_record(&shop(), "a", &limit, start).is_admitted());

        // Exactly at the window end the old window still applies.
        let at_end = start.checked_add_signed(TimeDelta::seconds(60)).unwrap();
        assert!(!limiter.check_and_record(&shop(), "a", &limit, at_end).is_admitted());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let limit = RateLimit::new(1, 60);
        let now = Utc::now();

        assert!(limiter.check_and_record(&shop(), "a", &limit, now).is_admitted());
        assert!(limiter.check_and_record(&shop(), "b", &limit, now).is_admitted());
        assert!(
            limiter
                .check_and_record(&ResourceId::new("crm"), "a", &limit, now)
                .is_admitted()
        );
        assert_eq!(limiter.tracked_keys(), 3);
    }

    #[test]
    fn test_purge_expired() {
        let limiter = RateLimiter::new();
        let limit = RateLimit::new(1, 10);
        let now = Utc::now();
        limiter.check_and_record(&shop(), "a", &limit, now);

        assert_eq!(limiter.purge_expired(now), 0);
        let later = now.checked_add_signed(TimeDelta::seconds(11)).unwrap();
        assert_eq!(limiter.purge_expired(later), 1);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_purge_during_burst_never_admits_twice() {
        let limiter = Arc::new(RateLimiter::new());
        let limit = RateLimit::new(1, 60);
        let start = Utc::now();
        limiter.check_and_record(&shop(), "a", &limit, start);
        let later = start.checked_add_signed(TimeDelta::seconds(61)).unwrap();

        let purger = {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    limiter.purge_expired(later);
                }
            })
        };
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    limiter
                        .check_and_record(&ResourceId::new("shop"), "a", &limit, later)
                        .is_admitted()
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        purger.join().unwrap();
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_concurrent_burst_admits_exactly_limit() {
        let limiter = Arc::new(RateLimiter::new());
        let limit = RateLimit::new(25, 60);
        let now = Utc::now();

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    limiter
                        .check_and_record(&ResourceId::new("shop"), "burst", &limit, now)
                        .is_admitted()
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 25);
    }
}
