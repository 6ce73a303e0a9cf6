use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// Storage seam for the sliding-window counters. The default is the
/// in-process map below; a multi-instance deployment swaps in a store
/// backed by a shared cache without touching the limiters.
pub trait RateLimitStore: Send + Sync {
    /// Record one call for `key` and return the count within the current
    /// window, resetting the window first if it has lapsed.
    fn hit(&self, key: &str, now: OffsetDateTime, window: Duration) -> u32;

    /// Drop entries whose window started more than `window` ago.
    fn sweep(&self, now: OffsetDateTime, window: Duration);
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: OffsetDateTime,
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Window>>,
}

impl RateLimitStore for MemoryStore {
    fn hit(&self, key: &str, now: OffsetDateTime, window: Duration) -> u32 {
        let mut entries = self.entries.lock().expect("rate limit store poisoned");
        let record = entries.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });
        if now - record.started_at > window {
            record.count = 0;
            record.started_at = now;
        }
        record.count += 1;
        record.count
    }

    fn sweep(&self, now: OffsetDateTime, window: Duration) {
        let mut entries = self.entries.lock().expect("rate limit store poisoned");
        let before = entries.len();
        entries.retain(|_, record| now - record.started_at <= window);
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(dropped, "swept stale rate limit entries");
        }
    }
}

/// One endpoint class: a named counter with a per-window maximum.
pub struct RateLimiter {
    name: &'static str,
    max: u32,
    window: Duration,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn hourly(name: &'static str, max: u32, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            name,
            max,
            window: Duration::hours(1),
            store,
        }
    }

    /// Fails fast with `RateLimited` before any business logic runs.
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        self.check_at(key, OffsetDateTime::now_utc())
    }

    pub(crate) fn check_at(&self, key: &str, now: OffsetDateTime) -> Result<(), ApiError> {
        let scoped = format!("{}_{}", self.name, key);
        let count = self.store.hit(&scoped, now, self.window);
        if count > self.max {
            warn!(limiter = self.name, key, count, max = self.max, "rate limit exceeded");
            return Err(ApiError::RateLimited(
                "Too many requests. Please try again later.".into(),
            ));
        }
        debug!(limiter = self.name, key, count, max = self.max, "rate limit check");
        Ok(())
    }

    fn sweep_at(&self, now: OffsetDateTime) {
        self.store.sweep(now, self.window);
    }
}

/// The three counters guarding the verification endpoints, sharing one
/// store the way the original middleware shared one attempts map.
pub struct RateLimits {
    pub registration: RateLimiter,
    pub confirmation: RateLimiter,
    pub resend: RateLimiter,
}

impl RateLimits {
    pub fn new(cfg: &RateLimitConfig) -> Self {
        Self::with_store(cfg, Arc::new(MemoryStore::default()))
    }

    pub fn with_store(cfg: &RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            registration: RateLimiter::hourly("reg", cfg.registration_per_hour, store.clone()),
            confirmation: RateLimiter::hourly("conf", cfg.confirmation_per_hour, store.clone()),
            resend: RateLimiter::hourly("resend", cfg.resend_per_hour, store),
        }
    }

    /// Hourly garbage collection of stale keys.
    pub fn sweep(&self) {
        let now = OffsetDateTime::now_utc();
        self.registration.sweep_at(now);
        self.confirmation.sweep_at(now);
        self.resend.sweep_at(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::hourly("test", max, Arc::new(MemoryStore::default()))
    }

    #[test]
    fn allows_up_to_max_then_rejects() {
        let limiter = limiter(5);
        let now = OffsetDateTime::now_utc();
        for _ in 0..5 {
            limiter.check_at("1.2.3.4", now).expect("within limit");
        }
        let err = limiter.check_at("1.2.3.4", now).unwrap_err();
        assert!(matches!(err, ApiError::RateLimited(_)));
    }

    #[test]
    fn window_rollover_resets_count() {
        let limiter = limiter(2);
        let now = OffsetDateTime::now_utc();
        limiter.check_at("k", now).unwrap();
        limiter.check_at("k", now).unwrap();
        assert!(limiter.check_at("k", now).is_err());

        let later = now + Duration::hours(1) + Duration::seconds(1);
        limiter.check_at("k", later).expect("window rolled over");
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1);
        let now = OffsetDateTime::now_utc();
        limiter.check_at("a", now).unwrap();
        assert!(limiter.check_at("a", now).is_err());
        limiter.check_at("b", now).expect("different key unaffected");
    }

    #[test]
    fn classes_do_not_share_counts() {
        let cfg = RateLimitConfig {
            registration_per_hour: 1,
            confirmation_per_hour: 1,
            resend_per_hour: 1,
        };
        let limits = RateLimits::new(&cfg);
        let now = OffsetDateTime::now_utc();
        limits.registration.check_at("ip", now).unwrap();
        assert!(limits.registration.check_at("ip", now).is_err());
        limits.confirmation.check_at("ip", now).expect("own counter");
    }

    #[test]
    fn sweep_drops_stale_entries_only() {
        let store = Arc::new(MemoryStore::default());
        let now = OffsetDateTime::now_utc();
        store.hit("old", now - Duration::hours(2), Duration::hours(1));
        store.hit("fresh", now, Duration::hours(1));
        store.sweep(now, Duration::hours(1));

        let entries = store.entries.lock().unwrap();
        assert!(!entries.contains_key("old"));
        assert!(entries.contains_key("fresh"));
    }
}
