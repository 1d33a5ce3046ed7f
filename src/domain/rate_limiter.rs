//! Rate Limiter
//!
//! Per-recipient, per-query anti-spam gate for the interactive commands.
//! A recipient may hit each query class at most once per window. Denied
//! attempts do not move the window: the next permitted access is measured
//! from the last *granted* one.
//!
//! State lives only in memory and is lost on restart.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::recipient::ChatId;

/// Default minimum interval between two accesses to the same query class
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15);

/// Query class a rate-limit entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// CBR rates
    Cbr,
    /// NBK rates
    Nbk,
    /// Other currencies (NBK data)
    Other,
}

impl ResourceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKey::Cbr => "cbr",
            ResourceKey::Nbk => "nbk",
            ResourceKey::Other => "other",
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutex-guarded map of last granted access per (recipient, resource)
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    last_access: Mutex<HashMap<(ChatId, ResourceKey), Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_access: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Grant or deny an access at `now`, recording it only when granted
    pub fn allow(&self, recipient: ChatId, resource: ResourceKey, now: Instant) -> bool {
        let mut entries = self.entries();
        let key = (recipient, resource);

        if let Some(last) = entries.get(&key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        entries.insert(key, now);
        true
    }

    /// Drop entries whose window has already elapsed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, last| now.saturating_duration_since(*last) < self.window);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock leaves the map itself intact.
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<(ChatId, ResourceKey), Instant>> {
        self.last_access
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const ALICE: ChatId = ChatId(1);
    const BOB: ChatId = ChatId(2);

    #[test]
    fn test_first_access_is_granted() {
        let limiter = RateLimiter::default();
        assert!(limiter.allow(ALICE, ResourceKey::Cbr, Instant::now()));
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_access_within_window_is_denied() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        assert!(limiter.allow(ALICE, ResourceKey::Nbk, t0));
        assert!(!limiter.allow(ALICE, ResourceKey::Nbk, t0 + Duration::from_millis(1)));
        assert!(!limiter.allow(ALICE, ResourceKey::Nbk, t0 + Duration::from_millis(14_999)));
    }

    #[test]
    fn test_access_at_window_boundary_is_granted() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        assert!(limiter.allow(ALICE, ResourceKey::Nbk, t0));
        assert!(limiter.allow(ALICE, ResourceKey::Nbk, t0 + Duration::from_secs(15)));
    }

    #[test]
    fn test_denied_access_does_not_reset_window() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        assert!(limiter.allow(ALICE, ResourceKey::Other, t0));
        assert!(!limiter.allow(ALICE, ResourceKey::Other, t0 + Duration::from_secs(10)));
        // Measured from t0, not from the denied attempt at t0 + 10s
        assert!(limiter.allow(ALICE, ResourceKey::Other, t0 + Duration::from_secs(15)));
    }

    #[test]
    fn test_keys_and_recipients_are_independent() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        assert!(limiter.allow(ALICE, ResourceKey::Cbr, t0));
        assert!(limiter.allow(ALICE, ResourceKey::Nbk, t0));
        assert!(limiter.allow(ALICE, ResourceKey::Other, t0));
        assert!(limiter.allow(BOB, ResourceKey::Cbr, t0));
        assert!(!limiter.allow(BOB, ResourceKey::Cbr, t0 + Duration::from_secs(1)));
        assert_eq!(limiter.len(), 4);
    }

    #[test]
    fn test_purge_expired() {
        let limiter = RateLimiter::new(Duration::from_secs(15));
        let t0 = Instant::now();
        limiter.allow(ALICE, ResourceKey::Cbr, t0);
        limiter.allow(BOB, ResourceKey::Cbr, t0 + Duration::from_secs(10));

        let removed = limiter.purge_expired(t0 + Duration::from_secs(20));
        assert_eq!(removed, 1);
        assert_eq!(limiter.len(), 1);
        assert!(!limiter.allow(BOB, ResourceKey::Cbr, t0 + Duration::from_secs(20)));
    }

    #[test]
    fn test_concurrent_recipients_lose_no_entries() {
        let limiter = Arc::new(RateLimiter::default());
        let now = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.allow(ChatId(i), ResourceKey::Nbk, now))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(limiter.len(), 16);
    }
}
