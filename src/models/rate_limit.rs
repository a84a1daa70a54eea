use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Admission check for write requests, keyed by client identity
///
/// Implementations are process-local. A shared counter store can be
/// substituted behind the same contract for multi-instance deployments.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, identity: &str) -> bool;
}

/// Limiter used when rate limiting is disabled by configuration
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn allow(&self, _identity: &str) -> bool {
        true
    }
}

/// Per-identity counter for the current window
#[derive(Debug, Clone)]
pub struct WindowRecord {
    /// Requests admitted in the current window
    pub admitted: u32,
    /// Requests rejected in the current window
    pub rejected: u32,
    /// When the current window opened
    pub window_start: Instant,
}

impl WindowRecord {
    pub fn new(now: Instant) -> Self {
        Self {
            admitted: 0,
            rejected: 0,
            window_start: now,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    /// Admit one request if the quota allows, recording the attempt either way
    pub fn check_and_increment(&mut self, now: Instant, quota: u32, window: Duration) -> bool {
        // Reset counters once the window has fully elapsed
        if self.expired(now, window) {
            self.admitted = 0;
            self.rejected = 0;
            self.window_start = now;
        }

        if self.admitted >= quota {
            self.rejected = self.rejected.saturating_add(1);
            return false;
        }

        self.admitted += 1;
        true
    }
}

#[derive(Debug)]
struct LimiterState {
    records: HashMap<String, WindowRecord>,
    last_sweep: Instant,
}

/// Fixed quota of `quota` requests per `window`, per identity
#[derive(Debug)]
pub struct FixedWindowLimiter {
    quota: u32,
    window: Duration,
    state: Mutex<LimiterState>,
}

impl FixedWindowLimiter {
    /// Quota and window are clamped to at least 1 and 1 second
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            quota: quota.max(1),
            window: window.max(Duration::from_secs(1)),
            state: Mutex::new(LimiterState {
                records: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Same as [`RateLimiter::allow`] with an explicit clock reading
    pub fn allow_at(&self, identity: &str, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // Drop identities whose window has fully elapsed, at most once per window
        if now.saturating_duration_since(state.last_sweep) >= self.window {
            let window = self.window;
            state.records.retain(|_, record| !record.expired(now, window));
            state.last_sweep = now;
        }

        let record = state
            .records
            .entry(identity.to_string())
            .or_insert_with(|| WindowRecord::new(now));

        let allowed = record.check_and_increment(now, self.quota, self.window);
        if !allowed {
            tracing::warn!(
                rejected = record.rejected,
                quota = self.quota,
                "Rate limit exceeded for identity"
            );
        }
        allowed
    }

    /// Number of identities currently tracked
    pub fn tracked_identities(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, identity: &str) -> bool {
        self.allow_at(identity, Instant::now())
    }
}
