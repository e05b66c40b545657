//! Request throttling.
//!
//! [`RateGate`] is an exact sliding-window limiter keyed by resource.
//! [`SerialGate`] admits one caller at a time with a minimum spacing between
//! admissions, for providers that punish bursts.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::MutexGuard;
use tokio::time::Instant;

/// Outcome of a rate gate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the attempt was admitted (and recorded)
    pub allowed: bool,
    /// Time until the oldest recorded attempt leaves the window, when denied
    pub retry_after: Option<Duration>,
    /// Attempts still available in the current window
    pub remaining: usize,
}

impl RateDecision {
    fn allowed(remaining: usize) -> Self {
        Self {
            allowed: true,
            retry_after: None,
            remaining,
        }
    }

    /// Retry-after rounded up to whole seconds, at least 1 when denied
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|d| {
            let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
            secs.max(1)
        })
    }
}

/// Sliding-window rate limiter.
///
/// Check-and-record is atomic per gate. If the internal state is poisoned the
/// gate fails open and logs a warning.
#[derive(Debug, Default)]
pub struct RateGate {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit and record an attempt for `key` if fewer than `max_requests`
    /// attempts happened within the trailing `window`
    pub fn allow(&self, key: &str, max_requests: usize, window: Duration) -> RateDecision {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Rate gate state poisoned, allowing request for {}", key);
                return RateDecision::allowed(max_requests);
            }
        };

        let now = Instant::now();
        let timestamps = windows.entry(key.to_string()).or_default();
        prune(timestamps, now, window);

        if timestamps.len() < max_requests {
            timestamps.push_back(now);
            return RateDecision::allowed(max_requests - timestamps.len());
        }

        let retry_after = timestamps
            .front()
            .map(|oldest| (*oldest + window).saturating_duration_since(now))
            .unwrap_or(window);

        tracing::debug!(
            "Rate limit reached for {} ({} in {:?}), retry after {:?}",
            key,
            max_requests,
            window,
            retry_after
        );

        RateDecision {
            allowed: false,
            retry_after: Some(retry_after),
            remaining: 0,
        }
    }

    /// Forget all recorded attempts for `key`
    pub fn reset(&self, key: &str) {
        match self.windows.lock() {
            Ok(mut windows) => {
                windows.remove(key);
            }
            Err(_) => tracing::warn!("Rate gate state poisoned, cannot reset {}", key),
        }
    }

    /// Number of attempts recorded for `key` within the trailing `window`
    pub fn usage(&self, key: &str, window: Duration) -> usize {
        let Ok(mut windows) = self.windows.lock() else {
            return 0;
        };
        match windows.get_mut(key) {
            Some(timestamps) => {
                prune(timestamps, Instant::now(), window);
                timestamps.len()
            }
            None => 0,
        }
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

/// Single-flight gate with a minimum interval between admissions
pub struct SerialGate {
    lock: tokio::sync::Mutex<()>,
    spacing: Option<DefaultDirectRateLimiter>,
    min_interval: Duration,
}

impl std::fmt::Debug for SerialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialGate")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

/// Held while the caller owns the gate
pub struct SerialPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl SerialGate {
    /// Create a gate; a zero interval disables spacing but keeps single-flight
    pub fn new(min_interval: Duration) -> Self {
        Self {
            lock: tokio::sync::Mutex::new(()),
            spacing: Quota::with_period(min_interval).map(RateLimiter::direct),
            min_interval,
        }
    }

    /// Wait until this caller is the only holder and the spacing has elapsed
    pub async fn acquire(&self) -> SerialPermit<'_> {
        let guard = self.lock.lock().await;
        if let Some(limiter) = &self.spacing {
            limiter.until_ready().await;
        }
        SerialPermit { _guard: guard }
    }
}
