//! Reconnect policy and backoff calculation.
//!
//! The transport retries indefinitely after an unexpected close or a failed
//! connection attempt. The delay between attempts starts at
//! [`DEFAULT_INITIAL_DELAY_MS`], grows by [`DEFAULT_DECAY`] after each
//! failure, and is capped at [`DEFAULT_MAX_DELAY_MS`]. A successful
//! connection resets the attempt counter. Connection attempts that do not
//! complete within [`DEFAULT_CONNECT_TIMEOUT_MS`] count as failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay before the first reconnect attempt, in ms.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
/// Default cap on the delay between attempts, in ms.
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;
/// Default multiplier applied to the delay after each failed attempt.
pub const DEFAULT_DECAY: f64 = 1.2;
/// Default limit on how long a single connection attempt may take, in ms.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Configuration for the transport's reconnection behavior.
///
/// There is deliberately no maximum attempt count: the transport retries
/// until it succeeds or is explicitly torn down.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt in ms (default: 1000).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Cap on the delay between attempts in ms (default: 5000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Delay multiplier after each failed attempt (default: 1.2).
    #[serde(default = "default_decay")]
    pub decay: f64,
    /// Connection-attempt timeout in ms (default: 3000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    DEFAULT_INITIAL_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_decay() -> f64 {
    DEFAULT_DECAY
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            decay: DEFAULT_DECAY,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl ReconnectPolicy {
    /// Backoff delay before reconnect attempt `attempt` (zero-based).
    ///
    /// Formula: `min(initial_delay * decay^attempt, max_delay)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // decay^attempt overflows f64 to +inf for absurd attempt counts,
        // which the min() against the cap absorbs.
        let raw = (self.initial_delay_ms as f64) * self.decay.powi(attempt.min(1024) as i32);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped.round() as u64)
    }

    /// Limit on how long a single connection attempt may take.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
