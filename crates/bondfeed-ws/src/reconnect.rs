//! Reconnection backoff.
//!
//! `ReconnectPolicy` yields the delay before each retry. The connector drives
//! it as an explicit state machine (`ReconnectPhase`) with a cancellable sleep
//! instead of recursing into a fresh connect call.

use std::time::Duration;

/// Exponent cap so that the float math cannot overflow to infinity.
const MAX_EXPONENT: u32 = 30;

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Upper bound for the backoff delay (jitter is added on top).
    pub max_delay_ms: u64,
    /// Growth factor applied per attempt. Values below 1.0 are treated as 1.0.
    pub multiplier: f64,
    /// Random jitter added to each delay, 0..=max_jitter_ms.
    pub max_jitter_ms: u64,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_jitter_ms: 250,
            max_attempts: 0, // Infinite
        }
    }
}

/// Where the connection task currently is in its retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// No connection task is running.
    Idle,
    /// Sleeping before retry number `attempt`.
    Waiting { attempt: u32, delay: Duration },
    /// Opening the transport. `attempt` is 0 for the initial connect.
    Attempting { attempt: u32 },
}

/// Exponential backoff with jitter.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Delay before the next retry, or `None` once attempts are exhausted.
    ///
    /// attempt=1 -> initial, attempt=2 -> initial * m, attempt=3 -> initial * m^2, ...
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }
        self.attempt_count += 1;

        let exponent = (self.attempt_count - 1).min(MAX_EXPONENT) as i32;
        let factor = self.config.multiplier.max(1.0).powi(exponent);
        let scaled = self.config.initial_delay_ms as f64 * factor;
        // `as` saturates for out-of-range floats
        let delay_ms = (scaled as u64).min(self.config.max_delay_ms);

        Some(Duration::from_millis(
            delay_ms.saturating_add(rand_jitter(self.config.max_jitter_ms)),
        ))
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Retries consumed since the last successful connection.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempt_count < self.config.max_attempts
    }
}

/// Generate random jitter (0..=max_ms).
fn rand_jitter(max_ms: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if max_ms == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % (max_ms + 1)
}
