//! Waiting: backoff schedule, throttle hints and the sleep seam
//!
//! Every pause the harvester takes (backoff, throttling, politeness) goes
//! through a `Sleeper`, so timing can be observed without real waiting.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Something that can suspend the current task for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that records every requested wait and returns immediately
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

/// Sleeps through `sleeper` unless the duration is zero
pub async fn pause(sleeper: &dyn Sleeper, duration: Duration) {
    if !duration.is_zero() {
        sleeper.sleep(duration).await;
    }
}

/// Backoff before retry number `attempt` (1-based): `min(cap, 2^attempt * base)`
///
/// # Examples
///
/// ```
/// use sillage::crawler::backoff_delay;
/// use std::time::Duration;
///
/// assert_eq!(backoff_delay(1, 30, 300), Duration::from_secs(60));
/// assert_eq!(backoff_delay(4, 30, 300), Duration::from_secs(300));
/// ```
pub fn backoff_delay(attempt: u32, base_secs: u64, cap_secs: u64) -> Duration {
    let secs = 2u64
        .saturating_pow(attempt)
        .saturating_mul(base_secs)
        .min(cap_secs);
    Duration::from_secs(secs)
}

/// Reads a Retry-After hint given in whole seconds
///
/// HTTP-date forms and garbage yield `None`, letting the caller fall back to
/// its default wait.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
