//! Run-wide fetch counters
//!
//! Every concurrent fetch reports into one shared [`RunCounters`]. Plain counts are
//! atomics; the two growing logs sit behind mutexes that are only held for a push.

use serde::Serialize;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Shared counters updated by every fetch
#[derive(Debug, Default)]
pub struct RunCounters {
    requests: AtomicU64,
    retries: AtomicU64,
    sleeps: AtomicU64,
    slept_ms: AtomicU64,
    errors: AtomicU64,
    error_log: Mutex<Vec<String>>,
    rate_limit_failures: Mutex<Vec<String>>,
}

/// Point-in-time copy of [`RunCounters`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub requests: u64,
    pub retries: u64,
    pub sleeps: u64,
    pub slept_ms: u64,
    pub errors: u64,
    pub error_log: Vec<String>,
    pub rate_limit_failures: Vec<String>,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// One logical request was issued
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A failed attempt is about to be retried
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// A sleep of `duration` happened
    pub fn record_sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::Relaxed);
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.slept_ms.fetch_add(millis, Ordering::Relaxed);
    }

    /// Appends an entry to the error log, tagged with the caller's location
    #[track_caller]
    pub fn record_error(&self, message: impl AsRef<str>) {
        let caller = Location::caller();
        let entry = format!(
            "[FETCH_ERROR][{}][LINE: {}]: {}",
            caller.file(),
            caller.line(),
            message.as_ref()
        );

        self.errors.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut log) = self.error_log.lock() {
            log.push(entry);
        }
    }

    /// A URL exhausted its retries
    pub fn record_rate_limit_failure(&self, url: &str) {
        if let Ok(mut failures) = self.rate_limit_failures.lock() {
            failures.push(url.to_string());
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Copies the current state
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            sleeps: self.sleeps.load(Ordering::Relaxed),
            slept_ms: self.slept_ms.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            error_log: self
                .error_log
                .lock()
                .map(|log| log.clone())
                .unwrap_or_default(),
            rate_limit_failures: self
                .rate_limit_failures
                .lock()
                .map(|failures| failures.clone())
                .unwrap_or_default(),
        }
    }
}
