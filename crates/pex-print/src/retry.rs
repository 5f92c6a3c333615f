// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded polling and retry helpers.
//
// Spooler tracking polls at a fixed interval against a hard deadline; file
// removal retries with a linearly growing delay because the spooler may hold
// a read lock on a freshly submitted file for a moment.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Interval and deadline for spooler polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            timeout: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    /// Absolute deadline for a poll started now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }
}

/// Call `check` every `interval` until it yields a value or `deadline`
/// passes. The check always runs at least once.
pub fn poll_until<T>(
    deadline: Instant,
    interval: Duration,
    mut check: impl FnMut() -> Option<T>,
) -> Option<T> {
    let mut iteration: u32 = 0;
    loop {
        if let Some(value) = check() {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            debug!(iterations = iteration + 1, "poll deadline reached");
            return None;
        }
        iteration += 1;
        thread::sleep(interval.min(deadline - now));
    }
}

/// Retry configuration for removing temporary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts.
    pub attempts: u32,
    /// Delay after the first failure; attempt `n` waits `step * n`.
    pub step: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            step: Duration::from_millis(200),
        }
    }
}

/// Linear backoff: 200ms, 400ms, 600ms, ... with the default config.
pub fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    config.step.saturating_mul(attempt.saturating_add(1))
}

/// Remove `path`, retrying on failure. A file that is already gone counts as
/// removed.
pub fn remove_with_retry(path: &Path, config: &RetryConfig) -> std::io::Result<()> {
    let attempts = config.attempts.max(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), attempt, "temporary file removed");
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                let delay = compute_delay(attempt, config);
                debug!(
                    path = %path.display(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "remove failed, retrying"
                );
                last_err = Some(e);
                if attempt + 1 < attempts {
                    thread::sleep(delay);
                }
            }
        }
    }

    let err = last_err.unwrap_or_else(|| std::io::Error::other("removal was not attempted"));
    warn!(path = %path.display(), error = %err, attempts, "giving up on temporary file");
    Err(err)
}
