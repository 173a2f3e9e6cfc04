//! Per-action retry policy.
//!
//! Wraps the `backoff` crate's exponential backoff with an attempt cap. Only
//! [`RemoteError::is_transient`] errors are retried; the rest fail on the
//! first attempt. Jitter is disabled so delays are reproducible.

use std::cell::Cell;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use mirror_core::RetrySettings;

use crate::error::RemoteError;

/// How many times, and how patiently, an upload or delete is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 act as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

/// Result of an operation plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub result: Result<T, RemoteError>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff: initial_backoff.max(Self::default().max_backoff),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `op`, retrying transient failures until `max_attempts` is reached.
    ///
    /// `on_retry` receives the failed attempt's error, its 1-based number and
    /// the delay before the next attempt.
    pub fn execute<T, F, N>(&self, mut op: F, mut on_retry: N) -> Attempted<T>
    where
        F: FnMut() -> Result<T, RemoteError>,
        N: FnMut(&RemoteError, u32, Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let attempts = Cell::new(0u32);

        let operation = || {
            attempts.set(attempts.get() + 1);
            op().map_err(|err| {
                if err.is_transient() && attempts.get() < max_attempts {
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        };
        let notify = |err: RemoteError, delay: Duration| on_retry(&err, attempts.get(), delay);

        let result = backoff::retry_notify(self.backoff(), operation, notify).map_err(|err| match err {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        });

        Attempted {
            result,
            attempts: attempts.get(),
        }
    }
}
