//! Bounded retry and run-wide deadline/cancellation for geocoding requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::ProviderError;

/// Longest single sleep while backing off, so cancellation is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding provider unavailable for '{query}' after {attempts} attempts: {last_error}")]
    ProviderUnavailable {
        query: String,
        attempts: u32,
        #[source]
        last_error: ProviderError,
    },
    #[error("Run deadline exceeded")]
    DeadlineExceeded,
    #[error("Run cancelled")]
    Cancelled,
    #[error("Geocoding provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl GeocodeError {
    /// True for failures that may succeed if the whole run is tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. } | Self::DeadlineExceeded)
    }
}

/// How timed-out requests are retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per query, including the first one
    pub max_attempts: u32,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Factor applied to the wait after every retry
    pub backoff_multiplier: f64,
    /// Upper bound for a single wait
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Few attempts with short waits
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(2),
        }
    }

    /// Many attempts with long waits, for an overloaded provider
    pub fn patient() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Retry immediately; used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_backoff: Duration::ZERO,
        }
    }

    /// The wait after `current`, never above `max_backoff` even when the
    /// product overflows a `Duration`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_multiplier.max(1.0);
        Duration::try_from_secs_f64(scaled)
            .map_or(self.max_backoff, |next| next.min(self.max_backoff))
    }
}

/// Cancels every retry loop sharing the originating [`RunBudget`].
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Optional deadline and cancellation flag shared by all requests of a run.
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RunBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A budget that expires `timeout` from now.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancelled: Arc::default(),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::unlimited, Self::with_deadline)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self) -> Result<(), GeocodeError> {
        if self.is_cancelled() {
            return Err(GeocodeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(GeocodeError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Sleep for `duration`, waking early with an error on cancellation or
    /// when the deadline passes. A wake time past the clock's range only
    /// ends through the budget.
    pub fn sleep(&self, duration: Duration) -> Result<(), GeocodeError> {
        let wake = Instant::now().checked_add(duration);
        loop {
            self.check()?;
            let now = Instant::now();
            if wake.is_some_and(|wake| now >= wake) {
                return Ok(());
            }
            let mut step = wake.map_or(SLEEP_SLICE, |wake| (wake - now).min(SLEEP_SLICE));
            if let Some(remaining) = self.remaining() {
                step = step.min(remaining);
            }
            std::thread::sleep(step);
        }
    }
}
