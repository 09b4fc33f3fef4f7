//! Bounded polling for eventually consistent resources.
//!
//! A freshly created bucket or object is not always visible to the very next
//! read. [`wait_until`] re-runs an existence check until it reports `true` or
//! the [`WaitPolicy`] window closes. "Never observed" and "observed absent"
//! collapse into [`WaitError::NotConfirmed`]; a check that itself fails ends
//! the wait with [`WaitError::Check`].

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// How long to wait and how often to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Total wait window, including the time spent inside checks.
    pub timeout: Duration,
    /// Delay between two checks.
    pub poll_interval: Duration,
}

impl WaitPolicy {
    /// Create a policy.
    #[must_use]
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

/// Why a wait ended without confirmation.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// The resource was not observed within the window.
    #[error("condition not confirmed within {}s", timeout.as_secs())]
    NotConfirmed {
        /// The window that elapsed.
        timeout: Duration,
    },

    /// The check call failed.
    #[error(transparent)]
    Check(#[from] ApiError),
}

/// Poll `check` until it returns `Ok(true)` or `policy.timeout` elapses.
///
/// A check still running when the window closes is abandoned, so the call
/// never outlives the deadline by more than one scheduler tick.
///
/// # Errors
///
/// [`WaitError::NotConfirmed`] when the window closes first,
/// [`WaitError::Check`] as soon as a check returns an error.
pub async fn wait_until<F, Fut>(policy: WaitPolicy, mut check: F) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<bool>>,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match timeout_at(deadline, check()).await {
            Ok(Ok(true)) => {
                debug!(attempts, "existence confirmed");
                return Ok(());
            }
            Ok(Ok(false)) => {}
            Ok(Err(err)) => return Err(WaitError::Check(err)),
            Err(_) => break,
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(policy.poll_interval.min(deadline - now)).await;
    }

    warn!(attempts, timeout_secs = policy.timeout.as_secs(), "existence not confirmed");
    Err(WaitError::NotConfirmed {
        timeout: policy.timeout,
    })
}
