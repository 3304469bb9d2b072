//! Bounded retry with a fixed sleep, and a readiness wait for upstream stores.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::config::RetrySettings;
use crate::error::{Error, Result};

/// Poll interval of [`wait_ready`].
pub const READY_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        Self { attempts: s.retry_count.max(1), sleep: s.retry_sleep() }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self { attempts: 1, sleep: Duration::ZERO }
    }
}

/// Run `op` until it succeeds or `policy.attempts` is exhausted.
///
/// Errors that cannot be cleared by retrying are returned as-is on the first
/// attempt. Exhaustion yields [`Error::UpstreamUnavailable`] carrying the last
/// failure.
pub async fn retry_async<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last = None;
    for attempt in 1..=attempts {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                warn!(what, attempt, attempts, error = %e, "operation failed, retrying");
                last = Some(e);
                if attempt < attempts {
                    sleep(policy.sleep).await;
                }
            }
        }
    }
    Err(Error::upstream(what, last.map(|e| e.to_string()).unwrap_or_default()))
}

/// Poll `probe` every `poll` until it succeeds or `timeout` elapses.
pub async fn wait_ready<F, Fut>(what: &str, timeout: Duration, poll: Duration, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match probe().await {
            Ok(()) => {
                info!(what, attempts, "upstream ready");
                return Ok(());
            }
            Err(e) => {
                warn!(what, attempts, error = %e, "upstream not ready");
                if started.elapsed() + poll > timeout {
                    return Err(Error::upstream(
                        what,
                        format!("not ready after {}s ({attempts} attempts): {e}", timeout.as_secs()),
                    ));
                }
                sleep(poll).await;
            }
        }
    }
}
