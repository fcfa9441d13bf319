//! Fixed-interval condition polling
//!
//! The check runs immediately, then once per interval, until it yields a value,
//! fails, or the timeout is reached. There is no backoff.

use crate::error::ControllerError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// `Ok(Some(v))` finishes the poll, `Ok(None)` keeps polling, `Err` aborts it
pub type PollResult<T> = Result<Option<T>, ControllerError>;

/// Poll `check` until it produces a value.
///
/// A check that never succeeds is invoked `ceil(timeout / interval)` times
/// before [`ControllerError::Timeout`] is returned.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    timeout: Duration,
    description: &str,
    mut check: F,
) -> Result<T, ControllerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollResult<T>>,
{
    let start = Instant::now();

    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        if start.elapsed() + interval >= timeout {
            return Err(ControllerError::Timeout {
                what: description.to_string(),
                after: timeout,
            });
        }
        debug!("Waiting for {}...", description);
        tokio::time::sleep(interval).await;
    }
}
