//! Cooperative shutdown helpers around [`CancellationToken`]

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RelayError;

/// Sleep for `duration` unless shutdown is requested first.
pub async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> Result<(), RelayError> {
    if duration.is_zero() {
        return check(cancel);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RelayError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Drive `fut` to completion unless shutdown is requested first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, RelayError>
where
    F: Future<Output = Result<T, RelayError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RelayError::Cancelled),
        result = fut => result,
    }
}

pub fn check(cancel: &CancellationToken) -> Result<(), RelayError> {
    if cancel.is_cancelled() {
        Err(RelayError::Cancelled)
    } else {
        Ok(())
    }
}
