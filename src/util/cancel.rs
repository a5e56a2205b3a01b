//! Cancellation helpers.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::AuthError;

/// Race `future` against `cancel`; cancellation wins ties.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AuthError::Cancelled),
        result = future => result,
    }
}

/// Child of `parent` that is additionally cancelled once `duration` elapses.
pub fn deadline_token(parent: &CancellationToken, duration: Duration) -> CancellationToken {
    let child = parent.child_token();
    let timer = child.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = timer.cancelled() => {}
            _ = tokio::time::sleep(duration) => {
                tracing::debug!(?duration, "Deadline reached; cancelling");
                timer.cancel();
            }
        }
    });
    child
}
