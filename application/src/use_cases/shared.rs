//! Shared utilities for use cases.
//!
//! Cancellation checks and bounded reasoning calls used by the hand-off
//! resolver and the Turn Scheduler.

use crate::ports::reasoning_gateway::ReasoningError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested on a session or its parent.
pub(crate) fn is_cancelled(token: &CancellationToken) -> bool {
    token.is_cancelled()
}

/// Await a reasoning call, turning an elapsed `limit` into a retryable
/// [`ReasoningError::Timeout`].
pub(crate) async fn bounded<T, F>(limit: Option<Duration>, call: F) -> Result<T, ReasoningError>
where
    F: Future<Output = Result<T, ReasoningError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| ReasoningError::Timeout(limit))?,
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: Result<(), _> = bounded(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(ReasoningError::Timeout(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let result = bounded(None, async { Ok::<_, ReasoningError>(7) }).await;
        assert_eq!(result, Ok(7));

        let result: Result<u8, _> = bounded(Some(Duration::from_secs(1)), async {
            Err(ReasoningError::Unavailable("down".into()))
        })
        .await;
        assert!(matches!(result, Err(ReasoningError::Unavailable(_))));
    }

    #[test]
    fn test_is_cancelled_follows_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        assert!(!is_cancelled(&child));
        parent.cancel();
        assert!(is_cancelled(&child));
    }
}
