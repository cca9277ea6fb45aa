//! Timeout guard for collector calls.
//!
//! Every provider call is raced against a deadline so that one slow or hung
//! collector cannot stall a collection cycle. The guarded operation is
//! spawned as its own task: if the deadline fires first, the task is
//! detached and left to finish in the background with its result discarded —
//! no cancellation is propagated to the provider.

use std::future::Future;
use std::time::Duration;

use crate::error::CollectError;

/// Default deadline applied to every collector call.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(1000);

/// Races `operation` against `deadline`.
///
/// If the operation completes first its outcome propagates unchanged,
/// including an empty (`None`) value. If the timer fires first the result is
/// [`CollectError::Timeout`] carrying the deadline in milliseconds. A
/// panicking operation is converted into a provider error; the guard itself
/// never unwinds.
pub async fn with_timeout<F, T>(deadline: Duration, operation: F) -> Result<T, CollectError>
where
    F: Future<Output = Result<T, String>> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(operation);

    match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(msg))) => Err(CollectError::Provider(msg)),
        Ok(Err(join_err)) => Err(CollectError::Provider(format!(
            "collector panicked: {join_err}"
        ))),
        Err(_) => {
            // Dropping the handle detaches the task; the provider call keeps
            // running in the background and its result is discarded.
            Err(CollectError::Timeout {
                deadline_ms: deadline.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_passes_value_through() {
        let result = with_timeout(Duration::from_millis(50), async {
            Ok::<_, String>(Some(42u64))
        })
        .await;
        assert_eq!(result.unwrap(), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_value_passes_through_unchanged() {
        let result =
            with_timeout(Duration::from_millis(50), async { Ok::<Option<u64>, String>(None) })
                .await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out_at_deadline() {
        let started = Instant::now();
        let result = with_timeout(Duration::from_millis(50), async {
            sleep(Duration::from_millis(500)).await;
            Ok::<_, String>(1u64)
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("Timeout"));
        assert!(err.to_string().contains("50"));
        // Paused clock: the guard must give up at the deadline, not at the
        // operation's completion time.
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_propagates_message() {
        let result = with_timeout(Duration::from_millis(50), async {
            Err::<u64, String>("device unplugged".to_string())
        })
        .await;
        let err = result.unwrap_err();
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "device unplugged");
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_operation_becomes_provider_error() {
        let result = with_timeout(Duration::from_millis(50), async {
            panic!("collector blew up");
            #[allow(unreachable_code)]
            Ok::<u64, String>(0)
        })
        .await;
        let err = result.unwrap_err();
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("panicked"));
    }
}
