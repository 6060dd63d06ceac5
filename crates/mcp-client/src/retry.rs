//! Application-level retry with exponential backoff.
//!
//! Only connectivity-class failures are ever retried; protocol,
//! remote-application and authorization failures propagate on first
//! occurrence. Exhausting attempts propagates the final underlying
//! error so callers can inspect the real cause.

use std::future::Future;
use std::time::Duration;

use tp_domain::error::{ErrorKind, Result};

/// The kinds retried by the application-level policy.
///
/// Authorization failures classify as [`ErrorKind::Auth`] and are
/// therefore excluded.
pub const CONNECTIVITY: &[ErrorKind] = &[ErrorKind::Connection];

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first try included.
    pub max_attempts: u32,
    /// Backoff before attempt `n + 1` is `base_delay * 2^(n-1)`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }
}

/// Run `op` with bounded retries on the given failure kinds.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    retryable: &[ErrorKind],
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_attempts || !retryable.contains(&err.kind()) {
                    return Err(err);
                }
                let backoff = policy.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off before retry"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tp_domain::error::Error;

    fn refused() -> Error {
        Error::connection("connection refused")
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_with_exponential_backoff() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let start = tokio::time::Instant::now();

        let result = with_retry(&policy, CONNECTIVITY, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(refused())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn non_retryable_kind_fails_on_first_attempt() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result: Result<()> = with_retry(&policy, CONNECTIVITY, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::Remote {
                    code: -32601,
                    message: "Method not found".into(),
                })
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), Error::Remote { .. }));
    }

    #[tokio::test]
    async fn auth_failures_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result: Result<()> = with_retry(&policy, CONNECTIVITY, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::Connection {
                    message: "Authorization failed (403): Forbidden".into(),
                    status: Some(403),
                })
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_propagate_the_real_error() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let result: Result<()> = with_retry(&policy, CONNECTIVITY, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(refused()) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            Error::Connection { message, .. } => assert!(message.contains("refused")),
            other => panic!("expected the underlying connection error, got {other:?}"),
        }
    }
}
