// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff, capped at 10s, for the connection-only retry
//! policy (§4.2). HTTP status errors (4xx/5xx) are never retried — only
//! the category this module is handed actually gets a second attempt.

use crate::client::RetryPolicy;
use crate::error::AgentClientError;
use netlab_core::HasCategory;
use std::future::Future;
use std::time::Duration;

const BASE_DELAY: Duration = Duration::from_millis(250);

fn backoff_delay(attempt: u32) -> Duration {
    let millis = BASE_DELAY.as_millis() as u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(millis).min(crate::client::DEFAULT_BACKOFF_CAP)
}

/// Runs `call` under `policy`, retrying per the rules in §4.2. `call` is
/// invoked fresh on every attempt (it's an `FnMut` returning a future, not
/// a single future) since each attempt is its own request.
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, mut call: F) -> Result<T, AgentClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgentClientError>>,
{
    match policy {
        RetryPolicy::Never => call().await,
        RetryPolicy::Once => match call().await {
            Ok(v) => Ok(v),
            Err(_) => call().await,
        },
        RetryPolicy::ConnectionOnly { max_attempts } => {
            let mut attempt = 1;
            loop {
                match call().await {
                    Ok(v) => return Ok(v),
                    Err(e) if attempt < max_attempts && e.category().is_retriable() => {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlab_core::HostId;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn conn_err() -> AgentClientError {
        AgentClientError::Connection { host_id: HostId::new(), job_id: None, source: "refused".into() }
    }

    fn validation_err() -> AgentClientError {
        AgentClientError::Validation { host_id: HostId::new(), job_id: None, message: "bad".into() }
    }

    #[tokio::test]
    async fn connection_only_retries_up_to_max_attempts_then_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AgentClientError> = with_retry(
            RetryPolicy::ConnectionOnly { max_attempts: 3 },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(conn_err()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn connection_only_stops_retrying_on_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(RetryPolicy::ConnectionOnly { max_attempts: 3 }, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 1 { Err(conn_err()) } else { Ok(42) } }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn connection_only_never_retries_non_retriable_category() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AgentClientError> = with_retry(
            RetryPolicy::ConnectionOnly { max_attempts: 3 },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(validation_err()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn once_retries_exactly_one_extra_time() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AgentClientError> = with_retry(RetryPolicy::Once, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(validation_err()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn never_policy_calls_exactly_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AgentClientError> = with_retry(RetryPolicy::Never, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(conn_err()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_is_capped_at_ten_seconds() {
        assert!(backoff_delay(10) <= Duration::from_secs(10));
        assert_eq!(backoff_delay(1), Duration::from_millis(250));
        assert_eq!(backoff_delay(2), Duration::from_millis(500));
    }
}
