use std::{future::Future, time::Duration};

use tracing::warn;

use crate::error::{ApiError, Error, Operation, Result};

/// Fixed wait after an internal server error, which carries no retry hint.
pub const SERVER_ERROR_BACKOFF: Duration = Duration::from_secs(3);

/// Attempt budget and backoff for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first. At least 1.
    pub max_attempts: u32,
    pub server_error_backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            server_error_backoff: SERVER_ERROR_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_server_error_backoff(mut self, backoff: Duration) -> Self {
        self.server_error_backoff = backoff;
        self
    }

    /// How long to wait before retrying `err`, or `None` if it must not be
    /// retried.
    fn backoff_for(&self, err: &ApiError) -> Option<Duration> {
        err.retry_after().or_else(|| {
            err.is_server_fault()
                .then_some(self.server_error_backoff)
        })
    }
}

/// Run `request` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent.
///
/// Rate limits wait for the duration Slack reported; internal server errors
/// wait [`RetryPolicy::server_error_backoff`]. Anything else is returned
/// immediately.
pub async fn with_retries<T, F, Fut>(
    policy: RetryPolicy,
    operation: Operation,
    mut request: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ApiError>>,
{
    for attempt in 1..=policy.max_attempts {
        let err = match request().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(wait) = policy.backoff_for(&err) else {
            return Err(err.into());
        };

        if err.retry_after().is_some() {
            warn!(
                %operation,
                attempt,
                max_attempts = policy.max_attempts,
                retry_after_secs = wait.as_secs(),
                "slack rate limited, waiting before retry"
            );
        } else {
            warn!(
                %operation,
                attempt,
                max_attempts = policy.max_attempts,
                retry_after_secs = wait.as_secs(),
                error = %err,
                "slack internal server error, waiting before retry"
            );
        }
        tokio::time::sleep(wait).await;
    }

    Err(Error::MaxRetries { operation })
}
