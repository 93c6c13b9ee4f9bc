use crate::errors::{is_context_window_error, is_retryable, ApiError, ApiResult};
use crate::resilience::{RetryContext, RetryEvents, RetryPolicy};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Wraps a single async operation with retry, per-attempt timeout, and
/// cooperative cancellation.
///
/// The executor holds no state of its own; every counter lives on the call
/// stack, so one instance may serve independent concurrent calls. Retries
/// are strictly sequential: a new attempt never starts before the previous
/// attempt's error is classified and the backoff has elapsed.
///
/// Mid-stream failures are out of scope here: for streaming calls, wrap only
/// the stream *setup* in `execute`; once deltas are flowing, an error is
/// terminal for that stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResilientExecutor;

impl ResilientExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `operation` under `policy`, retrying transient failures.
    ///
    /// `operation` receives a per-attempt child token; it is cancelled when
    /// the attempt times out or the caller's `cancel` token fires, so the
    /// transport can abandon the request promptly.
    ///
    /// Errors propagate unwrapped: the caller sees exactly the error the
    /// last attempt produced, except that cancellation and timeouts surface
    /// as [`ApiError::Cancelled`] and [`ApiError::Timeout`].
    pub async fn execute<F, Fut, T>(
        &self,
        ctx: &RetryContext,
        policy: &RetryPolicy,
        events: &RetryEvents,
        cancel: &CancellationToken,
        operation: F,
    ) -> ApiResult<T>
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            let error = match self.run_attempt(ctx, policy, events, cancel, &operation).await {
                Ok(value) => {
                    events.success(attempt, ctx.start_time.elapsed(), ctx);
                    return Ok(value);
                }
                Err(error) => error,
            };

            if error.is_cancelled() {
                return Err(error);
            }

            // Oversized requests fail identically on every attempt; they
            // propagate untouched and never count against the retry cap.
            if is_context_window_error(&error) {
                tracing::debug!(
                    operation = %ctx.operation,
                    status = error.status(),
                    "context window exceeded, not retrying"
                );
                return Err(error);
            }

            if attempt < policy.max_retries && is_retryable(&error, policy) {
                let delay = Self::retry_delay(policy, attempt, &error);
                tracing::warn!(
                    operation = %ctx.operation,
                    provider = %ctx.provider,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient failure"
                );
                events.retry(attempt, &error, delay, ctx);

                tokio::select! {
                    _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                    _ = sleep(delay) => {}
                }

                attempt += 1;
                continue;
            }

            if attempt >= policy.max_retries {
                events.max_retries_exceeded(attempt, &error, ctx);
            }
            return Err(error);
        }
    }

    /// One attempt, raced against the caller's token and the optional
    /// per-attempt deadline.
    async fn run_attempt<F, Fut, T>(
        &self,
        ctx: &RetryContext,
        policy: &RetryPolicy,
        events: &RetryEvents,
        cancel: &CancellationToken,
        operation: &F,
    ) -> ApiResult<T>
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let attempt_token = cancel.child_token();

        match policy.timeout {
            Some(timeout) => {
                tokio::select! {
                    result = operation(attempt_token.clone()) => result,
                    _ = sleep(timeout) => {
                        attempt_token.cancel();
                        events.timeout(timeout, ctx);
                        Err(ApiError::Timeout {
                            timeout_ms: timeout.as_millis() as u64,
                        })
                    }
                    _ = cancel.cancelled() => {
                        attempt_token.cancel();
                        Err(ApiError::Cancelled)
                    }
                }
            }
            None => {
                tokio::select! {
                    result = operation(attempt_token.clone()) => result,
                    _ = cancel.cancelled() => {
                        attempt_token.cancel();
                        Err(ApiError::Cancelled)
                    }
                }
            }
        }
    }

    /// Computed backoff, floored by the server's Retry-After hint when the
    /// error carried one.
    fn retry_delay(policy: &RetryPolicy, attempt: u32, error: &ApiError) -> Duration {
        let computed = policy.delay_for_attempt(attempt);
        match error.retry_after() {
            Some(seconds) => computed.max(Duration::from_secs(seconds)),
            None => computed,
        }
    }
}
