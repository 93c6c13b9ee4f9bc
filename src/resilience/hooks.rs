use crate::errors::ApiError;
use std::time::{Duration, Instant};

/// Descriptive context carried through to event callbacks. The executor
/// reads `start_time` for duration reporting and never mutates any field.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Label for the operation being retried, e.g. "chat.completions".
    pub operation: String,
    pub model: String,
    pub provider: String,
    pub start_time: Instant,
    pub request_id: Option<String>,
}

impl RetryContext {
    pub fn new(
        operation: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            model: model.into(),
            provider: provider.into(),
            start_time: Instant::now(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

type OnRetry = Box<dyn Fn(u32, &ApiError, Duration, &RetryContext) + Send + Sync>;
type OnTimeout = Box<dyn Fn(Duration, &RetryContext) + Send + Sync>;
type OnMaxRetriesExceeded = Box<dyn Fn(u32, &ApiError, &RetryContext) + Send + Sync>;
type OnSuccess = Box<dyn Fn(u32, Duration, &RetryContext) + Send + Sync>;

/// Optional, side-effect-only callbacks observed by the executor. Passed
/// explicitly into [`execute`](crate::resilience::ResilientExecutor::execute)
/// rather than registered on a shared object, so there is no hidden lookup
/// and nothing to override.
///
/// The executor never depends on a callback's behavior: panics aside, a
/// callback cannot change retry decisions.
#[derive(Default)]
pub struct RetryEvents {
    /// `(attempt, error, delay, ctx)`, fired before each backoff sleep.
    pub on_retry: Option<OnRetry>,
    /// `(timeout, ctx)`, fired when a per-attempt deadline expires.
    pub on_timeout: Option<OnTimeout>,
    /// `(attempts, last_error, ctx)`, fired once when the retry cap is hit.
    pub on_max_retries_exceeded: Option<OnMaxRetriesExceeded>,
    /// `(prior_failed_attempts, total_duration, ctx)`, fired on success.
    pub on_success: Option<OnSuccess>,
}

impl RetryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_retry(
        mut self,
        f: impl Fn(u32, &ApiError, Duration, &RetryContext) + Send + Sync + 'static,
    ) -> Self {
        self.on_retry = Some(Box::new(f));
        self
    }

    pub fn with_on_timeout(
        mut self,
        f: impl Fn(Duration, &RetryContext) + Send + Sync + 'static,
    ) -> Self {
        self.on_timeout = Some(Box::new(f));
        self
    }

    pub fn with_on_max_retries_exceeded(
        mut self,
        f: impl Fn(u32, &ApiError, &RetryContext) + Send + Sync + 'static,
    ) -> Self {
        self.on_max_retries_exceeded = Some(Box::new(f));
        self
    }

    pub fn with_on_success(
        mut self,
        f: impl Fn(u32, Duration, &RetryContext) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// A callback set that forwards every event to `tracing`.
    pub fn logging() -> Self {
        Self::new()
            .with_on_retry(|attempt, error, delay, ctx| {
                tracing::info!(
                    operation = %ctx.operation,
                    provider = %ctx.provider,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient failure"
                );
            })
            .with_on_timeout(|timeout, ctx| {
                tracing::warn!(
                    operation = %ctx.operation,
                    provider = %ctx.provider,
                    timeout_ms = timeout.as_millis() as u64,
                    "attempt timed out"
                );
            })
            .with_on_max_retries_exceeded(|attempts, error, ctx| {
                tracing::warn!(
                    operation = %ctx.operation,
                    provider = %ctx.provider,
                    attempts,
                    error = %error,
                    "giving up after exhausting retries"
                );
            })
            .with_on_success(|attempts, duration, ctx| {
                tracing::debug!(
                    operation = %ctx.operation,
                    provider = %ctx.provider,
                    failed_attempts = attempts,
                    duration_ms = duration.as_millis() as u64,
                    "request succeeded"
                );
            })
    }

    pub(crate) fn retry(&self, attempt: u32, error: &ApiError, delay: Duration, ctx: &RetryContext) {
        if let Some(f) = &self.on_retry {
            f(attempt, error, delay, ctx);
        }
    }

    pub(crate) fn timeout(&self, timeout: Duration, ctx: &RetryContext) {
        if let Some(f) = &self.on_timeout {
            f(timeout, ctx);
        }
    }

    pub(crate) fn max_retries_exceeded(&self, attempts: u32, error: &ApiError, ctx: &RetryContext) {
        if let Some(f) = &self.on_max_retries_exceeded {
            f(attempts, error, ctx);
        }
    }

    pub(crate) fn success(&self, attempts: u32, duration: Duration, ctx: &RetryContext) {
        if let Some(f) = &self.on_success {
            f(attempts, duration, ctx);
        }
    }
}
