use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;

/// Retry behavior for a single logical call. Immutable once handed to the
/// executor; per-call adjustments go through [`RetryPolicyOverrides`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt (0 = fail fast).
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Full jitter: the final delay is uniform in `[0, computed delay)`.
    pub jitter: bool,
    /// Statuses eligible for retry. Status 0 stands for network-level
    /// failures that never produced an HTTP response.
    pub retryable_statuses: HashSet<u16>,
    /// Additional message patterns that mark an error retryable regardless
    /// of status.
    pub retryable_message_patterns: Vec<Regex>,
    /// Per-attempt deadline. `None` leaves the attempt unbounded.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
            retryable_statuses: [0, 429, 500, 503].into_iter().collect(),
            retryable_message_patterns: Vec::new(),
            timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_retryable_message_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.retryable_message_patterns = patterns;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Apply per-call overrides onto this (provider-level) policy, yielding
    /// the effective policy for one call.
    pub fn merge(&self, overrides: &RetryPolicyOverrides) -> RetryPolicy {
        RetryPolicy {
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
            initial_delay: overrides.initial_delay.unwrap_or(self.initial_delay),
            max_delay: overrides.max_delay.unwrap_or(self.max_delay),
            multiplier: overrides.multiplier.unwrap_or(self.multiplier),
            jitter: overrides.jitter.unwrap_or(self.jitter),
            retryable_statuses: overrides
                .retryable_statuses
                .clone()
                .unwrap_or_else(|| self.retryable_statuses.clone()),
            retryable_message_patterns: overrides
                .retryable_message_patterns
                .clone()
                .unwrap_or_else(|| self.retryable_message_patterns.clone()),
            timeout: overrides.timeout.or(self.timeout),
        }
    }

    /// Backoff delay for a 0-indexed attempt:
    /// `min(initial_delay * multiplier^attempt, max_delay)`, drawn uniformly
    /// from `[0, that)` when jitter is enabled, floored to whole milliseconds.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let millis = if self.jitter {
            rand::thread_rng().gen_range(0.0..1.0) * capped
        } else {
            capped
        };

        Duration::from_millis(millis as u64)
    }
}

/// All-optional mirror of [`RetryPolicy`] for per-call adjustment of a
/// provider-level default. Unset fields inherit from the base policy.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicyOverrides {
    pub max_retries: Option<u32>,
    pub initial_delay: Option<Duration>,
    pub max_delay: Option<Duration>,
    pub multiplier: Option<f64>,
    pub jitter: Option<bool>,
    pub retryable_statuses: Option<HashSet<u16>>,
    pub retryable_message_patterns: Option<Vec<Regex>>,
    pub timeout: Option<Duration>,
}
