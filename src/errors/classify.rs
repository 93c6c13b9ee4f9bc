//! Error classification: retryability and context-window-overflow detection.
//!
//! Context-window detection is a best-effort heuristic over a fixed pattern
//! list, not exhaustive NLP. Providers phrase the overflow condition in a
//! handful of recognizable ways; an unmatched phrasing classifies as an
//! ordinary error of its status code.

use crate::errors::ApiError;
use crate::resilience::RetryPolicy;
use once_cell::sync::Lazy;
use regex::Regex;

/// Statuses a context-window overflow can arrive under. 413 is the literal
/// payload-too-large status; some providers report overflow as 429.
const CONTEXT_WINDOW_STATUSES: [u16; 2] = [413, 429];

static CONTEXT_WINDOW_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)context.*length.*exceeded",
        r"(?i)maximum.*context.*length",
        r"(?i)context.*window",
        r"(?i)(prompt|input|message).*too.*(long|large)",
        r"(?i)token.*limit.*exceeded",
        r"(?i)request\s+too\s+large",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Ordered by specificity: the first numeric capture wins.
static CONTEXT_WINDOW_SIZE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)maximum\s+context\s+length.*?(?:is|of)\s+(\d+)",
        r"(?i)context\s+length.*?(\d+)",
        r"(?i)(\d+)\s+token.*?limit",
        r"(?i)limit\s+(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Parsed detail of a context-window overflow error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindowInfo {
    /// The window size in tokens, when the message stated one.
    pub context_window: Option<u64>,
    pub message: String,
}

/// Whether this error reports that the request exceeded the model's context
/// window. Such errors are never retryable: the same request will fail the
/// same way every time.
pub fn is_context_window_error(error: &ApiError) -> bool {
    if !CONTEXT_WINDOW_STATUSES.contains(&error.status()) {
        return false;
    }
    let message = error.message();
    CONTEXT_WINDOW_PATTERNS.iter().any(|p| p.is_match(message))
}

/// Extract the context-window size from an overflow error message, when the
/// provider included one. Returns `None` for errors that are not
/// context-window errors at all.
pub fn parse_context_window_error(error: &ApiError) -> Option<ContextWindowInfo> {
    if !is_context_window_error(error) {
        return None;
    }

    let message = error.message();
    let context_window = CONTEXT_WINDOW_SIZE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
    });

    Some(ContextWindowInfo {
        context_window,
        message: message.to_string(),
    })
}

/// Whether the executor may retry this error under the given policy.
///
/// Context-window errors are excluded first, then the status set applies
/// (status 0 stands for network-level failures and timeouts), then the
/// policy's optional message patterns.
pub fn is_retryable(error: &ApiError, policy: &RetryPolicy) -> bool {
    if error.is_cancelled() || is_context_window_error(error) {
        return false;
    }

    if policy.retryable_statuses.contains(&error.status()) {
        return true;
    }

    let message = error.message();
    policy
        .retryable_message_patterns
        .iter()
        .any(|p| p.is_match(message))
}
