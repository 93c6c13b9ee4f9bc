mod classify;
mod error;

pub use classify::{
    is_context_window_error, is_retryable, parse_context_window_error, ContextWindowInfo,
};
pub use error::{ApiError, ApiResult};
