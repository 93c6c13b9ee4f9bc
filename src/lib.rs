//! Resilience and stream-reconstruction layer for generative AI HTTP APIs.
//!
//! This crate sits between an application and a provider transport:
//! [`ResilientExecutor`] wraps request attempts with retry classification,
//! exponential backoff, per-attempt timeouts, and cooperative cancellation,
//! while [`StreamReconstructor`] assembles fragmented streaming deltas
//! (text, tool calls, usage) into normalized chunks.

pub mod errors;
pub mod resilience;
pub mod stream;
pub mod usage;

pub use errors::{ApiError, ApiResult, ContextWindowInfo};
pub use resilience::{ResilientExecutor, RetryContext, RetryEvents, RetryPolicy};
pub use stream::{RawDelta, ReconstructedStream, StreamChunk, StreamReconstructor};
pub use usage::{AggregatedUsage, UsageSnapshot};

pub mod prelude {
    pub use crate::errors::{ApiError, ApiResult};
    pub use crate::resilience::{
        ResilientExecutor, RetryContext, RetryEvents, RetryPolicy, RetryPolicyOverrides,
    };
    pub use crate::stream::{
        FinishReason, RawDelta, ReconstructedStream, StreamChunk, StreamReconstructor,
        ToolCallSnapshot,
    };
    pub use crate::usage::{AggregatedUsage, UsageSnapshot};
}
