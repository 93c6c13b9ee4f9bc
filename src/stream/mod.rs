mod adapter;
mod delta;
mod reconstructor;

pub use adapter::ReconstructedStream;
pub use delta::{FinishReason, RawDelta, ToolCallDelta};
pub use reconstructor::{
    collect_text, completed_tool_calls, StreamChunk, StreamReconstructor, ToolCallSnapshot,
};
