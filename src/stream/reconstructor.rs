//! Reassembles semantic events out of a provider's partial delta records.
//!
//! Providers interleave text fragments, tool-call argument chunks, and usage
//! snapshots across many deltas. The reconstructor folds that sequence back
//! into [`StreamChunk`]s: text passes through, tool calls accumulate per
//! index until complete, usage snapshots are converted to categorized
//! counters on the fly.
//!
//! Completion has no explicit wire marker. A provider stops sending deltas
//! for a call index once it moves on to text or another call, so a fragment
//! that received no update during a delta while others did is finished.

use crate::stream::{FinishReason, RawDelta};
use crate::usage::AggregatedUsage;
use serde::Serialize;
use std::collections::HashMap;

/// Accumulating state of one tool call being reconstructed.
#[derive(Debug, Clone, Default)]
struct ToolCallFragment {
    index: usize,
    id: String,
    name: String,
    arguments: String,
    /// Whether the "first non-empty arguments" event has fired.
    named: bool,
    finished: bool,
    /// Transient per-delta flag driving the completion heuristic.
    updated_this_step: bool,
}

impl ToolCallFragment {
    fn new(index: usize) -> Self {
        Self {
            index,
            updated_this_step: true,
            ..Default::default()
        }
    }

    fn snapshot(&self) -> ToolCallSnapshot {
        ToolCallSnapshot {
            index: self.index,
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

/// Point-in-time copy of a fragment, attached to emitted chunks.
///
/// A call that never received arguments completes with empty `name` and
/// `arguments`, letting consumers distinguish "attempted but empty" calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallSnapshot {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One reconstructed output unit, produced per consumed delta plus one per
/// still-open fragment at finalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<AggregatedUsage>,

    /// First non-empty arguments seen for a call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_named: Option<ToolCallSnapshot>,

    /// Arguments grew for an already-named call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_arguments_updated: Option<ToolCallSnapshot>,

    /// A call stopped receiving updates and is complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_complete: Option<ToolCallSnapshot>,
}

/// Stateful fold over one delta stream. Feed every delta to
/// [`consume`](Self::consume) in arrival order, then call
/// [`finalize`](Self::finalize) exactly once at end of stream.
///
/// Owns its fragments exclusively: one reconstructor per stream, never
/// shared. Reordering deltas breaks both argument accumulation and the
/// absence-of-update completion heuristic.
#[derive(Debug, Default)]
pub struct StreamReconstructor {
    /// Fragments in first-seen order; finalization iterates this.
    fragments: Vec<ToolCallFragment>,
    /// Transport index -> position in `fragments`.
    by_index: HashMap<usize, usize>,
}

impl StreamReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one delta into the accumulated state and emit its chunk.
    ///
    /// At most one named/arguments-updated event is attached per delta; if a
    /// transport ever sends several growing calls in a single delta, the
    /// last one processed wins. Observed transports grow one call at a time.
    pub fn consume(&mut self, delta: &RawDelta) -> StreamChunk {
        for fragment in &mut self.fragments {
            fragment.updated_this_step = false;
        }

        let mut chunk = StreamChunk {
            content: delta.content.clone(),
            finish_reason: delta.finish_reason,
            usage: delta.usage.as_ref().map(AggregatedUsage::from_snapshot),
            ..Default::default()
        };

        // (is_first_named, snapshot) of the last growth event this delta.
        let mut growth: Option<(bool, ToolCallSnapshot)> = None;

        for event in &delta.tool_calls {
            let position = match self.by_index.get(&event.index) {
                Some(&position) => {
                    self.fragments[position].updated_this_step = true;
                    position
                }
                None => {
                    self.fragments.push(ToolCallFragment::new(event.index));
                    let position = self.fragments.len() - 1;
                    self.by_index.insert(event.index, position);
                    position
                }
            };

            let fragment = &mut self.fragments[position];
            if let Some(id) = &event.id {
                fragment.id = id.clone();
            }
            if let Some(name) = &event.name {
                fragment.name = name.clone();
            }
            if let Some(arguments) = &event.arguments {
                fragment.arguments.push_str(arguments);
            }

            if !fragment.arguments.is_empty() {
                let first = !fragment.named;
                fragment.named = true;
                growth = Some((first, fragment.snapshot()));
            }
        }

        match growth {
            Some((true, snapshot)) => chunk.tool_call_named = Some(snapshot),
            Some((false, snapshot)) => chunk.tool_call_arguments_updated = Some(snapshot),
            None => {}
        }

        for fragment in &mut self.fragments {
            if !fragment.updated_this_step && !fragment.finished {
                fragment.finished = true;
                chunk.tool_call_complete = Some(fragment.snapshot());
            }
        }

        chunk
    }

    /// Flush completion events for every still-open fragment, in first-seen
    /// order. Every fragment created during the stream yields exactly one
    /// completion event, even when the transport ended abruptly.
    pub fn finalize(&mut self) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        for fragment in &mut self.fragments {
            if !fragment.finished {
                fragment.finished = true;
                chunks.push(StreamChunk {
                    tool_call_complete: Some(fragment.snapshot()),
                    ..Default::default()
                });
            }
        }
        chunks
    }
}

/// Concatenate the text fragments of a reconstructed chunk sequence.
pub fn collect_text(chunks: &[StreamChunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        if let Some(content) = &chunk.content {
            text.push_str(content);
        }
    }
    text
}

/// Completion snapshots of every tool call in a chunk sequence, in the order
/// they completed.
pub fn completed_tool_calls(chunks: &[StreamChunk]) -> Vec<ToolCallSnapshot> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.tool_call_complete.clone())
        .collect()
}
