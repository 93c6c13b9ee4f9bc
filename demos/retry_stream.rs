//! Simulated flaky provider: stream setup fails twice with a 503 before
//! succeeding, then the delivered deltas are reconstructed into chunks.
//!
//! Run with `cargo run --example retry_stream`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt};
use integrations_resilience::prelude::*;
use integrations_resilience::stream::{collect_text, ToolCallDelta};
use tokio_util::sync::CancellationToken;

fn provider_deltas() -> Vec<ApiResult<RawDelta>> {
    vec![
        Ok(RawDelta::text("The weather in Paris ")),
        Ok(RawDelta::text("is sunny.")),
        Ok(RawDelta::default().with_tool_call(
            ToolCallDelta::new(0)
                .with_id("call_0")
                .with_name("get_weather")
                .with_arguments("{\"city\":\"Paris\"}"),
        )),
        Ok(RawDelta::finish(FinishReason::Stop).with_usage(UsageSnapshot {
            prompt_tokens: 42,
            completion_tokens: 17,
            ..Default::default()
        })),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let executor = ResilientExecutor::new();
    let ctx = RetryContext::new("chat.stream", "demo-model", "demo-provider");
    let policy = RetryPolicy::default().with_initial_delay(Duration::from_millis(200));

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let inner = executor
        .execute(
            &ctx,
            &policy,
            &RetryEvents::logging(),
            &CancellationToken::new(),
            |_token| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ApiError::http(503, "service unavailable"))
                    } else {
                        Ok(stream::iter(provider_deltas()))
                    }
                }
            },
        )
        .await?;

    let mut chunks = Vec::new();
    let mut reconstructed = ReconstructedStream::new(inner);
    while let Some(chunk) = reconstructed.next().await {
        let chunk = chunk?;
        if let Some(call) = &chunk.tool_call_complete {
            println!("tool call {}: {}({})", call.index, call.name, call.arguments);
        }
        chunks.push(chunk);
    }

    println!("text: {}", collect_text(&chunks));
    if let Some(usage) = chunks.iter().rev().find_map(|c| c.usage.as_ref()) {
        println!("usage: {}", serde_json::to_string_pretty(usage)?);
    }

    Ok(())
}
