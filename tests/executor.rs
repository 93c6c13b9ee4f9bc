//! End-to-end coverage: stream setup under the resilient executor, then
//! chunk reconstruction over the delivered deltas.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt};
use integrations_resilience::prelude::*;
use integrations_resilience::stream::{collect_text, completed_tool_calls, ToolCallDelta};
use tokio_util::sync::CancellationToken;

fn fast_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_initial_delay(Duration::from_millis(5))
        .with_jitter(false)
}

fn sample_deltas() -> Vec<ApiResult<RawDelta>> {
    vec![
        Ok(RawDelta::text("Checking the weather")),
        Ok(RawDelta::default().with_tool_call(
            ToolCallDelta::new(0)
                .with_id("call_0")
                .with_name("get_weather")
                .with_arguments("{\"city\":"),
        )),
        Ok(RawDelta::default()
            .with_tool_call(ToolCallDelta::new(0).with_arguments("\"Paris\"}"))),
        Ok(RawDelta::finish(FinishReason::ToolCalls).with_usage(UsageSnapshot {
            prompt_tokens: 100,
            completion_tokens: 50,
            ..Default::default()
        })),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_flaky_setup_retries_then_streams() {
    let executor = ResilientExecutor::new();
    let ctx = RetryContext::new("chat.stream", "model-a", "provider-x");
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let inner = executor
        .execute(
            &ctx,
            &fast_policy(),
            &RetryEvents::new(),
            &CancellationToken::new(),
            |_token| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ApiError::http(503, "service unavailable"))
                    } else {
                        Ok(stream::iter(sample_deltas()))
                    }
                }
            },
        )
        .await
        .expect("setup succeeds on third attempt");

    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let chunks: Vec<StreamChunk> = ReconstructedStream::new(inner)
        .map(|chunk| chunk.expect("no mid-stream errors"))
        .collect()
        .await;

    assert_eq!(collect_text(&chunks), "Checking the weather");

    let calls = completed_tool_calls(&chunks);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_weather");
    assert_eq!(calls[0].arguments, "{\"city\":\"Paris\"}");

    let finished = chunks
        .iter()
        .find(|c| c.finish_reason.is_some())
        .expect("finish chunk present");
    assert_eq!(finished.finish_reason, Some(FinishReason::ToolCalls));
    let usage = finished.usage.as_ref().expect("usage on finish chunk");
    let text = usage.text.as_ref().expect("text category");
    assert_eq!(text.input, Some(100));
    assert_eq!(text.output, Some(50));
}

#[tokio::test]
async fn test_oversized_request_fails_without_retry() {
    let executor = ResilientExecutor::new();
    let ctx = RetryContext::new("chat.stream", "model-a", "provider-x");
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: ApiResult<()> = executor
        .execute(
            &ctx,
            &fast_policy(),
            &RetryEvents::new(),
            &CancellationToken::new(),
            |_token| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::http(
                        400,
                        "This model's maximum context length is 8192 tokens",
                    ))
                }
            },
        )
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_mid_stream_error_passes_through_untouched() {
    let deltas: Vec<ApiResult<RawDelta>> = vec![
        Ok(RawDelta::text("partial")),
        Err(ApiError::Network("connection reset".to_string())),
    ];

    let mut reconstructed = ReconstructedStream::new(stream::iter(deltas));

    let first = reconstructed.next().await.expect("first item");
    assert_eq!(first.expect("text chunk").content.as_deref(), Some("partial"));

    let second = reconstructed.next().await.expect("second item");
    assert_eq!(
        second,
        Err(ApiError::Network("connection reset".to_string()))
    );
}
