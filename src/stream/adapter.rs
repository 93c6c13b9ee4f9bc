use crate::errors::ApiResult;
use crate::stream::{RawDelta, StreamChunk, StreamReconstructor};
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// A `Stream` combinator that reconstructs chunks from an inner delta
    /// stream, one chunk per delta, then flushes the finalization chunks
    /// when the inner stream ends.
    ///
    /// Errors from the inner stream pass through unchanged; a mid-stream
    /// failure is terminal for the stream, never retried here.
    pub struct ReconstructedStream<S> {
        #[pin]
        inner: S,
        reconstructor: StreamReconstructor,
        flushed: VecDeque<StreamChunk>,
        done: bool,
    }
}

impl<S> ReconstructedStream<S>
where
    S: Stream<Item = ApiResult<RawDelta>>,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reconstructor: StreamReconstructor::new(),
            flushed: VecDeque::new(),
            done: false,
        }
    }
}

impl<S> Stream for ReconstructedStream<S>
where
    S: Stream<Item = ApiResult<RawDelta>>,
{
    type Item = ApiResult<StreamChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(chunk) = this.flushed.pop_front() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if *this.done {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(delta))) => {
                    return Poll::Ready(Some(Ok(this.reconstructor.consume(&delta))));
                }
                Poll::Ready(Some(Err(error))) => {
                    return Poll::Ready(Some(Err(error)));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                    this.flushed.extend(this.reconstructor.finalize());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::stream::ToolCallDelta;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_reconstructs_and_flushes_at_end() {
        let deltas = vec![
            Ok(RawDelta::text("hi")),
            Ok(RawDelta::default()
                .with_tool_call(ToolCallDelta::new(0).with_name("f").with_arguments("{}"))),
        ];

        let chunks: Vec<_> = ReconstructedStream::new(futures::stream::iter(deltas))
            .collect()
            .await;

        // Two consumed deltas plus one finalization chunk for the open call.
        assert_eq!(chunks.len(), 3);
        let flushed = chunks[2].as_ref().expect("finalize chunk");
        assert_eq!(
            flushed.tool_call_complete.as_ref().expect("completion").name,
            "f"
        );
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let deltas: Vec<ApiResult<RawDelta>> = vec![
            Ok(RawDelta::text("partial")),
            Err(ApiError::Network("connection reset".to_string())),
        ];

        let mut stream = ReconstructedStream::new(futures::stream::iter(deltas));
        assert!(stream.next().await.expect("first item").is_ok());
        let error = stream.next().await.expect("second item").unwrap_err();
        assert_eq!(error, ApiError::Network("connection reset".to_string()));
    }
}
