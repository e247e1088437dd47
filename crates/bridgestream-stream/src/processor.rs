//! Stream processor
//!
//! Drives one response stream through its adapter and yields caller-facing
//! events. Each stream moves `Streaming -> Done | Failed` exactly once:
//! - a done chunk ends the stream without an event
//! - an error chunk or transport error is yielded, then the stream ends
//! - empty heartbeat chunks are skipped
//!
//! Once finished the source is never polled again.

use crate::parser::{ChunkParser, StreamEvent};
use crate::transport::{FrameStream, InvokeStream, StreamRequest};
use crate::RawFrame;
use bridgestream_adapters::{AdapterFactory, VendorAdapter};
use bridgestream_core::{AdapterChunk, Error, Result, UniversalMessage, UniversalOptions};
use futures::stream::{self, FusedStream, Stream, StreamExt};
use futures::ready;
use pin_project::pin_project;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, error, info, info_span, Span};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Streaming,
    Done,
    Failed,
}

/// Normalized event stream over a raw frame source
#[pin_project]
pub struct EventStream<S> {
    #[pin]
    source: S,
    parser: ChunkParser,
    state: StreamState,
    chunks: usize,
    span: Span,
}

impl<S> EventStream<S>
where
    S: Stream<Item = Result<RawFrame>>,
{
    pub fn new(source: S, parser: ChunkParser, model_id: &str) -> Self {
        let span = info_span!("stream", model_id = %model_id, stream_id = %Uuid::new_v4());
        Self {
            source,
            parser,
            state: StreamState::Streaming,
            chunks: 0,
            span,
        }
    }

    /// Number of content chunks yielded so far
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn is_failed(&self) -> bool {
        self.state == StreamState::Failed
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<RawFrame>>,
{
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        let _entered = this.span.enter();

        loop {
            if *this.state != StreamState::Streaming {
                return Poll::Ready(None);
            }

            let frame = match ready!(this.source.as_mut().poll_next(cx)) {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    error!(error = %e, "Transport error while streaming");
                    *this.state = StreamState::Failed;
                    record_event("error");
                    return Poll::Ready(Some(StreamEvent::error(e.to_string())));
                }
                None => {
                    debug!(chunks = *this.chunks, "Source ended without a done frame");
                    *this.state = StreamState::Done;
                    return Poll::Ready(None);
                }
            };

            match this.parser.parse_frame(&frame) {
                AdapterChunk::Done { .. } => {
                    info!(chunks = *this.chunks, "Stream completed");
                    *this.state = StreamState::Done;
                    record_event("done");
                    return Poll::Ready(None);
                }
                AdapterChunk::Error { error } => {
                    error!(error = %error, "Stream error frame");
                    *this.state = StreamState::Failed;
                    record_event("error");
                    return Poll::Ready(Some(StreamEvent::error(error)));
                }
                AdapterChunk::Chunk { content } if content.is_empty() => {
                    record_event("heartbeat");
                }
                AdapterChunk::Chunk { content } => {
                    *this.chunks += 1;
                    record_event("chunk");
                    return Poll::Ready(Some(StreamEvent::chunk(content)));
                }
            }
        }
    }
}

impl<S> FusedStream for EventStream<S>
where
    S: Stream<Item = Result<RawFrame>>,
{
    fn is_terminated(&self) -> bool {
        self.state != StreamState::Streaming
    }
}

fn record_event(kind: &'static str) {
    metrics::counter!("bridgestream_stream_events_total", "kind" => kind).increment(1);
}

/// Gather every event; the first error event fails the collection
pub async fn collect_events<S>(events: S) -> Result<Vec<StreamEvent>>
where
    S: Stream<Item = StreamEvent>,
{
    let mut events = std::pin::pin!(events);
    let mut collected = Vec::new();

    while let Some(event) = events.next().await {
        if let StreamEvent::Error { error } = event {
            return Err(Error::stream(error));
        }
        collected.push(event);
    }

    Ok(collected)
}

/// Opens response streams through a transport and normalizes them
#[derive(Clone)]
pub struct StreamProcessor {
    transport: Arc<dyn InvokeStream>,
}

impl std::fmt::Debug for StreamProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProcessor").finish_non_exhaustive()
    }
}

impl StreamProcessor {
    pub fn new(transport: Arc<dyn InvokeStream>) -> Self {
        Self { transport }
    }

    /// Reject requests that cannot be invoked
    pub fn validate_request(&self, request: &StreamRequest) -> Result<()> {
        if request.model_id.trim().is_empty() {
            return Err(Error::validation("Stream request has an empty model id"));
        }
        if request.body().is_null() {
            return Err(Error::validation("Stream request has no body"));
        }
        Ok(())
    }

    /// Invoke the request and normalize its frames
    ///
    /// Invalid requests and failed invocations come back as a stream holding
    /// a single error event.
    pub async fn process_stream(
        &self,
        request: &StreamRequest,
        adapter: Arc<dyn VendorAdapter>,
    ) -> EventStream<FrameStream> {
        let parser = ChunkParser::new(adapter);

        let source = match self.open(request).await {
            Ok(source) => source,
            Err(e) => {
                error!(model_id = %request.model_id, error = %e, "Failed to open stream");
                stream::iter(vec![Err(e)]).boxed()
            }
        };

        EventStream::new(source, parser, &request.model_id)
    }

    /// Resolve, format and stream a conversation for a model id
    ///
    /// Resolution and formatting failures are returned; streaming failures
    /// arrive as events.
    pub async fn stream_model(
        &self,
        factory: &AdapterFactory,
        model_id: &str,
        messages: &[UniversalMessage],
        options: &UniversalOptions,
    ) -> Result<EventStream<FrameStream>> {
        let adapter = factory.get_adapter_for_model(model_id)?;
        let payload = adapter.format_request(messages, options)?;
        let request = StreamRequest::new(model_id, payload);

        debug!(model_id = %model_id, adapter = %adapter.display_name(), "Starting stream");
        Ok(self.process_stream(&request, adapter).await)
    }

    /// Run a stream to completion
    pub async fn collect_stream(
        &self,
        request: &StreamRequest,
        adapter: Arc<dyn VendorAdapter>,
    ) -> Result<Vec<StreamEvent>> {
        collect_events(self.process_stream(request, adapter).await).await
    }

    async fn open(&self, request: &StreamRequest) -> Result<FrameStream> {
        self.validate_request(request)?;
        info!(model_id = %request.model_id, "Invoking model stream");
        self.transport.invoke(request).await
    }
}
