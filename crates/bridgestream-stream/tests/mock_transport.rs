//! Mock transport for testing
//!
//! Replays scripted frames so whole request/response cycles can be driven
//! through the factory, the adapters and the stream processor.

use async_trait::async_trait;
use bridgestream_adapters::AdapterFactory;
use bridgestream_core::{Error, Result, UniversalMessage, UniversalOptions};
use bridgestream_stream::{
    FrameStream, InvokeStream, RawFrame, StreamEvent, StreamProcessor, StreamRequest,
};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// A transport that replays a fixed script of frames
#[derive(Default)]
pub struct MockTransport {
    frames: Vec<RawFrame>,
    fail_after: Option<usize>,
    invoke_error: Option<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<StreamRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append JSON frames to the script
    pub fn with_frames(mut self, frames: impl IntoIterator<Item = Value>) -> Self {
        self.frames.extend(frames.into_iter().map(|frame| RawFrame::json(&frame)));
        self
    }

    /// Append a raw frame to the script
    pub fn with_raw(mut self, frame: RawFrame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Emit a transport error after this many frames
    pub fn fail_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Fail the invoke call itself
    pub fn failing_invoke(mut self, message: &str) -> Self {
        self.invoke_error = Some(message.to_string());
        self
    }

    /// Get the number of times invoke was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<StreamRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvokeStream for MockTransport {
    async fn invoke(&self, request: &StreamRequest) -> Result<FrameStream> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(message) = &self.invoke_error {
            return Err(Error::stream(message.clone()));
        }

        let mut script: Vec<Result<RawFrame>> = self.frames.iter().cloned().map(Ok).collect();
        if let Some(limit) = self.fail_after {
            script.truncate(limit);
            script.push(Err(Error::stream("connection reset by peer")));
        }
        Ok(stream::iter(script).boxed())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn conversation() -> Vec<UniversalMessage> {
    vec![
        UniversalMessage::system("You are helpful."),
        UniversalMessage::user("Hi"),
        UniversalMessage::assistant("Hello"),
        UniversalMessage::user("How are you?"),
    ]
}

async fn run(transport: MockTransport, model_id: &str) -> (Arc<MockTransport>, Vec<StreamEvent>) {
    init_tracing();
    let transport = Arc::new(transport);
    let processor = StreamProcessor::new(transport.clone());
    let factory = AdapterFactory::default();

    let events = processor
        .stream_model(
            &factory,
            model_id,
            &conversation(),
            &UniversalOptions::for_model(model_id),
        )
        .await
        .unwrap()
        .collect()
        .await;
    (transport, events)
}

#[tokio::test]
async fn test_anthropic_profile_stream() {
    let transport = MockTransport::new().with_frames([
        json!({"type": "message_start", "message": {"id": "msg_1"}}),
        json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "I am"}}),
        json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": " well."}}),
        json!({"type": "message_stop"}),
    ]);

    let (transport, events) = run(transport, "us.anthropic.claude-sonnet-4-5-20250929-v1:0").await;
    assert_eq!(events, vec![StreamEvent::chunk("I am"), StreamEvent::chunk(" well.")]);

    let request = transport.last_request().unwrap();
    assert_eq!(request.model_id, "us.anthropic.claude-sonnet-4-5-20250929-v1:0");
    assert_eq!(request.body()["anthropic_version"], "bedrock-2023-05-31");
    assert_eq!(request.body()["system"], "You are helpful.");
    assert_eq!(request.content_type(), "application/json");
}

#[tokio::test]
async fn test_nova_stream() {
    let transport = MockTransport::new().with_frames([
        json!({"messageStart": {"role": "assistant"}}),
        json!({"contentBlockDelta": {"delta": {"text": "Fine"}, "contentBlockIndex": 0}}),
        json!({"messageStop": {"stopReason": "end_turn"}}),
        json!({"contentBlockDelta": {"delta": {"text": "ignored"}}}),
    ]);

    let (transport, events) = run(transport, "amazon.nova-pro-v1:0").await;
    assert_eq!(events, vec![StreamEvent::chunk("Fine")]);
    assert!(transport.last_request().unwrap().body()["inferenceConfig"].is_object());
}

#[tokio::test]
async fn test_titan_stream() {
    let transport = MockTransport::new().with_frames([
        json!({"outputText": "Doing", "index": 0, "completionReason": null}),
        json!({"outputText": " great", "index": 0, "completionReason": null}),
        json!({"outputText": "", "index": 0, "completionReason": "FINISH"}),
    ]);

    let (transport, events) = run(transport, "amazon.titan-text-express-v1").await;
    assert_eq!(events, vec![StreamEvent::chunk("Doing"), StreamEvent::chunk(" great")]);

    let request = transport.last_request().unwrap();
    let input = request.body()["inputText"].as_str().unwrap();
    assert!(input.starts_with("System: You are helpful."));
}

#[tokio::test]
async fn test_cohere_stream() {
    let transport = MockTransport::new().with_frames([
        json!({"event_type": "stream-start", "is_finished": false}),
        json!({"event_type": "text-generation", "text": "Good", "is_finished": false}),
        json!({"event_type": "stream-end", "is_finished": true, "finish_reason": "COMPLETE"}),
    ]);

    let (transport, events) = run(transport, "cohere.command-r-v1:0").await;
    assert_eq!(events, vec![StreamEvent::chunk("Good")]);

    let request = transport.last_request().unwrap();
    assert_eq!(request.body()["message"], "How are you?");
    assert_eq!(request.body()["chat_history"][1]["role"], "CHATBOT");
    assert!(request.body().get("stream").is_none());
}

#[tokio::test]
async fn test_vendor_error_frame() {
    let transport = MockTransport::new().with_frames([
        json!({"contentBlockDelta": {"delta": {"text": "Par"}}}),
        json!({"throttlingException": {"message": "Too many requests"}}),
    ]);

    let (_, events) = run(transport, "amazon.nova-lite-v1:0").await;
    assert_eq!(
        events,
        vec![StreamEvent::chunk("Par"), StreamEvent::error("Too many requests")]
    );
}

#[tokio::test]
async fn test_transport_failure_mid_stream() {
    let transport = MockTransport::new()
        .with_frames([
            json!({"text": "one"}),
            json!({"text": "two"}),
            json!({"text": "three"}),
        ])
        .fail_after(2);

    let (_, events) = run(transport, "cohere.command-r-plus-v1:0").await;
    assert_eq!(events.len(), 3);
    assert!(events[2].is_error());
}

#[tokio::test]
async fn test_collect_stream() -> anyhow::Result<()> {
    init_tracing();
    let factory = AdapterFactory::default();
    let adapter = factory.get_adapter_for_model("cohere.command-r-v1:0")?;
    let payload = adapter.format_request(&conversation(), &UniversalOptions::for_model("cohere.command-r-v1:0"))?;
    let request = StreamRequest::new("cohere.command-r-v1:0", payload);

    let ok = StreamProcessor::new(Arc::new(
        MockTransport::new()
            .with_frames([json!({"text": "a"}), json!({"text": "b"})])
            .with_raw(RawFrame::end()),
    ));
    let events = ok.collect_stream(&request, adapter.clone()).await?;
    assert_eq!(events.len(), 2);

    let failing = StreamProcessor::new(Arc::new(MockTransport::new().failing_invoke("access denied")));
    let err = failing.collect_stream(&request, adapter).await.unwrap_err();
    assert!(matches!(err, Error::Stream(ref msg) if msg.contains("access denied")));
    Ok(())
}

#[tokio::test]
async fn test_invalid_request_never_invokes() {
    init_tracing();
    let transport = Arc::new(MockTransport::new().with_frames([json!({"text": "x"})]));
    let processor = StreamProcessor::new(transport.clone());
    let factory = AdapterFactory::default();
    let adapter = factory.get_adapter_for_model("cohere.command-r-v1:0").unwrap();

    let empty_id = StreamRequest::new(
        "  ",
        bridgestream_core::AdapterPayload::json(json!({"message": "hi"})),
    );
    assert!(processor.validate_request(&empty_id).is_err());

    let null_body = StreamRequest::new(
        "cohere.command-r-v1:0",
        bridgestream_core::AdapterPayload::json(Value::Null),
    );
    assert!(processor.validate_request(&null_body).is_err());

    let events: Vec<_> = processor.process_stream(&null_body, adapter).await.collect().await;
    assert_eq!(events.len(), 1);
    assert!(events[0].is_error());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_unsupported_model_fails_before_invoke() {
    let transport = Arc::new(MockTransport::new());
    let processor = StreamProcessor::new(transport.clone());
    let factory = AdapterFactory::default();

    let result = processor
        .stream_model(
            &factory,
            "unknown.model-v1:0",
            &conversation(),
            &UniversalOptions::default(),
        )
        .await;
    assert!(matches!(result, Err(Error::UnsupportedModel(_))));
    assert_eq!(transport.call_count(), 0);
}
