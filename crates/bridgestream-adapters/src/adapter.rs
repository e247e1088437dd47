//! Vendor Adapter contract
//!
//! An adapter translates universal requests into one vendor's request body and
//! that vendor's streaming frames back into [`AdapterChunk`]s. Adapters are
//! identified by `{vendor, inference_type}` and are shared as `Arc` singletons.

use bridgestream_core::identifier::matches_any;
use bridgestream_core::{AdapterChunk, AdapterPayload, InferenceType, Result, Role, UniversalMessage, UniversalOptions};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Debug;

/// Trait for translating between the universal protocol and one vendor dialect
pub trait VendorAdapter: Send + Sync + Debug {
    /// Vendor key this adapter is registered under (e.g. "anthropic")
    fn vendor(&self) -> &str;

    /// Invocation mode this adapter is built for
    fn inference_type(&self) -> InferenceType;

    /// Literal ids or `*` globs this adapter accepts
    fn supported_models(&self) -> &[&'static str];

    /// Whether this adapter accepts a model id
    ///
    /// Mode-specific adapters narrow this so sibling adapters never claim the
    /// same id.
    fn supports_model(&self, model_id: &str) -> bool {
        matches_any(self.supported_models(), model_id)
    }

    /// Build the vendor request body
    ///
    /// Pure: performs no I/O and returns `Error::Format` on invalid input.
    fn format_request(
        &self,
        messages: &[UniversalMessage],
        options: &UniversalOptions,
    ) -> Result<AdapterPayload>;

    /// Normalize one decoded streaming frame
    ///
    /// Total: unknown or malformed frames yield an empty chunk.
    fn parse_chunk(&self, frame: &Value) -> AdapterChunk;

    /// Human-readable name, e.g. "Anthropic INFERENCE_PROFILE Adapter"
    fn display_name(&self) -> String {
        format!("{} {} Adapter", capitalize(self.vendor()), self.inference_type())
    }
}

/// Separate the system prompt from the conversation
///
/// Only the first system message is honored; every system message is excluded
/// from the turns.
pub fn split_system(messages: &[UniversalMessage]) -> (Option<&str>, Vec<&UniversalMessage>) {
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str());
    let turns = messages.iter().filter(|m| m.role != Role::System).collect();
    (system, turns)
}

pub(crate) fn no_stop_sequences(stops: &&[String]) -> bool {
    stops.is_empty()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Exception keys the hosting platform emits inside a stream
const EXCEPTION_KEYS: [&str; 6] = [
    "internalServerException",
    "modelStreamErrorException",
    "throttlingException",
    "validationException",
    "serviceUnavailableException",
    "modelTimeoutException",
];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Message(String),
    Object { message: Option<String> },
}

/// Explicit error carried by a frame, shared by the Amazon and Cohere dialects
///
/// Recognizes a string `error`, an `error.message`, and the platform exception
/// keys. With `message_fallback`, a top-level `message` mentioning "error" also
/// counts; that heuristic is fragile and kept only for those two dialects.
pub(crate) fn frame_error(frame: &Value, message_fallback: bool) -> Option<String> {
    if let Some(error) = frame.get("error") {
        return Some(match ErrorField::deserialize(error) {
            Ok(ErrorField::Message(message)) => message,
            Ok(ErrorField::Object { message: Some(message) }) => message,
            _ => "Unknown error".to_string(),
        });
    }

    for key in EXCEPTION_KEYS {
        if let Some(exception) = frame.get(key) {
            let message = exception
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(key);
            return Some(message.to_string());
        }
    }

    if message_fallback {
        if let Some(message) = frame.get("message").and_then(Value::as_str) {
            if message.to_ascii_lowercase().contains("error") {
                return Some(message.to_string());
            }
        }
    }

    None
}
