//! Anthropic Messages API adapter
//!
//! Request body:
//! ```text
//! {"anthropic_version":"bedrock-2023-05-31","max_tokens":4096,
//!  "messages":[{"role":"user","content":"Hi"}],"temperature":1.0,"system":"..."}
//! ```
//!
//! Streaming frames:
//! ```text
//! {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}
//! {"type":"message_stop"}
//! {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}
//! ```

use super::AdapterScope;
use crate::adapter::{no_stop_sequences, split_system, VendorAdapter};
use crate::params::{ParamsResolver, VendorDefaults};
use bridgestream_core::identifier::{has_regional_prefix, matches_any, strip_regional_prefix};
use bridgestream_core::{
    AdapterChunk, AdapterPayload, Error, InferenceType, Result, Role, UniversalMessage,
    UniversalOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

const ON_DEMAND_MODELS: [&str; 4] = [
    "anthropic.claude-3-5-sonnet-20241022-v2:0",
    "anthropic.claude-3-5-haiku-20241022-v1:0",
    "anthropic.claude-3-haiku-20240307-v1:0",
    "anthropic.claude-*",
];

/// Regional profile ids, plus base ids of the families only offered through profiles
const PROFILE_MODELS: [&str; 7] = [
    "us.anthropic.claude-*",
    "eu.anthropic.claude-*",
    "apac.anthropic.claude-*",
    "anthropic.claude-4-*",
    "anthropic.claude-sonnet-4-*",
    "anthropic.claude-opus-4-*",
    "anthropic.claude-haiku-4-*",
];

/// Adapter for Claude models
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    scope: AdapterScope,
    params: ParamsResolver,
}

impl AnthropicAdapter {
    pub fn new(scope: AdapterScope, params: ParamsResolver) -> Self {
        Self { scope, params }
    }

    /// Mode-agnostic adapter
    pub fn legacy(params: ParamsResolver) -> Self {
        Self::new(AdapterScope::Legacy, params)
    }

    pub fn on_demand(params: ParamsResolver) -> Self {
        Self::new(AdapterScope::OnDemand, params)
    }

    pub fn inference_profile(params: ParamsResolver) -> Self {
        Self::new(AdapterScope::InferenceProfile, params)
    }

    pub fn scope(&self) -> AdapterScope {
        self.scope
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicEvent {
    ContentBlockDelta {
        #[serde(default)]
        delta: Option<TextDelta>,
    },
    MessageStop {},
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(default)]
    text: Option<String>,
}

impl VendorAdapter for AnthropicAdapter {
    fn vendor(&self) -> &str {
        "anthropic"
    }

    fn inference_type(&self) -> InferenceType {
        self.scope.inference_type()
    }

    fn supported_models(&self) -> &[&'static str] {
        match self.scope {
            AdapterScope::InferenceProfile => &PROFILE_MODELS,
            AdapterScope::Legacy | AdapterScope::OnDemand => &ON_DEMAND_MODELS,
        }
    }

    fn supports_model(&self, model_id: &str) -> bool {
        match self.scope {
            AdapterScope::Legacy => matches_any(&ON_DEMAND_MODELS, strip_regional_prefix(model_id)),
            AdapterScope::OnDemand => {
                !has_regional_prefix(model_id)
                    && !matches_any(&PROFILE_MODELS, model_id)
                    && matches_any(&ON_DEMAND_MODELS, model_id)
            }
            AdapterScope::InferenceProfile => matches_any(&PROFILE_MODELS, model_id),
        }
    }

    fn format_request(
        &self,
        messages: &[UniversalMessage],
        options: &UniversalOptions,
    ) -> Result<AdapterPayload> {
        let (system, turns) = split_system(messages);
        if turns.is_empty() {
            return Err(Error::format(
                "Anthropic request needs at least one user or assistant message",
            ));
        }

        let resolved = self.params.resolve(VendorDefaults::ANTHROPIC, options);
        debug!(
            model_id = ?options.model_id,
            scope = %self.scope,
            turns = turns.len(),
            "Formatting Anthropic request"
        );

        // Temperature always resolves, and the API rejects it alongside top_p
        let request = AnthropicRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: resolved.max_tokens,
            messages: turns
                .into_iter()
                .map(|m| AnthropicMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: Some(resolved.temperature),
            top_p: None,
            top_k: options.top_k,
            system,
            stop_sequences: &options.stop_sequences,
        };

        Ok(AdapterPayload::json(serde_json::to_value(request)?))
    }

    fn parse_chunk(&self, frame: &Value) -> AdapterChunk {
        match AnthropicEvent::deserialize(frame) {
            Ok(AnthropicEvent::ContentBlockDelta {
                delta: Some(TextDelta { text: Some(text) }),
            }) if !text.is_empty() => return AdapterChunk::chunk(text),
            Ok(AnthropicEvent::MessageStop {}) => return AdapterChunk::done(),
            _ => {}
        }

        match anthropic_error(frame) {
            Some(message) => AdapterChunk::error(message),
            None => AdapterChunk::empty(),
        }
    }
}

fn anthropic_error(frame: &Value) -> Option<String> {
    let is_error = frame.get("type").and_then(Value::as_str) == Some("error")
        || frame.get("error").is_some();
    if !is_error {
        return None;
    }

    let message = frame
        .get("error")
        .and_then(|error| error.get("message").and_then(Value::as_str).or_else(|| error.as_str()))
        .or_else(|| frame.get("message").and_then(Value::as_str))
        .unwrap_or("Unknown error");
    Some(message.to_string())
}
