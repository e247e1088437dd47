//! Cohere Command adapter
//!
//! Cohere takes the last turn as `message` and everything before it as
//! `chat_history`. Streaming is selected by the invoke call, never by the body.
//!
//! ```text
//! {"message":"How are you?","chat_history":[{"role":"USER","message":"Hi"}],
//!  "preamble":"...","temperature":0.3,"max_tokens":2048,"p":0.75}
//! ```

use crate::adapter::{frame_error, no_stop_sequences, split_system, VendorAdapter};
use crate::params::{ParamsResolver, VendorDefaults};
use bridgestream_core::identifier::{matches_any, strip_regional_prefix};
use bridgestream_core::{
    AdapterChunk, AdapterPayload, Error, InferenceType, Result, Role, UniversalMessage,
    UniversalOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const SUPPORTED_MODELS: [&str; 5] = [
    "cohere.command-r-v1:0",
    "cohere.command-r-plus-v1:0",
    "cohere.command-light-v14",
    "cohere.command-text-v14",
    "cohere.command-*",
];

/// Adapter for Cohere models, shared by every inference mode
#[derive(Debug, Clone)]
pub struct CohereAdapter {
    params: ParamsResolver,
}

impl CohereAdapter {
    pub fn new(params: ParamsResolver) -> Self {
        Self { params }
    }
}

#[derive(Debug, Serialize)]
struct CohereRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chat_history: Vec<ChatTurn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<&'a str>,
    temperature: f64,
    max_tokens: u32,
    p: f64,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct CohereFrame {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    is_finished: Option<bool>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl VendorAdapter for CohereAdapter {
    fn vendor(&self) -> &str {
        "cohere"
    }

    fn inference_type(&self) -> InferenceType {
        InferenceType::OnDemand
    }

    fn supported_models(&self) -> &[&'static str] {
        &SUPPORTED_MODELS
    }

    fn supports_model(&self, model_id: &str) -> bool {
        matches_any(&SUPPORTED_MODELS, strip_regional_prefix(model_id))
    }

    fn format_request(
        &self,
        messages: &[UniversalMessage],
        options: &UniversalOptions,
    ) -> Result<AdapterPayload> {
        let (preamble, turns) = split_system(messages);
        let Some((last, history)) = turns.split_last() else {
            return Err(Error::format(
                "Cohere request needs at least one user or assistant message",
            ));
        };

        let resolved = self.params.resolve(VendorDefaults::COHERE, options);
        debug!(
            model_id = ?options.model_id,
            history = history.len(),
            "Formatting Cohere request"
        );

        let request = CohereRequest {
            message: &last.content,
            chat_history: history
                .iter()
                .map(|m| ChatTurn {
                    role: match m.role {
                        Role::Assistant => "CHATBOT",
                        _ => "USER",
                    },
                    message: &m.content,
                })
                .collect(),
            preamble,
            temperature: resolved.temperature,
            max_tokens: resolved.max_tokens,
            p: resolved.top_p,
            stop_sequences: &options.stop_sequences,
        };

        Ok(AdapterPayload::json(serde_json::to_value(request)?))
    }

    fn parse_chunk(&self, frame: &Value) -> AdapterChunk {
        let parsed = CohereFrame::deserialize(frame).unwrap_or_default();

        if let Some(text) = parsed.text.filter(|text| !text.is_empty()) {
            return AdapterChunk::chunk(text);
        }

        if parsed.is_finished == Some(true) {
            return AdapterChunk::done_with(json!({ "finishReason": parsed.finish_reason }));
        }

        match frame_error(frame, true) {
            Some(message) => AdapterChunk::error(message),
            None => AdapterChunk::empty(),
        }
    }
}
