//! Amazon Nova and Titan adapter
//!
//! Nova models use the Converse body shape:
//! ```text
//! {"messages":[{"role":"user","content":[{"text":"Hi"}]}],
//!  "inferenceConfig":{"maxTokens":2048,"temperature":0.7,"topP":0.9},
//!  "system":[{"text":"..."}]}
//! ```
//! Titan models take a single prompt string:
//! ```text
//! {"inputText":"System: ...\n\nUser: Hi","textGenerationConfig":{"maxTokenCount":2048,...}}
//! ```
//! Both stream dialects are recognized regardless of family.

use super::AdapterScope;
use crate::adapter::{frame_error, no_stop_sequences, split_system, VendorAdapter};
use crate::params::{ParamsResolver, VendorDefaults};
use bridgestream_core::identifier::{has_regional_prefix, matches_any, strip_regional_prefix};
use bridgestream_core::{
    AdapterChunk, AdapterPayload, Error, InferenceType, Result, Role, UniversalMessage,
    UniversalOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

const ON_DEMAND_MODELS: [&str; 9] = [
    "amazon.titan-text-express-v1",
    "amazon.titan-text-lite-v1",
    "amazon.titan-text-premier-v1:0",
    "amazon.titan-*",
    "amazon.nova-2-lite-v1:0",
    "amazon.nova-2-lite-v1:0:256k",
    "amazon.nova-2-micro-v1:0",
    "amazon.nova-2-pro-v1:0",
    "amazon.nova-*",
];

const PROFILE_MODELS: [&str; 3] = ["us.amazon.nova-*", "eu.amazon.nova-*", "apac.amazon.nova-*"];

/// Amazon model family, which decides the request body shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmazonFamily {
    Nova,
    Titan,
}

impl AmazonFamily {
    /// Detect the family by substring; unknown ids are treated as Nova
    pub fn detect(model_id: Option<&str>) -> Self {
        let lowered = model_id.unwrap_or_default().to_ascii_lowercase();
        if lowered.contains("nova") {
            Self::Nova
        } else if lowered.contains("titan") {
            Self::Titan
        } else {
            warn!(model_id = ?model_id, "Unknown Amazon model family, using Nova format");
            Self::Nova
        }
    }
}

/// Adapter for Amazon first-party models
#[derive(Debug, Clone)]
pub struct AmazonAdapter {
    scope: AdapterScope,
    params: ParamsResolver,
}

impl AmazonAdapter {
    pub fn new(scope: AdapterScope, params: ParamsResolver) -> Self {
        Self { scope, params }
    }

    pub fn legacy(params: ParamsResolver) -> Self {
        Self::new(AdapterScope::Legacy, params)
    }

    pub fn on_demand(params: ParamsResolver) -> Self {
        Self::new(AdapterScope::OnDemand, params)
    }

    /// Profile adapter; only Nova is offered through profiles
    pub fn inference_profile(params: ParamsResolver) -> Self {
        Self::new(AdapterScope::InferenceProfile, params)
    }

    pub fn scope(&self) -> AdapterScope {
        self.scope
    }

    fn family(&self, options: &UniversalOptions) -> AmazonFamily {
        match self.scope {
            AdapterScope::InferenceProfile => AmazonFamily::Nova,
            _ => AmazonFamily::detect(options.model_id.as_deref()),
        }
    }

    fn format_nova(
        &self,
        messages: &[UniversalMessage],
        options: &UniversalOptions,
    ) -> Result<AdapterPayload> {
        let (system, turns) = split_system(messages);
        if turns.is_empty() {
            return Err(Error::format(
                "Nova request needs at least one user or assistant message",
            ));
        }

        let resolved = self.params.resolve(VendorDefaults::AMAZON, options);
        let request = NovaRequest {
            messages: turns
                .into_iter()
                .map(|m| NovaMessage {
                    role: m.role,
                    content: vec![TextBlock { text: &m.content }],
                })
                .collect(),
            inference_config: NovaInferenceConfig {
                max_tokens: resolved.max_tokens,
                temperature: resolved.temperature,
                top_p: resolved.top_p,
                stop_sequences: &options.stop_sequences,
            },
            system: system.map(|text| vec![TextBlock { text }]),
        };

        Ok(AdapterPayload::json(serde_json::to_value(request)?))
    }

    fn format_titan(
        &self,
        messages: &[UniversalMessage],
        options: &UniversalOptions,
    ) -> Result<AdapterPayload> {
        if messages.is_empty() {
            return Err(Error::format("Titan request needs at least one message"));
        }

        let (system, turns) = split_system(messages);
        let conversation = turns
            .iter()
            .map(|m| match m.role {
                Role::Assistant => format!("Assistant: {}", m.content),
                _ => format!("User: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let input_text = match system {
            Some(system) => format!("System: {}\n\n{}", system, conversation),
            None => conversation,
        };

        let resolved = self.params.resolve(VendorDefaults::AMAZON, options);
        let request = TitanRequest {
            input_text,
            text_generation_config: TitanGenerationConfig {
                max_token_count: resolved.max_tokens,
                temperature: resolved.temperature,
                top_p: resolved.top_p,
                stop_sequences: &options.stop_sequences,
            },
        };

        Ok(AdapterPayload::json(serde_json::to_value(request)?))
    }
}

#[derive(Debug, Serialize)]
struct NovaRequest<'a> {
    messages: Vec<NovaMessage<'a>>,
    #[serde(rename = "inferenceConfig")]
    inference_config: NovaInferenceConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<TextBlock<'a>>>,
}

#[derive(Debug, Serialize)]
struct NovaMessage<'a> {
    role: Role,
    content: Vec<TextBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NovaInferenceConfig<'a> {
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanRequest<'a> {
    input_text: String,
    text_generation_config: TitanGenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanGenerationConfig<'a> {
    max_token_count: u32,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    stop_sequences: &'a [String],
}

/// Union of the Nova and Titan stream frames
///
/// A field of the wrong type reads as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmazonFrame {
    #[serde(default, deserialize_with = "lenient")]
    content_block_delta: Option<ContentBlockDelta>,
    #[serde(default, deserialize_with = "lenient")]
    output_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    message_stop: Option<MessageStop>,
    #[serde(default, deserialize_with = "lenient")]
    completion_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDelta {
    #[serde(default, deserialize_with = "lenient")]
    delta: Option<DeltaText>,
}

#[derive(Debug, Deserialize)]
struct DeltaText {
    #[serde(default, deserialize_with = "lenient")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStop {
    #[serde(default, deserialize_with = "lenient")]
    stop_reason: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

impl VendorAdapter for AmazonAdapter {
    fn vendor(&self) -> &str {
        "amazon"
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
                !has_regional_prefix(model_id) && matches_any(&ON_DEMAND_MODELS, model_id)
            }
            AdapterScope::InferenceProfile => matches_any(&PROFILE_MODELS, model_id),
        }
    }

    fn format_request(
        &self,
        messages: &[UniversalMessage],
        options: &UniversalOptions,
    ) -> Result<AdapterPayload> {
        let family = self.family(options);
        debug!(
            model_id = ?options.model_id,
            scope = %self.scope,
            family = ?family,
            "Formatting Amazon request"
        );

        match family {
            AmazonFamily::Nova => self.format_nova(messages, options),
            AmazonFamily::Titan => self.format_titan(messages, options),
        }
    }

    fn parse_chunk(&self, frame: &Value) -> AdapterChunk {
        let parsed = AmazonFrame::deserialize(frame).unwrap_or_default();

        let delta_text = parsed
            .content_block_delta
            .and_then(|block| block.delta)
            .and_then(|delta| delta.text)
            .filter(|text| !text.is_empty());
        if let Some(text) = delta_text {
            return AdapterChunk::chunk(text);
        }

        if let Some(text) = parsed.output_text.filter(|text| !text.is_empty()) {
            return AdapterChunk::chunk(text);
        }

        if let Some(stop) = parsed.message_stop {
            return AdapterChunk::done_with(json!({ "stopReason": stop.stop_reason }));
        }

        if let Some(reason) = parsed.completion_reason.filter(|reason| !reason.is_empty()) {
            return AdapterChunk::done_with(json!({ "completionReason": reason }));
        }

        match frame_error(frame, true) {
            Some(message) => AdapterChunk::error(message),
            None => AdapterChunk::empty(),
        }
    }
}
