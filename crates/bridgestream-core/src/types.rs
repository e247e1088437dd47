//! Core types for BridgeStream

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// End user turn
    User,
    /// Model turn
    Assistant,
}

/// A vendor-neutral chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalMessage {
    /// Role of the message sender
    pub role: Role,

    /// Content of the message
    pub content: String,
}

impl UniversalMessage {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Vendor-neutral generation options
///
/// Every field is optional; an absent field is filled from the model
/// registry's recommendation and then from the vendor default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversalOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,

    /// Model id, used for registry lookups and family detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl UniversalOptions {
    /// Options addressed at a specific model
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: Some(model_id.into()),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop_sequences<I, S>(mut self, stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_sequences = stops.into_iter().map(Into::into).collect();
        self
    }
}

/// A vendor payload ready to transmit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterPayload {
    /// Vendor-specific request body
    pub body: Value,

    /// Content-Type header for the invoke call
    pub content_type: String,

    /// Accept header for the invoke call
    pub accept: String,
}

impl AdapterPayload {
    /// Wrap a JSON body with the default content headers
    pub fn json(body: Value) -> Self {
        Self {
            body,
            content_type: "application/json".to_string(),
            accept: "application/json".to_string(),
        }
    }
}

/// Normalized result of parsing one vendor streaming frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AdapterChunk {
    /// Content delta; an empty string is a heartbeat
    Chunk { content: String },

    /// End of stream, with optional vendor metadata such as a stop reason
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },

    /// Vendor-reported or parse error
    Error { error: String },
}

impl AdapterChunk {
    /// Create a content chunk
    pub fn chunk(content: impl Into<String>) -> Self {
        Self::Chunk {
            content: content.into(),
        }
    }

    /// Create an empty heartbeat chunk
    pub fn empty() -> Self {
        Self::chunk("")
    }

    /// Create a done chunk without metadata
    pub fn done() -> Self {
        Self::Done { metadata: None }
    }

    /// Create a done chunk carrying vendor metadata
    pub fn done_with(metadata: Value) -> Self {
        Self::Done {
            metadata: Some(metadata),
        }
    }

    /// Create an error chunk
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Check if this is a done signal
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Check if this is a content chunk with no text
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Chunk { content } if content.is_empty())
    }

    /// Get the text content if this is a content chunk
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Chunk { content } => Some(content),
            _ => None,
        }
    }
}

/// How a model is addressed on the hosting platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InferenceType {
    /// Plain model id, on-demand throughput
    OnDemand,
    /// Region-qualified inference profile id
    InferenceProfile,
    /// Provisioned-throughput ARN
    Provisioned,
    /// Cross-region inference id
    CrossRegion,
}

impl InferenceType {
    /// Every inference type, in canonical order
    pub const ALL: [InferenceType; 4] = [
        InferenceType::OnDemand,
        InferenceType::InferenceProfile,
        InferenceType::Provisioned,
        InferenceType::CrossRegion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnDemand => "ON_DEMAND",
            Self::InferenceProfile => "INFERENCE_PROFILE",
            Self::Provisioned => "PROVISIONED",
            Self::CrossRegion => "CROSS_REGION",
        }
    }
}

impl fmt::Display for InferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InferenceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation(format!("invalid inference type: {}", s)))
    }
}
