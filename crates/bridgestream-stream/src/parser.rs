//! Frame decoding
//!
//! Turns raw transport frames into [`AdapterChunk`]s by decoding the payload
//! bytes as UTF-8 JSON and handing the value to the vendor adapter.

use bridgestream_adapters::VendorAdapter;
use bridgestream_core::AdapterChunk;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One transport frame; a frame without bytes ends the stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub bytes: Option<Bytes>,
}

impl RawFrame {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    /// Frame carrying no payload
    pub fn end() -> Self {
        Self { bytes: None }
    }

    /// Frame carrying a serialized JSON value
    pub fn json(value: &Value) -> Self {
        Self::new(value.to_string())
    }
}

/// Caller-facing stream event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Chunk { content: String },
    Error { error: String },
}

impl StreamEvent {
    pub fn chunk(content: impl Into<String>) -> Self {
        Self::Chunk {
            content: content.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Chunk { content } => Some(content),
            Self::Error { .. } => None,
        }
    }
}

/// Decodes frames with one vendor adapter
#[derive(Debug, Clone)]
pub struct ChunkParser {
    adapter: Arc<dyn VendorAdapter>,
}

impl ChunkParser {
    pub fn new(adapter: Arc<dyn VendorAdapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<dyn VendorAdapter> {
        &self.adapter
    }

    /// Decode one frame
    ///
    /// Never fails: undecodable payloads become error chunks.
    pub fn parse_frame(&self, frame: &RawFrame) -> AdapterChunk {
        let Some(bytes) = frame.bytes.as_ref() else {
            return AdapterChunk::done();
        };

        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => return AdapterChunk::error(format!("Failed to parse chunk: {}", e)),
        };

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => return AdapterChunk::error(format!("Failed to parse chunk: {}", e)),
        };

        match self.adapter.parse_chunk(&value) {
            AdapterChunk::Error { error } if error.is_empty() => {
                AdapterChunk::error("Unknown error from adapter")
            }
            chunk => chunk,
        }
    }

    /// Caller-facing event for a chunk; done and heartbeat chunks produce none
    pub fn to_event(&self, chunk: &AdapterChunk) -> Option<StreamEvent> {
        match chunk {
            AdapterChunk::Chunk { content } if !content.is_empty() => {
                Some(StreamEvent::chunk(content.as_str()))
            }
            AdapterChunk::Error { error } => Some(StreamEvent::error(error.as_str())),
            _ => None,
        }
    }
}
