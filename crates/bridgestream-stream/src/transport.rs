//! Invoke-stream transport seam
//!
//! The processor never talks to the network itself. A transport takes a
//! formatted request and returns the raw frame stream of the response.

use crate::parser::RawFrame;
use async_trait::async_trait;
use bridgestream_core::{AdapterPayload, Result};
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::Value;

/// Frames of one response, in arrival order
pub type FrameStream = BoxStream<'static, Result<RawFrame>>;

/// A formatted request ready to invoke
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub model_id: String,
    pub payload: AdapterPayload,
}

impl StreamRequest {
    pub fn new(model_id: impl Into<String>, payload: AdapterPayload) -> Self {
        Self {
            model_id: model_id.into(),
            payload,
        }
    }

    pub fn body(&self) -> &Value {
        &self.payload.body
    }

    /// Serialized request body
    pub fn body_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(&self.payload.body)?))
    }

    pub fn content_type(&self) -> &str {
        &self.payload.content_type
    }

    pub fn accept(&self) -> &str {
        &self.payload.accept
    }
}

/// Sends a request and opens the response stream
#[async_trait]
pub trait InvokeStream: Send + Sync {
    async fn invoke(&self, request: &StreamRequest) -> Result<FrameStream>;
}
