//! Built-in vendor adapters
//!
//! Each vendor has one adapter type. A [`AdapterScope`] selects which model ids
//! an instance claims: the legacy scope is mode-agnostic and ignores regional
//! prefixes, while the per-mode scopes are disjoint from each other.

pub mod amazon;
pub mod anthropic;
pub mod cohere;

pub use amazon::{AmazonAdapter, AmazonFamily};
pub use anthropic::AnthropicAdapter;
pub use cohere::CohereAdapter;

use bridgestream_core::InferenceType;
use std::fmt;

/// Which family of model ids an adapter instance claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterScope {
    /// One adapter per vendor, regardless of mode
    Legacy,
    /// Plain ids only; rejects regional profile ids
    OnDemand,
    /// Region-qualified profile ids
    InferenceProfile,
}

impl AdapterScope {
    pub fn inference_type(&self) -> InferenceType {
        match self {
            Self::Legacy | Self::OnDemand => InferenceType::OnDemand,
            Self::InferenceProfile => InferenceType::InferenceProfile,
        }
    }
}

impl fmt::Display for AdapterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::OnDemand => f.write_str("on_demand"),
            Self::InferenceProfile => f.write_str("inference_profile"),
        }
    }
}
