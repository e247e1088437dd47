//! Anthropic strategy

use super::VendorStrategy;
use crate::adapter::VendorAdapter;
use crate::params::ParamsResolver;
use crate::vendors::AnthropicAdapter;
use bridgestream_core::InferenceType;
use std::sync::Arc;
use tracing::debug;

/// Claude models: on-demand ids, regional profiles, provisioned ARNs
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicStrategy;

impl VendorStrategy for AnthropicStrategy {
    fn vendor(&self) -> &'static str {
        "anthropic"
    }

    fn supported_inference_types(&self) -> &[InferenceType] {
        &InferenceType::ALL
    }

    fn direct_alias(&self) -> Option<&'static str> {
        Some("claude-")
    }

    fn create_adapter(
        &self,
        inference_type: InferenceType,
        params: &ParamsResolver,
    ) -> Arc<dyn VendorAdapter> {
        match self.adapter_mode(inference_type) {
            InferenceType::InferenceProfile => {
                debug!("Creating Anthropic inference profile adapter");
                Arc::new(AnthropicAdapter::inference_profile(params.clone()))
            }
            _ => {
                debug!(inference_type = %inference_type, "Creating Anthropic on-demand adapter");
                Arc::new(AnthropicAdapter::on_demand(params.clone()))
            }
        }
    }
}
