//! Cohere strategy
//!
//! Cohere has no profile-specific dialect, so one adapter serves every mode.

use super::VendorStrategy;
use crate::adapter::VendorAdapter;
use crate::params::ParamsResolver;
use crate::vendors::CohereAdapter;
use bridgestream_core::InferenceType;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
pub struct CohereStrategy;

impl VendorStrategy for CohereStrategy {
    fn vendor(&self) -> &'static str {
        "cohere"
    }

    fn supported_inference_types(&self) -> &[InferenceType] {
        &InferenceType::ALL
    }

    fn direct_alias(&self) -> Option<&'static str> {
        Some("command-")
    }

    fn adapter_mode(&self, _inference_type: InferenceType) -> InferenceType {
        InferenceType::OnDemand
    }

    fn create_adapter(
        &self,
        inference_type: InferenceType,
        params: &ParamsResolver,
    ) -> Arc<dyn VendorAdapter> {
        if inference_type == InferenceType::InferenceProfile {
            warn!("Using the standard Cohere adapter for an inference profile id");
        }
        Arc::new(CohereAdapter::new(params.clone()))
    }
}
