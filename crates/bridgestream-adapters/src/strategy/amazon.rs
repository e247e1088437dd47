//! Amazon strategy

use super::VendorStrategy;
use crate::adapter::VendorAdapter;
use crate::params::ParamsResolver;
use crate::vendors::AmazonAdapter;
use bridgestream_core::InferenceType;
use std::sync::Arc;
use tracing::debug;

/// Nova and Titan models
#[derive(Debug, Clone, Copy, Default)]
pub struct AmazonStrategy;

impl VendorStrategy for AmazonStrategy {
    fn vendor(&self) -> &'static str {
        "amazon"
    }

    fn supported_inference_types(&self) -> &[InferenceType] {
        &InferenceType::ALL
    }

    fn create_adapter(
        &self,
        inference_type: InferenceType,
        params: &ParamsResolver,
    ) -> Arc<dyn VendorAdapter> {
        debug!(inference_type = %inference_type, "Creating Amazon adapter");
        match self.adapter_mode(inference_type) {
            InferenceType::InferenceProfile => {
                Arc::new(AmazonAdapter::inference_profile(params.clone()))
            }
            _ => Arc::new(AmazonAdapter::on_demand(params.clone())),
        }
    }
}
