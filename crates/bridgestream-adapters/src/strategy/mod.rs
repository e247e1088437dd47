//! Vendor strategies
//!
//! A strategy owns one vendor's id rules: whether it can handle an id, which
//! mode the id addresses, how to normalize it, and which adapter serves each
//! mode. Strategies are registered with a priority in the
//! [`StrategyRegistry`](crate::registry::StrategyRegistry).

pub mod amazon;
pub mod anthropic;
pub mod cohere;

pub use amazon::AmazonStrategy;
pub use anthropic::AnthropicStrategy;
pub use cohere::CohereStrategy;

use crate::adapter::VendorAdapter;
use crate::params::ParamsResolver;
use bridgestream_core::identifier::{
    detect_inference_type, detect_vendor_in_arn, is_arn, strip_regional_prefix,
};
use bridgestream_core::InferenceType;
use std::fmt::Debug;
use std::sync::Arc;

/// Per-vendor classification and adapter construction rules
pub trait VendorStrategy: Send + Sync + Debug {
    /// Vendor key, lowercase
    fn vendor(&self) -> &'static str;

    /// Modes this vendor can be invoked in
    fn supported_inference_types(&self) -> &[InferenceType];

    /// Bare alias used by the vendor's direct API, such as `claude-`
    fn direct_alias(&self) -> Option<&'static str> {
        None
    }

    /// Whether this strategy recognizes the id as belonging to its vendor
    ///
    /// Accepts `{vendor}.` and `{vendor}:` ids with or without a regional
    /// prefix, the direct alias, and Bedrock ARNs naming the vendor.
    fn can_handle(&self, model_id: &str) -> bool {
        let lowered = model_id.trim().to_ascii_lowercase();
        let vendor = self.vendor();

        if is_arn(&lowered) {
            return detect_vendor_in_arn(&lowered) == Some(vendor);
        }

        let base = strip_regional_prefix(&lowered);
        let prefixed = base
            .strip_prefix(vendor)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with(':'));

        prefixed || self.direct_alias().is_some_and(|alias| base.starts_with(alias))
    }

    fn detect_inference_type(&self, model_id: &str) -> InferenceType {
        detect_inference_type(model_id)
    }

    /// Mode whose adapter serves a detected mode
    ///
    /// Provisioned and cross-region ids are served by the on-demand adapter.
    fn adapter_mode(&self, inference_type: InferenceType) -> InferenceType {
        match inference_type {
            InferenceType::Provisioned | InferenceType::CrossRegion => InferenceType::OnDemand,
            other => other,
        }
    }

    /// Build the adapter for an effective mode
    fn create_adapter(
        &self,
        inference_type: InferenceType,
        params: &ParamsResolver,
    ) -> Arc<dyn VendorAdapter>;

    fn validate_model_id(&self, model_id: &str) -> bool {
        !model_id.trim().is_empty() && self.can_handle(model_id)
    }

    /// Canonicalize an id
    ///
    /// Rewrites a `{vendor}:` separator to `{vendor}.` and qualifies the bare
    /// direct alias. Version colons are left alone. Idempotent.
    fn normalize_model_id(&self, model_id: &str) -> String {
        let trimmed = model_id.trim();
        let vendor = self.vendor();

        if let Some(head) = trimmed.get(..vendor.len() + 1) {
            if head.eq_ignore_ascii_case(&format!("{}:", vendor)) {
                return format!("{}.{}", vendor, &trimmed[vendor.len() + 1..]);
            }
        }

        if let Some(alias) = self.direct_alias() {
            if trimmed.to_ascii_lowercase().starts_with(alias) && !trimmed.contains('.') {
                return format!("{}.{}", vendor, trimmed);
            }
        }

        trimmed.to_string()
    }
}

/// A strategy and the priority it is registered with
#[derive(Debug, Clone)]
pub struct StrategyRegistration {
    pub vendor: String,
    pub strategy: Arc<dyn VendorStrategy>,
    pub priority: i32,
}

impl StrategyRegistration {
    /// Register a strategy under its own vendor key
    pub fn new(strategy: Arc<dyn VendorStrategy>, priority: i32) -> Self {
        Self {
            vendor: strategy.vendor().to_string(),
            strategy,
            priority,
        }
    }
}

/// Built-in strategies with their default priorities
pub fn builtin_strategies() -> Vec<StrategyRegistration> {
    vec![
        StrategyRegistration::new(Arc::new(AnthropicStrategy), 100),
        StrategyRegistration::new(Arc::new(AmazonStrategy), 90),
        StrategyRegistration::new(Arc::new(CohereStrategy), 80),
    ]
}
