//! Strategy registry
//!
//! Holds one [`VendorStrategy`] per vendor together with its priority. The
//! detection order is kept sorted by descending priority; equal priorities
//! keep registration order.

use crate::strategy::{builtin_strategies, StrategyRegistration, VendorStrategy};
use bridgestream_core::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Priority-ordered table of vendor strategies
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    /// Registrations in detection order
    entries: RwLock<Vec<StrategyRegistration>>,
}

/// Snapshot of the registry contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStats {
    pub total_strategies: usize,
    pub vendors: Vec<String>,
    pub average_priority: f64,
    pub detection_order: Vec<String>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in strategies
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    pub(crate) fn register_builtins(&self) {
        for registration in builtin_strategies() {
            // Built-in vendors are never empty
            let _ = self.register(registration);
        }
    }

    /// Register a strategy
    ///
    /// An existing registration with a strictly higher priority is kept and
    /// the call is a logged no-op.
    pub fn register(&self, registration: StrategyRegistration) -> Result<()> {
        let vendor = registration.vendor.trim().to_ascii_lowercase();
        if vendor.is_empty() {
            return Err(Error::registry("Strategy vendor must not be empty"));
        }

        let mut entries = self.entries.write();
        if let Some(position) = entries.iter().position(|e| e.vendor == vendor) {
            let existing = entries[position].priority;
            if existing > registration.priority {
                warn!(
                    vendor = %vendor,
                    existing_priority = existing,
                    priority = registration.priority,
                    "Strategy already registered with higher priority, skipping"
                );
                return Ok(());
            }
            entries.remove(position);
        }

        info!(vendor = %vendor, priority = registration.priority, "Registered vendor strategy");
        entries.push(StrategyRegistration {
            vendor,
            ..registration
        });
        entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    /// Remove a vendor; returns whether it was registered
    pub fn unregister(&self, vendor: &str) -> bool {
        let vendor = vendor.to_ascii_lowercase();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.vendor != vendor);
        let removed = entries.len() != before;
        if removed {
            info!(vendor = %vendor, "Unregistered vendor strategy");
        }
        removed
    }

    pub fn get_strategy(&self, vendor: &str) -> Option<Arc<dyn VendorStrategy>> {
        let vendor = vendor.to_ascii_lowercase();
        self.entries
            .read()
            .iter()
            .find(|e| e.vendor == vendor)
            .map(|e| Arc::clone(&e.strategy))
    }

    /// First strategy in detection order that can handle the id
    pub fn find_strategy_for_model(&self, model_id: &str) -> Option<Arc<dyn VendorStrategy>> {
        let found = self
            .entries
            .read()
            .iter()
            .find(|e| e.strategy.can_handle(model_id))
            .map(|e| Arc::clone(&e.strategy));

        debug!(model_id = %model_id, vendor = ?found.as_ref().map(|s| s.vendor()), "Strategy lookup");
        found
    }

    /// Registered vendors in detection order
    pub fn vendors(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.vendor.clone()).collect()
    }

    pub fn is_vendor_supported(&self, vendor: &str) -> bool {
        self.get_strategy(vendor).is_some()
    }

    pub fn priority(&self, vendor: &str) -> Option<i32> {
        let vendor = vendor.to_ascii_lowercase();
        self.entries
            .read()
            .iter()
            .find(|e| e.vendor == vendor)
            .map(|e| e.priority)
    }

    pub fn detection_order(&self) -> Vec<String> {
        self.vendors()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Structural problems with the current registrations
    pub fn validate(&self) -> Vec<String> {
        let entries = self.entries.read();
        let mut problems = Vec::new();

        if entries.is_empty() {
            problems.push("No strategies registered".to_string());
        }

        for entry in entries.iter() {
            if entry.strategy.vendor() != entry.vendor {
                problems.push(format!(
                    "Strategy for '{}' reports vendor '{}'",
                    entry.vendor,
                    entry.strategy.vendor()
                ));
            }
            if entry.strategy.supported_inference_types().is_empty() {
                problems.push(format!("Strategy '{}' supports no inference types", entry.vendor));
            }
        }

        problems
    }

    pub fn stats(&self) -> RegistryStats {
        let entries = self.entries.read();
        let total = entries.len();
        let average_priority = if total == 0 {
            0.0
        } else {
            entries.iter().map(|e| f64::from(e.priority)).sum::<f64>() / total as f64
        };
        let vendors: Vec<String> = entries.iter().map(|e| e.vendor.clone()).collect();

        RegistryStats {
            total_strategies: total,
            detection_order: vendors.clone(),
            vendors,
            average_priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::VendorAdapter;
    use crate::params::ParamsResolver;
    use crate::strategy::{AmazonStrategy, AnthropicStrategy, CohereStrategy};
    use bridgestream_core::InferenceType;

    #[derive(Debug)]
    struct NamedStrategy(&'static str);

    impl VendorStrategy for NamedStrategy {
        fn vendor(&self) -> &'static str {
            self.0
        }

        fn supported_inference_types(&self) -> &[InferenceType] {
            &[]
        }

        fn create_adapter(
            &self,
            inference_type: InferenceType,
            params: &ParamsResolver,
        ) -> Arc<dyn VendorAdapter> {
            AnthropicStrategy.create_adapter(inference_type, params)
        }
    }

    #[test]
    fn test_detection_order_by_priority() {
        let registry = StrategyRegistry::new();
        registry.register(StrategyRegistration::new(Arc::new(CohereStrategy), 10)).unwrap();
        registry.register(StrategyRegistration::new(Arc::new(AnthropicStrategy), 50)).unwrap();
        registry.register(StrategyRegistration::new(Arc::new(AmazonStrategy), 10)).unwrap();

        assert_eq!(registry.detection_order(), vec!["anthropic", "cohere", "amazon"]);
    }

    #[test]
    fn test_lower_priority_does_not_replace() {
        let registry = StrategyRegistry::with_builtins();
        registry.register(StrategyRegistration::new(Arc::new(AnthropicStrategy), 1)).unwrap();
        assert_eq!(registry.priority("anthropic"), Some(100));

        registry.register(StrategyRegistration::new(Arc::new(AnthropicStrategy), 100)).unwrap();
        registry.register(StrategyRegistration::new(Arc::new(CohereStrategy), 500)).unwrap();
        assert_eq!(registry.priority("COHERE"), Some(500));
        assert_eq!(registry.detection_order()[0], "cohere");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_empty_vendor_rejected() {
        let registry = StrategyRegistry::new();
        let registration = StrategyRegistration {
            vendor: "  ".to_string(),
            strategy: Arc::new(AnthropicStrategy),
            priority: 1,
        };
        assert!(registry.register(registration).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_strategy_for_model() {
        let registry = StrategyRegistry::with_builtins();
        let strategy = registry.find_strategy_for_model("us.amazon.nova-pro-v1:0").unwrap();
        assert_eq!(strategy.vendor(), "amazon");
        assert_eq!(
            registry.find_strategy_for_model("command-r").unwrap().vendor(),
            "cohere"
        );
        assert!(registry.find_strategy_for_model("unknown.model-v1:0").is_none());
    }

    #[test]
    fn test_unregister_and_clear() {
        let registry = StrategyRegistry::with_builtins();
        assert!(registry.unregister("Cohere"));
        assert!(!registry.unregister("cohere"));
        assert!(!registry.is_vendor_supported("cohere"));
        registry.clear();
        assert_eq!(registry.validate(), vec!["No strategies registered".to_string()]);
    }

    #[test]
    fn test_validate_and_stats() {
        let registry = StrategyRegistry::with_builtins();
        assert!(registry.validate().is_empty());

        registry
            .register(StrategyRegistration {
                vendor: "meta".to_string(),
                strategy: Arc::new(NamedStrategy("llama")),
                priority: 0,
            })
            .unwrap();
        let problems = registry.validate();
        assert_eq!(problems.len(), 2);

        let stats = registry.stats();
        assert_eq!(stats.total_strategies, 4);
        assert_eq!(stats.average_priority, 67.5);
        assert_eq!(stats.detection_order.last().map(String::as_str), Some("meta"));
    }
}
