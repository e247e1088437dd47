//! Adapter factory
//!
//! Resolves a model id to a shared adapter instance. The factory owns the
//! strategy registry, the vendor detector and two adapter caches: one adapter
//! per vendor for the legacy family, and one per vendor and effective mode for
//! the per-mode family. The family flag is read on every resolution.

use crate::adapter::VendorAdapter;
use crate::detector::VendorDetector;
use crate::params::ParamsResolver;
use crate::registry::StrategyRegistry;
use crate::vendors::{AmazonAdapter, AnthropicAdapter, CohereAdapter};
use bridgestream_core::identifier;
use bridgestream_core::profile::strip_context_suffix;
use bridgestream_core::{Error, InferenceType, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Vendors served by the legacy family, in fallback search order
const LEGACY_VENDORS: [&str; 3] = ["anthropic", "cohere", "amazon"];

/// Which set of adapters the factory resolves to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterFamily {
    /// One mode-agnostic adapter per vendor
    Legacy,
    /// One adapter per vendor and mode, chosen through the strategy table
    #[default]
    PerMode,
}

impl fmt::Display for AdapterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::PerMode => f.write_str("per_mode"),
        }
    }
}

/// Resolves model ids to cached adapters
#[derive(Debug)]
pub struct AdapterFactory {
    family: RwLock<AdapterFamily>,
    params: ParamsResolver,
    registry: StrategyRegistry,
    detector: VendorDetector,

    /// Per-mode adapters keyed by `"{vendor}:{MODE}"`
    adapters: RwLock<HashMap<String, Arc<dyn VendorAdapter>>>,

    /// Legacy adapters keyed by vendor
    legacy: RwLock<HashMap<String, Arc<dyn VendorAdapter>>>,

    all_adapters: RwLock<Option<Vec<Arc<dyn VendorAdapter>>>>,
}

impl Default for AdapterFactory {
    fn default() -> Self {
        Self::new(ParamsResolver::defaults_only())
    }
}

impl AdapterFactory {
    /// Factory with the built-in strategies and the per-mode family
    pub fn new(params: ParamsResolver) -> Self {
        Self::with_family(AdapterFamily::default(), params)
    }

    pub fn with_family(family: AdapterFamily, params: ParamsResolver) -> Self {
        Self {
            family: RwLock::new(family),
            params,
            registry: StrategyRegistry::with_builtins(),
            detector: VendorDetector::new(),
            adapters: RwLock::new(HashMap::new()),
            legacy: RwLock::new(HashMap::new()),
            all_adapters: RwLock::new(None),
        }
    }

    pub fn adapter_family(&self) -> AdapterFamily {
        *self.family.read()
    }

    /// Switch adapter family; cached adapters are dropped
    pub fn set_adapter_family(&self, family: AdapterFamily) {
        let previous = std::mem::replace(&mut *self.family.write(), family);
        if previous != family {
            info!(from = %previous, to = %family, "Switching adapter family");
        }
        self.clear_cache();
    }

    pub fn params(&self) -> &ParamsResolver {
        &self.params
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn detector(&self) -> &VendorDetector {
        &self.detector
    }

    /// Resolve the adapter that serves a model id
    pub fn get_adapter_for_model(&self, model_id: &str) -> Result<Arc<dyn VendorAdapter>> {
        let vendor = self.detect_vendor(model_id).ok_or_else(|| {
            Error::unsupported_model(format!("Cannot detect vendor for model: {}", model_id))
        })?;

        let strategy = self.registry.get_strategy(&vendor);
        let normalized = match &strategy {
            Some(strategy) => strategy.normalize_model_id(model_id),
            None => model_id.trim().to_string(),
        };
        let inference_type = match &strategy {
            Some(strategy) => strategy.detect_inference_type(&normalized),
            None => identifier::detect_inference_type(&normalized),
        };
        let probe = strip_context_suffix(&normalized);

        debug!(
            model_id = %model_id,
            vendor = %vendor,
            inference_type = %inference_type,
            family = %self.adapter_family(),
            "Resolving adapter"
        );

        let resolved = match self.adapter_family() {
            AdapterFamily::Legacy => self.resolve_legacy(&vendor, probe, inference_type),
            AdapterFamily::PerMode => self.resolve_per_mode(&vendor, probe, inference_type),
        };

        resolved.ok_or_else(|| {
            Error::unsupported_model(format!("No adapter found for model: {}", model_id))
        })
    }

    fn resolve_legacy(
        &self,
        vendor: &str,
        probe: &str,
        inference_type: InferenceType,
    ) -> Option<Arc<dyn VendorAdapter>> {
        if let Ok(adapter) = self.get_adapter(vendor) {
            if accepts(adapter.as_ref(), probe, inference_type) {
                return Some(adapter);
            }
        }

        self.all_adapters()
            .into_iter()
            .find(|adapter| adapter.supports_model(probe))
    }

    fn resolve_per_mode(
        &self,
        vendor: &str,
        probe: &str,
        inference_type: InferenceType,
    ) -> Option<Arc<dyn VendorAdapter>> {
        let strategy = self.registry.get_strategy(vendor)?;
        let adapter = self.create_adapter(vendor, inference_type).ok()?;
        if accepts(adapter.as_ref(), probe, inference_type) {
            return Some(adapter);
        }

        let mut tried = vec![strategy.adapter_mode(inference_type)];
        for &mode in strategy.supported_inference_types() {
            let effective = strategy.adapter_mode(mode);
            if tried.contains(&effective) {
                continue;
            }
            tried.push(effective);

            if let Ok(sibling) = self.create_adapter(vendor, mode) {
                if sibling.supports_model(probe) {
                    debug!(
                        vendor = %vendor,
                        detected = %inference_type,
                        served_by = %sibling.inference_type(),
                        "Model served by sibling adapter"
                    );
                    return Some(sibling);
                }
            }
        }

        None
    }

    /// Per-mode adapter for a vendor and mode
    ///
    /// A mode the vendor's strategy does not support falls back to `ON_DEMAND`.
    pub fn create_adapter(
        &self,
        vendor: &str,
        inference_type: InferenceType,
    ) -> Result<Arc<dyn VendorAdapter>> {
        let strategy = self
            .registry
            .get_strategy(vendor)
            .ok_or_else(|| Error::unsupported_vendor(vendor))?;

        let requested = if strategy.supported_inference_types().contains(&inference_type) {
            inference_type
        } else {
            warn!(
                vendor = %vendor,
                inference_type = %inference_type,
                "Inference type not supported by vendor, falling back to ON_DEMAND"
            );
            InferenceType::OnDemand
        };

        let effective = strategy.adapter_mode(requested);
        let key = cache_key(strategy.vendor(), effective);

        if let Some(adapter) = self.adapters.read().get(&key) {
            metrics::counter!("bridgestream_adapter_cache_hits_total", "cache" => "factory").increment(1);
            return Ok(Arc::clone(adapter));
        }
        metrics::counter!("bridgestream_adapter_cache_misses_total", "cache" => "factory").increment(1);

        let adapter = strategy.create_adapter(requested, &self.params);
        info!(vendor = %strategy.vendor(), mode = %effective, "Created adapter");
        metrics::counter!(
            "bridgestream_adapters_created_total",
            "vendor" => strategy.vendor(),
            "mode" => effective.as_str()
        )
        .increment(1);

        let mut adapters = self.adapters.write();
        Ok(Arc::clone(adapters.entry(key).or_insert(adapter)))
    }

    /// Legacy adapter for a vendor, independent of mode
    pub fn get_adapter(&self, vendor: &str) -> Result<Arc<dyn VendorAdapter>> {
        let vendor = vendor.trim().to_ascii_lowercase();

        if let Some(adapter) = self.legacy.read().get(&vendor) {
            metrics::counter!("bridgestream_adapter_cache_hits_total", "cache" => "factory").increment(1);
            return Ok(Arc::clone(adapter));
        }
        metrics::counter!("bridgestream_adapter_cache_misses_total", "cache" => "factory").increment(1);

        let adapter: Arc<dyn VendorAdapter> = match vendor.as_str() {
            "anthropic" => Arc::new(AnthropicAdapter::legacy(self.params.clone())),
            "amazon" => Arc::new(AmazonAdapter::legacy(self.params.clone())),
            "cohere" => Arc::new(CohereAdapter::new(self.params.clone())),
            _ => return Err(Error::unsupported_vendor(vendor)),
        };
        info!(vendor = %vendor, "Created legacy adapter");

        let mut legacy = self.legacy.write();
        Ok(Arc::clone(legacy.entry(vendor).or_insert(adapter)))
    }

    /// Vendor of a model id: custom rules, classifier, then strategy table
    pub fn detect_vendor(&self, model_id: &str) -> Option<String> {
        self.detector.detect(model_id).or_else(|| {
            self.registry
                .find_strategy_for_model(model_id)
                .map(|strategy| strategy.vendor().to_string())
        })
    }

    pub fn detect_inference_type(&self, model_id: &str) -> InferenceType {
        identifier::detect_inference_type(model_id)
    }

    /// Whether resolution succeeds for a model id
    pub fn is_model_supported(&self, model_id: &str) -> bool {
        self.get_adapter_for_model(model_id).is_ok()
    }

    /// Legacy adapters of every built-in vendor
    pub fn all_adapters(&self) -> Vec<Arc<dyn VendorAdapter>> {
        if let Some(adapters) = self.all_adapters.read().as_ref() {
            return adapters.clone();
        }

        let adapters: Vec<_> = LEGACY_VENDORS
            .iter()
            .filter_map(|vendor| self.get_adapter(vendor).ok())
            .collect();
        *self.all_adapters.write() = Some(adapters.clone());
        adapters
    }

    /// Number of cached adapter instances across both families
    pub fn cached_adapters(&self) -> usize {
        self.adapters.read().len() + self.legacy.read().len()
    }

    /// Drop every cached adapter
    pub fn clear_cache(&self) {
        self.adapters.write().clear();
        self.legacy.write().clear();
        *self.all_adapters.write() = None;
        debug!("Adapter caches cleared");
    }

    /// Clear caches and custom rules, and restore the built-in strategies
    pub fn reset(&self) {
        self.clear_cache();
        self.registry.clear();
        self.detector.reset();
        self.registry.register_builtins();
        info!("Adapter factory reset");
    }
}

fn cache_key(vendor: &str, inference_type: InferenceType) -> String {
    format!("{}:{}", vendor, inference_type)
}

/// Provisioned and cross-region ids are opaque, so their adapter is trusted
fn accepts(adapter: &dyn VendorAdapter, probe: &str, inference_type: InferenceType) -> bool {
    adapter.supports_model(probe)
        || matches!(
            inference_type,
            InferenceType::Provisioned | InferenceType::CrossRegion
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_uses_effective_mode() {
        let factory = AdapterFactory::default();
        let provisioned = factory.create_adapter("anthropic", InferenceType::Provisioned).unwrap();
        let on_demand = factory.create_adapter("ANTHROPIC", InferenceType::OnDemand).unwrap();
        assert!(Arc::ptr_eq(&provisioned, &on_demand));
        assert_eq!(factory.cached_adapters(), 1);
        assert_eq!(cache_key("cohere", InferenceType::OnDemand), "cohere:ON_DEMAND");
    }

    #[test]
    fn test_unknown_vendor() {
        let factory = AdapterFactory::default();
        let err = factory.create_adapter("openai", InferenceType::OnDemand).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVendor(_)));
        assert!(factory.get_adapter("meta").is_err());
    }

    #[test]
    fn test_family_switch_clears_cache() {
        let factory = AdapterFactory::default();
        factory.get_adapter_for_model("anthropic.claude-3-haiku-20240307-v1:0").unwrap();
        assert_eq!(factory.cached_adapters(), 1);

        factory.set_adapter_family(AdapterFamily::Legacy);
        assert_eq!(factory.cached_adapters(), 0);
        assert_eq!(factory.adapter_family(), AdapterFamily::Legacy);
    }

    #[test]
    fn test_all_adapters() {
        let factory = AdapterFactory::default();
        let vendors: Vec<String> = factory
            .all_adapters()
            .iter()
            .map(|a| a.vendor().to_string())
            .collect();
        assert_eq!(vendors, vec!["anthropic", "cohere", "amazon"]);

        factory.clear_cache();
        assert_eq!(factory.cached_adapters(), 0);
    }

    #[test]
    fn test_family_serde() {
        let family: AdapterFamily = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(family, AdapterFamily::Legacy);
        assert_eq!(AdapterFamily::default().to_string(), "per_mode");
    }
}
