//! Recommended generation parameters
//!
//! Adapters resolve each generation parameter through the same chain:
//! explicit caller value, then the model registry's recommendation, then the
//! vendor default. Registry lookups are async and may hit a database, so the
//! formatting hot path only ever reads the [`ParamsResolver`] cache. A miss
//! falls through to the defaults and schedules a background fill.

use async_trait::async_trait;
use bridgestream_core::identifier::{requires_inference_profile, strip_regional_prefix};
use bridgestream_core::{InferenceType, Result, UniversalOptions};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Parameters a model registry recommends for a model
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendedParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl RecommendedParams {
    /// No parameter is recommended
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none() && self.max_tokens.is_none()
    }
}

/// Model capabilities as reported by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    #[serde(default = "default_true")]
    pub streaming: bool,

    #[serde(default)]
    pub vision: bool,

    #[serde(default)]
    pub function_calling: bool,

    #[serde(default = "default_context_window")]
    pub max_context_window: u32,

    #[serde(default = "default_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            streaming: true,
            vision: false,
            function_calling: false,
            max_context_window: default_context_window(),
            max_output_tokens: default_output_tokens(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_context_window() -> u32 {
    128_000
}

fn default_output_tokens() -> u32 {
    4096
}

/// Registry entry for one model id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,

    #[serde(default)]
    pub recommended_params: RecommendedParams,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ModelCapabilities>,

    /// Deployment mode recorded for this model, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_type: Option<InferenceType>,
}

/// Read-only source of model metadata, keyed by model id
///
/// A missing entry is `Ok(None)`, not an error.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn get_model(&self, model_id: &str) -> Result<Option<ModelInfo>>;
}

/// In-memory model registry, typically loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticModelRegistry {
    models: HashMap<String, ModelInfo>,
}

impl StaticModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_models(models: impl IntoIterator<Item = ModelInfo>) -> Self {
        let mut registry = Self::new();
        for model in models {
            registry.insert(model);
        }
        registry
    }

    pub fn insert(&mut self, model: ModelInfo) {
        self.models.insert(model.model_id.clone(), model);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[async_trait]
impl ModelRegistry for StaticModelRegistry {
    async fn get_model(&self, model_id: &str) -> Result<Option<ModelInfo>> {
        Ok(self.models.get(model_id).cloned())
    }
}

/// Hardcoded per-vendor fallbacks, the last link of the resolution chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VendorDefaults {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl VendorDefaults {
    pub const ANTHROPIC: Self = Self {
        temperature: 1.0,
        top_p: 0.999,
        max_tokens: 4096,
    };

    pub const AMAZON: Self = Self {
        temperature: 0.7,
        top_p: 0.9,
        max_tokens: 2048,
    };

    pub const COHERE: Self = Self {
        temperature: 0.3,
        top_p: 0.75,
        max_tokens: 2048,
    };

    /// Defaults for a vendor; unknown vendors get the Amazon values
    pub fn for_vendor(vendor: &str) -> Self {
        match vendor.to_ascii_lowercase().as_str() {
            "anthropic" => Self::ANTHROPIC,
            "cohere" => Self::COHERE,
            _ => Self::AMAZON,
        }
    }
}

/// Fully resolved generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

/// Resolves generation parameters against a shared advisory cache
///
/// Cloning is cheap; clones share the cache and the registry handle.
#[derive(Clone, Default)]
pub struct ParamsResolver {
    registry: Option<Arc<dyn ModelRegistry>>,
    cache: Arc<RwLock<HashMap<String, RecommendedParams>>>,
    inflight: Arc<Mutex<HashSet<String>>>,
}

impl fmt::Debug for ParamsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamsResolver")
            .field("has_registry", &self.registry.is_some())
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl ParamsResolver {
    /// Resolver backed by a model registry
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            registry: Some(registry),
            ..Self::default()
        }
    }

    /// Resolver that only ever applies explicit values and vendor defaults
    pub fn defaults_only() -> Self {
        Self::default()
    }

    /// Apply the resolution chain for one request
    ///
    /// Never blocks: the registry link is read from the cache only.
    pub fn resolve(&self, defaults: VendorDefaults, options: &UniversalOptions) -> ResolvedParams {
        let fully_explicit =
            options.temperature.is_some() && options.top_p.is_some() && options.max_tokens.is_some();

        let recommended = match (&options.model_id, fully_explicit) {
            (Some(model_id), false) => self.recommended(model_id).unwrap_or_default(),
            _ => RecommendedParams::default(),
        };

        ResolvedParams {
            temperature: options
                .temperature
                .or(recommended.temperature)
                .unwrap_or(defaults.temperature),
            top_p: options.top_p.or(recommended.top_p).unwrap_or(defaults.top_p),
            max_tokens: options
                .max_tokens
                .or(recommended.max_tokens)
                .unwrap_or(defaults.max_tokens),
        }
    }

    /// Cached recommendation for a model, scheduling a fill on a miss
    pub fn recommended(&self, model_id: &str) -> Option<RecommendedParams> {
        if let Some(params) = self.cached(model_id) {
            debug!(model_id = %model_id, "Recommended params cache hit");
            return (!params.is_empty()).then_some(params);
        }

        metrics::counter!("bridgestream_params_cache_misses_total").increment(1);
        self.schedule_fill(model_id);
        None
    }

    /// Read the cache without triggering a lookup
    pub fn cached(&self, model_id: &str) -> Option<RecommendedParams> {
        self.cache.read().get(model_id).copied()
    }

    /// Look up a model, trying the id and then its base id without a regional prefix
    pub async fn lookup(&self, model_id: &str) -> Result<RecommendedParams> {
        if let Some(params) = self.cached(model_id) {
            return Ok(params);
        }

        let Some(registry) = &self.registry else {
            return Ok(RecommendedParams::default());
        };

        match fetch_recommended(registry.as_ref(), model_id).await {
            Ok(found) => {
                debug!(model_id = %model_id, found = !found.is_empty(), "Recommended params loaded");
                self.cache.write().insert(model_id.to_string(), found);
                Ok(found)
            }
            Err(e) => {
                // Defaults stand in until the cache is cleared
                warn!(model_id = %model_id, error = %e, "Model registry lookup failed, caching defaults");
                self.cache
                    .write()
                    .insert(model_id.to_string(), RecommendedParams::default());
                Err(e)
            }
        }
    }

    /// Fill the cache ahead of the hot path; returns how many models had recommendations
    pub async fn prewarm<I, S>(&self, model_ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut loaded = 0;
        for model_id in model_ids {
            let model_id = model_id.as_ref();
            match self.lookup(model_id).await {
                Ok(params) if !params.is_empty() => loaded += 1,
                Ok(_) => {}
                Err(e) => debug!(model_id = %model_id, error = %e, "Failed to prewarm params"),
            }
        }
        loaded
    }

    /// Capabilities of a model, falling back to conservative defaults
    pub async fn capabilities(&self, model_id: &str) -> ModelCapabilities {
        match self.model_info(model_id).await {
            Some(info) => info.capabilities.unwrap_or_default(),
            None => ModelCapabilities::default(),
        }
    }

    /// Whether a model must be invoked through an inference profile
    ///
    /// Id shape decides first; otherwise the registry's recorded mode.
    pub async fn requires_inference_profile(&self, model_id: &str) -> bool {
        if requires_inference_profile(model_id) {
            return true;
        }
        self.model_info(model_id)
            .await
            .and_then(|info| info.inference_type)
            .map(|mode| mode == InferenceType::InferenceProfile)
            .unwrap_or(false)
    }

    /// Drop every cached recommendation
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    async fn model_info(&self, model_id: &str) -> Option<ModelInfo> {
        let registry = self.registry.as_ref()?;
        match registry.get_model(model_id).await {
            Ok(info) => info,
            Err(e) => {
                warn!(model_id = %model_id, error = %e, "Model registry lookup failed");
                None
            }
        }
    }

    fn schedule_fill(&self, model_id: &str) {
        if self.registry.is_none() {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(model_id = %model_id, "No async runtime, skipping background params lookup");
            return;
        };

        if !self.inflight.lock().insert(model_id.to_string()) {
            return;
        }

        let resolver = self.clone();
        let model_id = model_id.to_string();
        handle.spawn(async move {
            if let Err(e) = resolver.lookup(&model_id).await {
                debug!(model_id = %model_id, error = %e, "Background params lookup failed");
            }
            resolver.inflight.lock().remove(&model_id);
        });
    }
}

async fn fetch_recommended(
    registry: &dyn ModelRegistry,
    model_id: &str,
) -> Result<RecommendedParams> {
    for candidate in candidate_ids(model_id) {
        if let Some(info) = registry.get_model(candidate).await? {
            if !info.recommended_params.is_empty() {
                return Ok(info.recommended_params);
            }
        }
    }
    Ok(RecommendedParams::default())
}

fn candidate_ids(model_id: &str) -> Vec<&str> {
    let base = strip_regional_prefix(model_id);
    if base == model_id {
        vec![model_id]
    } else {
        vec![model_id, base]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(model_id: &str, params: RecommendedParams) -> Arc<dyn ModelRegistry> {
        Arc::new(StaticModelRegistry::from_models([ModelInfo {
            model_id: model_id.to_string(),
            recommended_params: params,
            ..ModelInfo::default()
        }]))
    }

    #[test]
    fn test_defaults_when_nothing_known() {
        let resolver = ParamsResolver::defaults_only();
        let resolved = resolver.resolve(
            VendorDefaults::COHERE,
            &UniversalOptions::for_model("cohere.command-r-v1:0"),
        );
        assert_eq!(resolved.temperature, 0.3);
        assert_eq!(resolved.top_p, 0.75);
        assert_eq!(resolved.max_tokens, 2048);
    }

    #[tokio::test]
    async fn test_registry_then_explicit() {
        let registry = registry_with(
            "anthropic.claude-3-haiku-20240307-v1:0",
            RecommendedParams {
                temperature: Some(0.4),
                top_p: None,
                max_tokens: Some(1000),
            },
        );
        let resolver = ParamsResolver::new(registry);
        assert_eq!(resolver.prewarm(["anthropic.claude-3-haiku-20240307-v1:0"]).await, 1);

        let options = UniversalOptions::for_model("anthropic.claude-3-haiku-20240307-v1:0");
        let resolved = resolver.resolve(VendorDefaults::ANTHROPIC, &options);
        assert_eq!(resolved.temperature, 0.4);
        assert_eq!(resolved.top_p, 0.999);
        assert_eq!(resolved.max_tokens, 1000);

        let resolved = resolver.resolve(VendorDefaults::ANTHROPIC, &options.with_temperature(0.9));
        assert_eq!(resolved.temperature, 0.9);
        assert_eq!(resolved.max_tokens, 1000);
    }

    #[tokio::test]
    async fn test_regional_id_falls_back_to_base_id() {
        let registry = registry_with(
            "amazon.nova-pro-v1:0",
            RecommendedParams {
                temperature: Some(0.1),
                ..RecommendedParams::default()
            },
        );
        let resolver = ParamsResolver::new(registry);

        let params = resolver.lookup("us.amazon.nova-pro-v1:0").await.unwrap();
        assert_eq!(params.temperature, Some(0.1));
        assert_eq!(resolver.cached("us.amazon.nova-pro-v1:0"), Some(params));
    }

    #[tokio::test]
    async fn test_miss_schedules_background_fill() {
        let registry = registry_with(
            "cohere.command-r-v1:0",
            RecommendedParams {
                max_tokens: Some(512),
                ..RecommendedParams::default()
            },
        );
        let resolver = ParamsResolver::new(registry);

        // First call never blocks on the registry
        assert!(resolver.recommended("cohere.command-r-v1:0").is_none());

        for _ in 0..50 {
            if resolver.cached("cohere.command-r-v1:0").is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let params = resolver.recommended("cohere.command-r-v1:0").unwrap();
        assert_eq!(params.max_tokens, Some(512));
    }

    #[test]
    fn test_miss_without_runtime_is_silent() {
        let resolver = ParamsResolver::new(registry_with("x", RecommendedParams::default()));
        assert!(resolver.recommended("x").is_none());
        assert_eq!(resolver.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_capabilities_and_profile_requirement() {
        let registry: Arc<dyn ModelRegistry> = Arc::new(StaticModelRegistry::from_models([
            ModelInfo {
                model_id: "amazon.nova-pro-v1:0".to_string(),
                capabilities: Some(ModelCapabilities {
                    vision: true,
                    ..ModelCapabilities::default()
                }),
                inference_type: Some(InferenceType::InferenceProfile),
                ..ModelInfo::default()
            },
        ]));
        let resolver = ParamsResolver::new(registry);

        assert!(resolver.capabilities("amazon.nova-pro-v1:0").await.vision);
        assert_eq!(
            resolver.capabilities("unknown").await,
            ModelCapabilities::default()
        );
        assert!(resolver.requires_inference_profile("amazon.nova-pro-v1:0").await);
        assert!(resolver.requires_inference_profile("anthropic.claude-opus-4-20250514-v1:0").await);
        assert!(!resolver.requires_inference_profile("amazon.titan-text-lite-v1").await);
    }
}
