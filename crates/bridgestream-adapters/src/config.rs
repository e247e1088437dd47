//! Adapter layer configuration

use crate::detector::DetectionRule;
use crate::factory::{AdapterFactory, AdapterFamily};
use crate::loader::{AdapterLoader, LoaderBuilder, LoaderConfig};
use crate::params::{ModelInfo, ParamsResolver, StaticModelRegistry};
use bridgestream_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Environment variable prefix for layered configuration
pub const ENV_PREFIX: &str = "BRIDGESTREAM";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub factory: FactoryConfig,

    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub params: ParamsSettings,

    /// Static model registry entries
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Factory configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    #[serde(default)]
    pub adapter_family: AdapterFamily,

    /// Custom vendor detection rules
    #[serde(default)]
    pub detection_rules: Vec<DetectionRuleConfig>,
}

/// A detection rule as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRuleConfig {
    pub pattern: String,
    pub vendor: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DetectionRuleConfig {
    pub fn compile(&self) -> Result<DetectionRule> {
        let rule = DetectionRule::new(&self.pattern, &self.vendor, self.priority)?;
        Ok(match &self.description {
            Some(description) => rule.with_description(description),
            None => rule,
        })
    }
}

/// Recommended-parameter settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsSettings {
    /// Model ids whose recommendations are fetched at startup
    #[serde(default)]
    pub prewarm_models: Vec<String>,
}

impl BridgeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Load a file and overlay `BRIDGESTREAM__*` environment variables
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| Error::config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::config(e.to_string()))
    }

    pub fn model_registry(&self) -> StaticModelRegistry {
        StaticModelRegistry::from_models(self.models.iter().cloned())
    }

    /// Resolver backed by the configured models, or defaults only when none are listed
    pub fn params_resolver(&self) -> ParamsResolver {
        if self.models.is_empty() {
            ParamsResolver::defaults_only()
        } else {
            ParamsResolver::new(Arc::new(self.model_registry()))
        }
    }

    /// Fetch recommendations for `params.prewarm_models`
    pub async fn prewarm_params(&self, params: &ParamsResolver) -> usize {
        params.prewarm(&self.params.prewarm_models).await
    }

    pub fn build_factory(&self, params: ParamsResolver) -> Result<AdapterFactory> {
        let factory = AdapterFactory::with_family(self.factory.adapter_family, params);
        for rule in &self.factory.detection_rules {
            factory.detector().add_rule(rule.compile()?);
        }

        info!(
            adapter_family = %self.factory.adapter_family,
            detection_rules = self.factory.detection_rules.len(),
            "Adapter factory configured"
        );
        Ok(factory)
    }

    /// Loader with the built-in constructors; configured preloads run here
    pub fn build_loader(&self, params: ParamsResolver) -> Result<AdapterLoader> {
        LoaderBuilder::new()
            .with_config(self.loader.clone())
            .with_params(params)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgestream_core::InferenceType;
    use std::io::Write;

    const SAMPLE: &str = r#"
factory:
  adapter_family: legacy
  detection_rules:
    - pattern: "^acme-"
      vendor: cohere
      priority: 10
      description: Acme models run on Command
loader:
  cache_ttl_ms: null
  strict_validation: true
  prewarm:
    - { vendor: anthropic, inference_type: INFERENCE_PROFILE }
params:
  prewarm_models: [anthropic.claude-3-5-sonnet-20241022-v2:0]
models:
  - model_id: anthropic.claude-3-5-sonnet-20241022-v2:0
    recommended_params: { temperature: 0.5, max_tokens: 8192 }
"#;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.factory.adapter_family, AdapterFamily::PerMode);
        assert_eq!(config.loader, LoaderConfig::default());
        assert_eq!(config.loader.cache_ttl_ms, Some(60_000));
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_parse_sample() {
        let config = BridgeConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.factory.adapter_family, AdapterFamily::Legacy);
        assert_eq!(config.loader.cache_ttl_ms, None);
        assert!(config.loader.strict_validation);
        assert!(config.loader.enable_cache);
        assert_eq!(config.loader.prewarm[0].inference_type, InferenceType::InferenceProfile);
        assert_eq!(config.models[0].recommended_params.max_tokens, Some(8192));
        assert_eq!(config.model_registry().len(), 1);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = BridgeConfig::from_yaml_str("factory: { adapter_family: hybrid }").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_build_components() {
        let config = BridgeConfig::from_yaml_str(SAMPLE).unwrap();
        let factory = config.build_factory(config.params_resolver()).unwrap();
        assert_eq!(factory.adapter_family(), AdapterFamily::Legacy);
        assert_eq!(factory.detect_vendor("acme-large").as_deref(), Some("cohere"));

        let loader = config.build_loader(ParamsResolver::defaults_only()).unwrap();
        assert_eq!(loader.stats().cache_size, 1);
    }

    #[test]
    fn test_bad_detection_rule() {
        let mut config = BridgeConfig::default();
        config.factory.detection_rules.push(DetectionRuleConfig {
            pattern: "([".to_string(),
            vendor: "amazon".to_string(),
            priority: 0,
            description: None,
        });
        assert!(config.build_factory(ParamsResolver::defaults_only()).is_err());
    }

    #[tokio::test]
    async fn test_prewarm_params() {
        let config = BridgeConfig::from_yaml_str(SAMPLE).unwrap();
        let params = config.params_resolver();
        assert_eq!(config.prewarm_params(&params).await, 1);
        assert_eq!(
            params.cached("anthropic.claude-3-5-sonnet-20241022-v2:0").and_then(|p| p.temperature),
            Some(0.5)
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.models.len(), 1);

        assert!(BridgeConfig::from_file(file.path().with_extension("missing")).is_err());
    }

    #[test]
    fn test_from_file_with_env() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"factory:\n  adapter_family: per_mode\n").unwrap();

        std::env::set_var("BRIDGESTREAM__FACTORY__ADAPTER_FAMILY", "legacy");
        let config = BridgeConfig::from_file_with_env(file.path());
        std::env::remove_var("BRIDGESTREAM__FACTORY__ADAPTER_FAMILY");

        let config = config.unwrap();
        assert_eq!(config.factory.adapter_family, AdapterFamily::Legacy);
        assert!(config.loader.enable_cache);
    }
}
