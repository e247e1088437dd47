//! Adapter loader
//!
//! Explicit-construction alternative to the factory: callers register one
//! constructor per `(vendor, mode)` and the loader caches the instances it
//! builds, optionally expiring them after a TTL and validating them on load.

use crate::adapter::VendorAdapter;
use crate::params::ParamsResolver;
use crate::strategy::builtin_strategies;
use crate::validator::AdapterValidator;
use bridgestream_core::{Error, InferenceType, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Builds a fresh adapter instance
pub type AdapterConstructor = Arc<dyn Fn() -> Arc<dyn VendorAdapter> + Send + Sync>;

/// Loader behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Cache entry lifetime; `None` keeps entries until cleared
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: Option<u64>,

    #[serde(default = "default_true")]
    pub validate_after_load: bool,

    /// Fail loads whose adapter does not validate, instead of logging
    #[serde(default)]
    pub strict_validation: bool,

    /// Adapters to build ahead of the first request
    #[serde(default)]
    pub prewarm: Vec<PreloadTarget>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_ttl_ms: default_cache_ttl_ms(),
            validate_after_load: true,
            strict_validation: false,
            prewarm: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_ms() -> Option<u64> {
    Some(60_000)
}

/// A `(vendor, mode)` pair to preload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadTarget {
    pub vendor: String,
    pub inference_type: InferenceType,
}

/// Loader counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoaderStats {
    pub total_factories: usize,
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
}

struct CacheEntry {
    adapter: Arc<dyn VendorAdapter>,
    loaded_at: Instant,
}

/// Loads adapters from registered constructors
pub struct AdapterLoader {
    config: LoaderConfig,
    validator: AdapterValidator,
    factories: RwLock<HashMap<String, AdapterConstructor>>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl fmt::Debug for AdapterLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterLoader")
            .field("config", &self.config)
            .field("factories", &self.factories.read().keys().collect::<Vec<_>>())
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl AdapterLoader {
    /// Empty loader with no constructors
    pub fn new(config: LoaderConfig) -> Result<Self> {
        Ok(Self {
            config,
            validator: AdapterValidator::new()?,
            factories: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Loader with a constructor for every built-in vendor and supported mode
    pub fn with_builtin_factories(config: LoaderConfig, params: ParamsResolver) -> Result<Self> {
        let loader = Self::new(config)?;
        for registration in builtin_strategies() {
            for &mode in registration.strategy.supported_inference_types() {
                let strategy = Arc::clone(&registration.strategy);
                let params = params.clone();
                loader.register_factory(&registration.vendor, mode, move || {
                    strategy.create_adapter(mode, &params)
                });
            }
        }
        Ok(loader)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn register_factory<F>(&self, vendor: &str, inference_type: InferenceType, factory: F)
    where
        F: Fn() -> Arc<dyn VendorAdapter> + Send + Sync + 'static,
    {
        let key = cache_key(vendor, inference_type);
        debug!(key = %key, "Registered adapter factory");
        self.factories.write().insert(key, Arc::new(factory));
    }

    /// Remove a constructor and its cached instance
    pub fn unregister_factory(&self, vendor: &str, inference_type: InferenceType) -> bool {
        let key = cache_key(vendor, inference_type);
        let existed = self.factories.write().remove(&key).is_some();
        if existed {
            self.cache.write().remove(&key);
            debug!(key = %key, "Unregistered adapter factory");
        }
        existed
    }

    pub fn has_factory(&self, vendor: &str, inference_type: InferenceType) -> bool {
        self.factories.read().contains_key(&cache_key(vendor, inference_type))
    }

    /// Load an adapter, from cache when enabled and fresh
    pub fn load(&self, vendor: &str, inference_type: InferenceType) -> Result<Arc<dyn VendorAdapter>> {
        let key = cache_key(vendor, inference_type);

        if self.config.enable_cache {
            if let Some(adapter) = self.cached(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("bridgestream_adapter_cache_hits_total", "cache" => "loader").increment(1);
                debug!(key = %key, "Adapter loaded from cache");
                return Ok(adapter);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("bridgestream_adapter_cache_misses_total", "cache" => "loader").increment(1);

        let factory = self
            .factories
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::unsupported_vendor(format!("No factory registered for {}", key)))?;

        let adapter = factory();
        info!(key = %key, adapter = %adapter.display_name(), "Created adapter");

        if self.config.validate_after_load {
            self.check(adapter.as_ref(), vendor, inference_type)?;
        }

        if self.config.enable_cache {
            self.cache.write().insert(
                key,
                CacheEntry {
                    adapter: Arc::clone(&adapter),
                    loaded_at: Instant::now(),
                },
            );
        }

        Ok(adapter)
    }

    /// Load ahead of time; failures are logged, not returned
    pub fn preload(&self, vendor: &str, inference_type: InferenceType) -> bool {
        match self.load(vendor, inference_type) {
            Ok(_) => {
                debug!(vendor = %vendor, inference_type = %inference_type, "Adapter preloaded");
                true
            }
            Err(e) => {
                warn!(vendor = %vendor, inference_type = %inference_type, error = %e, "Failed to preload adapter");
                false
            }
        }
    }

    /// Preload several pairs; returns how many loaded
    pub fn preload_batch<'a, I>(&self, targets: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, InferenceType)>,
    {
        targets
            .into_iter()
            .filter(|(vendor, inference_type)| self.preload(vendor, *inference_type))
            .count()
    }

    /// Preload the pairs listed in the configuration
    pub fn preload_configured(&self) -> usize {
        let targets = self.config.prewarm.clone();
        self.preload_batch(
            targets
                .iter()
                .map(|target| (target.vendor.as_str(), target.inference_type)),
        )
    }

    /// Drop one cached instance, or all of them
    pub fn clear_cache(&self, target: Option<(&str, InferenceType)>) {
        match target {
            Some((vendor, inference_type)) => {
                self.cache.write().remove(&cache_key(vendor, inference_type));
            }
            None => self.cache.write().clear(),
        }
        debug!(target = ?target, "Loader cache cleared");
    }

    pub fn stats(&self) -> LoaderStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        LoaderStats {
            total_factories: self.factories.read().len(),
            cache_size: self.cache.read().len(),
            cache_hits: hits,
            cache_misses: misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }

    fn cached(&self, key: &str) -> Option<Arc<dyn VendorAdapter>> {
        let ttl = self.config.cache_ttl_ms.map(Duration::from_millis);
        {
            let cache = self.cache.read();
            let entry = cache.get(key)?;
            match ttl {
                Some(ttl) if entry.loaded_at.elapsed() >= ttl => {}
                _ => return Some(Arc::clone(&entry.adapter)),
            }
        }

        if let Some(ttl) = ttl {
            self.evict_expired(key, ttl);
        }
        None
    }

    /// Remove an entry only if it is still expired under the write lock
    fn evict_expired(&self, key: &str, ttl: Duration) -> bool {
        let mut cache = self.cache.write();
        match cache.get(key) {
            Some(entry) if entry.loaded_at.elapsed() >= ttl => {
                debug!(key = %key, "Cached adapter expired");
                cache.remove(key);
                true
            }
            _ => false,
        }
    }

    fn check(&self, adapter: &dyn VendorAdapter, vendor: &str, inference_type: InferenceType) -> Result<()> {
        let mut errors = self.validator.validate_adapter(adapter).errors;
        if !adapter.vendor().eq_ignore_ascii_case(vendor) {
            errors.push(format!(
                "Adapter for {} reports vendor '{}'",
                vendor,
                adapter.vendor()
            ));
        }

        // Provisioned and cross-region loads are served by on-demand adapters
        if adapter.inference_type() != inference_type {
            debug!(
                expected = %inference_type,
                actual = %adapter.inference_type(),
                "Adapter serves a different inference type"
            );
        }

        if errors.is_empty() {
            return Ok(());
        }

        let message = format!("Adapter {}/{} failed validation: {}", vendor, inference_type, errors.join("; "));
        if self.config.strict_validation {
            Err(Error::validation(message))
        } else {
            warn!("{}", message);
            Ok(())
        }
    }
}

fn cache_key(vendor: &str, inference_type: InferenceType) -> String {
    format!("{}:{}", vendor.to_ascii_lowercase(), inference_type)
}

/// Builder for [`AdapterLoader`]
pub struct LoaderBuilder {
    config: LoaderConfig,
    params: ParamsResolver,
    builtins: bool,
    factories: Vec<(String, InferenceType, AdapterConstructor)>,
    preload: Vec<(String, InferenceType)>,
}

impl LoaderBuilder {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
            params: ParamsResolver::defaults_only(),
            builtins: true,
            factories: Vec::new(),
            preload: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_params(mut self, params: ParamsResolver) -> Self {
        self.params = params;
        self
    }

    /// Skip the built-in vendor constructors
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    pub fn with_factory<F>(mut self, vendor: impl Into<String>, inference_type: InferenceType, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn VendorAdapter> + Send + Sync + 'static,
    {
        self.factories.push((vendor.into(), inference_type, Arc::new(factory)));
        self
    }

    pub fn preload(mut self, vendor: impl Into<String>, inference_type: InferenceType) -> Self {
        self.preload.push((vendor.into(), inference_type));
        self
    }

    /// Build the loader and run configured and requested preloads
    pub fn build(self) -> Result<AdapterLoader> {
        let loader = if self.builtins {
            AdapterLoader::with_builtin_factories(self.config, self.params)?
        } else {
            AdapterLoader::new(self.config)?
        };

        for (vendor, inference_type, factory) in self.factories {
            loader.factories.write().insert(cache_key(&vendor, inference_type), factory);
        }

        let configured = loader.preload_configured();
        let requested = loader.preload_batch(self.preload.iter().map(|(v, t)| (v.as_str(), *t)));
        if configured + requested > 0 {
            info!(preloaded = configured + requested, "Adapter loader ready");
        }

        Ok(loader)
    }
}

impl Default for LoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
