//! BridgeStream Adapters
//!
//! Vendor adapters and the dispatch machinery that selects them.
//!
//! Requests are expressed once in the vendor-neutral types from
//! `bridgestream-core` and translated per vendor and deployment mode:
//! - Anthropic (Claude) in legacy, on-demand and inference-profile variants
//! - Amazon Nova and Titan in the same three variants
//! - Cohere Command, on-demand only
//!
//! Adapters are obtained either through the [`AdapterFactory`], which
//! classifies a model id and picks the adapter that accepts it, or through
//! the [`AdapterLoader`], which builds adapters from registered constructors.

pub mod adapter;
pub mod config;
pub mod detector;
pub mod factory;
pub mod loader;
pub mod params;
pub mod registry;
pub mod strategy;
pub mod validator;
pub mod vendors;

pub use adapter::VendorAdapter;
pub use config::{BridgeConfig, DetectionRuleConfig, FactoryConfig, ParamsSettings};
pub use detector::{DetectionRule, VendorDetector};
pub use factory::{AdapterFactory, AdapterFamily};
pub use loader::{AdapterLoader, LoaderBuilder, LoaderConfig, LoaderStats, PreloadTarget};
pub use params::{
    ModelCapabilities, ModelInfo, ModelRegistry, ParamsResolver, RecommendedParams,
    StaticModelRegistry, VendorDefaults,
};
pub use registry::{RegistryStats, StrategyRegistry};
pub use strategy::{StrategyRegistration, VendorStrategy};
pub use validator::{AdapterValidator, ValidationResult, ValidationStats};
pub use vendors::{AdapterScope, AmazonAdapter, AmazonFamily, AnthropicAdapter, CohereAdapter};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::VendorAdapter;
    pub use crate::factory::{AdapterFactory, AdapterFamily};
    pub use crate::loader::AdapterLoader;
    pub use crate::params::{ModelRegistry, ParamsResolver};
    pub use bridgestream_core::prelude::*;
}
