//! Adapter resolution tests
//!
//! Drives the factory and loader through the public API only.

use bridgestream_adapters::detector::DetectionRule;
use bridgestream_adapters::{AdapterFactory, AdapterFamily, AdapterLoader, LoaderConfig, ParamsResolver, VendorAdapter};
use bridgestream_core::{Error, InferenceType, UniversalMessage, UniversalOptions};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

const SAMPLE_IDS: &[&str] = &[
    "anthropic.claude-3-haiku-20240307-v1:0",
    "anthropic.claude-3-sonnet-20240229-v1:0",
    "anthropic.claude-3-5-sonnet-20241022-v2:0",
    "anthropic.claude-sonnet-4-20250514-v1:0",
    "anthropic.claude-opus-4-1-20250805-v1:0",
    "us.anthropic.claude-sonnet-4-5-20250929-v1:0",
    "eu.anthropic.claude-3-7-sonnet-20250219-v1:0",
    "apac.anthropic.claude-3-haiku-20240307-v1:0",
    "amazon.nova-pro-v1:0",
    "amazon.nova-lite-v1:0",
    "us.amazon.nova-premier-v1:0",
    "amazon.titan-text-express-v1",
    "amazon.titan-text-premier-v1:0",
    "cohere.command-r-v1:0",
    "cohere.command-r-plus-v1:0",
    "meta.llama3-70b-instruct-v1:0",
    "unknown.model-v1:0",
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Distinct per-mode adapters; Cohere serves both modes with one instance
fn per_mode_adapters(factory: &AdapterFactory) -> Vec<Arc<dyn VendorAdapter>> {
    let mut adapters: Vec<Arc<dyn VendorAdapter>> = Vec::new();
    for vendor in ["anthropic", "amazon", "cohere"] {
        for mode in [InferenceType::OnDemand, InferenceType::InferenceProfile] {
            let adapter = factory.create_adapter(vendor, mode).unwrap();
            if !adapters.iter().any(|known| Arc::ptr_eq(known, &adapter)) {
                adapters.push(adapter);
            }
        }
    }
    adapters
}

#[test]
fn test_profile_id_resolves_to_profile_adapter() -> anyhow::Result<()> {
    init_tracing();
    let factory = AdapterFactory::default();
    let model_id = "us.anthropic.claude-sonnet-4-5-20250929-v1:0";

    assert_eq!(factory.detect_vendor(model_id).as_deref(), Some("anthropic"));
    assert_eq!(factory.detect_inference_type(model_id), InferenceType::InferenceProfile);

    let adapter = factory.get_adapter_for_model(model_id)?;
    assert_eq!(adapter.vendor(), "anthropic");
    assert_eq!(adapter.inference_type(), InferenceType::InferenceProfile);
    Ok(())
}

#[test]
fn test_on_demand_id_not_claimed_by_profile_adapter() {
    let factory = AdapterFactory::default();
    let model_id = "anthropic.claude-3-sonnet-20240229-v1:0";

    assert_eq!(factory.detect_inference_type(model_id), InferenceType::OnDemand);
    let profile = factory
        .create_adapter("anthropic", InferenceType::InferenceProfile)
        .unwrap();
    assert!(!profile.supports_model(model_id));

    let adapter = factory.get_adapter_for_model(model_id).unwrap();
    assert_eq!(adapter.inference_type(), InferenceType::OnDemand);
}

#[test]
fn test_unknown_vendor_is_unsupported() {
    let factory = AdapterFactory::default();
    assert!(!factory.is_model_supported("unknown.model-v1:0"));

    let err = factory.get_adapter_for_model("unknown.model-v1:0").unwrap_err();
    assert!(matches!(err, Error::UnsupportedModel(_)));
    assert!(err.is_unsupported());

    // Known vendor without a strategy
    assert!(!factory.is_model_supported("meta.llama3-70b-instruct-v1:0"));
}

#[test]
fn test_per_mode_adapters_are_disjoint() {
    let factory = AdapterFactory::default();
    let adapters = per_mode_adapters(&factory);
    assert_eq!(adapters.len(), 5);

    for model_id in SAMPLE_IDS {
        let claimants: Vec<String> = adapters
            .iter()
            .filter(|adapter| adapter.supports_model(model_id))
            .map(|adapter| adapter.display_name())
            .collect();
        assert!(claimants.len() <= 1, "{} claimed by {:?}", model_id, claimants);
    }
}

#[test]
fn test_legacy_family_ignores_mode() {
    init_tracing();
    let factory = AdapterFactory::with_family(AdapterFamily::Legacy, ParamsResolver::defaults_only());
    let adapter = factory
        .get_adapter_for_model("us.anthropic.claude-sonnet-4-5-20250929-v1:0")
        .unwrap();
    assert_eq!(adapter.vendor(), "anthropic");
    assert_eq!(adapter.inference_type(), InferenceType::OnDemand);

    let same = factory
        .get_adapter_for_model("anthropic.claude-3-haiku-20240307-v1:0")
        .unwrap();
    assert!(Arc::ptr_eq(&adapter, &same));
    assert_eq!(factory.all_adapters().len(), 3);

    factory.set_adapter_family(AdapterFamily::PerMode);
    assert_eq!(factory.cached_adapters(), 0);
    let per_mode = factory
        .get_adapter_for_model("us.anthropic.claude-sonnet-4-5-20250929-v1:0")
        .unwrap();
    assert_eq!(per_mode.inference_type(), InferenceType::InferenceProfile);
}

#[test]
fn test_adapters_are_shared_singletons() {
    let factory = AdapterFactory::default();
    let a = factory.get_adapter_for_model("amazon.nova-pro-v1:0").unwrap();
    let b = factory.get_adapter_for_model("amazon.nova-lite-v1:0").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    factory.clear_cache();
    let c = factory.get_adapter_for_model("amazon.nova-pro-v1:0").unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_opaque_modes_use_on_demand_adapter() {
    let factory = AdapterFactory::default();
    let arn = "arn:aws:bedrock:us-east-1:123456789012:provisioned-model/anthropic-claude-abc123";

    assert_eq!(factory.detect_inference_type(arn), InferenceType::Provisioned);
    let adapter = factory.get_adapter_for_model(arn).unwrap();
    assert_eq!(adapter.vendor(), "anthropic");
    assert_eq!(adapter.inference_type(), InferenceType::OnDemand);
}

#[test]
fn test_alternate_spellings_resolve() {
    let factory = AdapterFactory::default();

    let colon = factory
        .get_adapter_for_model("anthropic:claude-3-haiku-20240307-v1:0")
        .unwrap();
    assert_eq!(colon.vendor(), "anthropic");

    let suffixed = factory.get_adapter_for_model("amazon.nova-pro-v1:0:300k").unwrap();
    assert_eq!(suffixed.vendor(), "amazon");

    let cohere = factory.get_adapter_for_model("cohere.command-r-plus-v1:0").unwrap();
    assert_eq!(cohere.display_name(), "Cohere ON_DEMAND Adapter");
}

#[test]
fn test_custom_rules_and_reset() {
    let factory = AdapterFactory::default();
    factory
        .detector()
        .add_rule(DetectionRule::new("^corp-llm", "cohere", 10).unwrap());
    assert_eq!(factory.detect_vendor("corp-llm-large").as_deref(), Some("cohere"));

    // Routed to Cohere, but no Cohere adapter claims the id
    let err = factory.get_adapter_for_model("corp-llm-large").unwrap_err();
    assert!(matches!(err, Error::UnsupportedModel(_)));

    assert!(factory.registry().unregister("amazon"));
    assert!(!factory.is_model_supported("amazon.nova-pro-v1:0"));

    factory.reset();
    assert_eq!(factory.detect_vendor("corp-llm-large"), None);
    assert!(factory.is_model_supported("amazon.nova-pro-v1:0"));
    assert_eq!(factory.registry().detection_order(), vec!["anthropic", "amazon", "cohere"]);
}

#[test]
fn test_unknown_vendor_create_adapter() {
    let factory = AdapterFactory::default();
    let err = factory.create_adapter("mistral", InferenceType::OnDemand).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVendor(_)));
    assert!(factory.get_adapter("mistral").is_err());
}

#[test]
fn test_cohere_profile_request_falls_back() {
    let factory = AdapterFactory::default();
    let adapter = factory
        .create_adapter("cohere", InferenceType::InferenceProfile)
        .unwrap();
    assert_eq!(adapter.inference_type(), InferenceType::OnDemand);
}

#[test]
fn test_format_request_is_pure() {
    let factory = AdapterFactory::default();
    let messages = vec![
        UniversalMessage::system("You are helpful."),
        UniversalMessage::user("Hi"),
        UniversalMessage::assistant("Hello"),
        UniversalMessage::user("How are you?"),
    ];
    let snapshot = messages.clone();

    for model_id in [
        "anthropic.claude-3-haiku-20240307-v1:0",
        "us.anthropic.claude-sonnet-4-5-20250929-v1:0",
        "amazon.nova-pro-v1:0",
        "amazon.titan-text-express-v1",
        "cohere.command-r-v1:0",
    ] {
        let adapter = factory.get_adapter_for_model(model_id).unwrap();
        let options = UniversalOptions::for_model(model_id).with_stop_sequences(["END"]);
        let first = adapter.format_request(&messages, &options).unwrap();
        let second = adapter.format_request(&messages, &options).unwrap();
        assert_eq!(first, second, "{}", model_id);
        assert_eq!(messages, snapshot);
    }
}

#[test]
fn test_loader_matches_factory() {
    let factory = AdapterFactory::default();
    let loader =
        AdapterLoader::with_builtin_factories(LoaderConfig::default(), ParamsResolver::defaults_only()).unwrap();

    for (vendor, mode) in [
        ("anthropic", InferenceType::OnDemand),
        ("anthropic", InferenceType::InferenceProfile),
        ("amazon", InferenceType::InferenceProfile),
        ("cohere", InferenceType::OnDemand),
    ] {
        let loaded = loader.load(vendor, mode).unwrap();
        let created = factory.create_adapter(vendor, mode).unwrap();
        assert_eq!(loaded.display_name(), created.display_name());
        assert_eq!(loaded.supported_models(), created.supported_models());
    }
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z_ ]{0,12}".prop_map(Value::String),
        Just(json!("message_stop")),
        Just(json!("content_block_delta")),
        Just(json!("error")),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map(
                prop_oneof![
                    Just("type".to_string()),
                    Just("delta".to_string()),
                    Just("text".to_string()),
                    Just("error".to_string()),
                    Just("message".to_string()),
                    Just("outputText".to_string()),
                    Just("is_finished".to_string()),
                    Just("contentBlockDelta".to_string()),
                    Just("throttlingException".to_string()),
                    "[a-z]{1,8}",
                ],
                inner,
                0..5,
            )
            .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn prop_parse_chunk_is_total(frame in arb_json()) {
        let factory = AdapterFactory::default();
        let mut adapters = per_mode_adapters(&factory);
        adapters.extend(factory.all_adapters());

        for adapter in adapters {
            let chunk = adapter.parse_chunk(&frame);
            if let Some(content) = chunk.content() {
                prop_assert!(!content.is_empty() || chunk.is_heartbeat());
            }
        }
    }
}
