//! Vendor detection with custom rules
//!
//! Custom rules are regular expressions mapped to a vendor. They are consulted
//! by descending priority before the built-in identifier classifier, which lets
//! deployments route private model names without code changes.

use bridgestream_core::identifier;
use bridgestream_core::{Error, Result};
use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;

/// A custom detection rule
#[derive(Debug, Clone)]
pub struct DetectionRule {
    pub pattern: Regex,
    pub vendor: String,
    pub priority: i32,
    pub description: Option<String>,
}

impl DetectionRule {
    /// Compile a rule from a pattern string
    pub fn new(pattern: &str, vendor: impl Into<String>, priority: i32) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::validation(format!("Invalid detection pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            pattern,
            vendor: vendor.into().to_ascii_lowercase(),
            priority,
            description: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Detects the vendor of a model id
#[derive(Debug, Default)]
pub struct VendorDetector {
    rules: RwLock<Vec<DetectionRule>>,
}

impl VendorDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; rules stay sorted by descending priority
    pub fn add_rule(&self, rule: DetectionRule) {
        debug!(vendor = %rule.vendor, priority = rule.priority, pattern = %rule.pattern, "Adding detection rule");
        let mut rules = self.rules.write();
        rules.push(rule);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Remove a vendor's rules, optionally only those with the given priority
    pub fn remove_rule(&self, vendor: &str, priority: Option<i32>) -> usize {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|rule| {
            let matches_vendor = rule.vendor.eq_ignore_ascii_case(vendor);
            !(matches_vendor && priority.map_or(true, |p| rule.priority == p))
        });
        before - rules.len()
    }

    /// Detect a vendor: custom rules first, then the classifier
    pub fn detect(&self, model_id: &str) -> Option<String> {
        if let Some(rule) = self.rules.read().iter().find(|rule| rule.pattern.is_match(model_id)) {
            debug!(
                model_id = %model_id,
                vendor = %rule.vendor,
                description = ?rule.description,
                "Vendor detected by custom rule"
            );
            return Some(rule.vendor.clone());
        }

        identifier::detect_vendor(model_id).map(str::to_string)
    }

    pub fn detect_by_prefix(&self, model_id: &str) -> Option<&'static str> {
        identifier::detect_by_prefix(model_id)
    }

    pub fn detect_by_inference_profile(&self, model_id: &str) -> Option<&'static str> {
        identifier::detect_by_inference_profile(model_id)
    }

    pub fn detect_by_direct_api(&self, model_id: &str) -> Option<&'static str> {
        identifier::detect_by_alias(model_id)
    }

    pub fn rules(&self) -> Vec<DetectionRule> {
        self.rules.read().clone()
    }

    pub fn rules_for_vendor(&self, vendor: &str) -> Vec<DetectionRule> {
        self.rules
            .read()
            .iter()
            .filter(|rule| rule.vendor.eq_ignore_ascii_case(vendor))
            .cloned()
            .collect()
    }

    pub fn clear_rules(&self) {
        self.rules.write().clear();
    }

    /// Drop every custom rule, leaving only the built-in classifier
    pub fn reset(&self) {
        self.clear_rules();
    }
}
