//! Structural validation of model ids and adapters

use crate::adapter::VendorAdapter;
use bridgestream_core::{Error, InferenceType, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

const MAX_MODEL_ID_LEN: usize = 200;

/// Outcome of a validation check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self::from_parts(vec![error.into()], Vec::new())
    }
}

/// Aggregate over a set of validation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
}

/// Validator for ids and adapters
#[derive(Debug, Clone)]
pub struct AdapterValidator {
    charset_regex: Regex,
    profile_regex: Regex,
    arn_regex: Regex,
}

impl AdapterValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            charset_regex: Regex::new(r"^[A-Za-z0-9._:-]+$")
                .map_err(|e| Error::internal(format!("Failed to compile model id regex: {}", e)))?,
            profile_regex: Regex::new(r"(?i)^(us|eu|apac)\.[a-z0-9]+\.")
                .map_err(|e| Error::internal(format!("Failed to compile profile regex: {}", e)))?,
            arn_regex: Regex::new(r"(?i)^arn:aws:bedrock:[a-z0-9-]+:\d+:provisioned-model/.+$")
                .map_err(|e| Error::internal(format!("Failed to compile ARN regex: {}", e)))?,
        })
    }

    pub fn validate_model_id(&self, model_id: &str) -> ValidationResult {
        if model_id.trim().is_empty() {
            return ValidationResult::invalid("Model id cannot be empty");
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if !self.charset_regex.is_match(model_id) {
            errors.push("Model id contains invalid characters".to_string());
        }
        if model_id.chars().count() > MAX_MODEL_ID_LEN {
            errors.push(format!("Model id too long (max {} characters)", MAX_MODEL_ID_LEN));
        }
        if model_id.contains("..") {
            warnings.push("Model id contains consecutive dots".to_string());
        }
        if model_id.starts_with('.') || model_id.ends_with('.') {
            warnings.push("Model id starts or ends with a dot".to_string());
        }

        ValidationResult::from_parts(errors, warnings)
    }

    pub fn validate_adapter(&self, adapter: &dyn VendorAdapter) -> ValidationResult {
        let mut errors = Vec::new();

        if adapter.vendor().trim().is_empty() {
            errors.push("Adapter has an empty vendor".to_string());
        }
        if adapter.supported_models().is_empty() {
            errors.push("Adapter declares no supported models".to_string());
        }

        ValidationResult::from_parts(errors, Vec::new())
    }

    /// Validate an inference type given as text
    pub fn validate_inference_type(&self, inference_type: &str) -> ValidationResult {
        match inference_type.parse::<InferenceType>() {
            Ok(_) => ValidationResult::from_parts(Vec::new(), Vec::new()),
            Err(_) => ValidationResult::invalid(format!("Invalid inference type: {}", inference_type)),
        }
    }

    /// Validate the id, the adapter, and that the adapter accepts the id
    pub fn validate_compatibility(&self, model_id: &str, adapter: &dyn VendorAdapter) -> ValidationResult {
        let id_result = self.validate_model_id(model_id);
        if !id_result.valid {
            return id_result;
        }

        let adapter_result = self.validate_adapter(adapter);
        if !adapter_result.valid {
            return adapter_result;
        }

        let mut errors = Vec::new();
        if !adapter.supports_model(model_id) {
            errors.push(format!(
                "Adapter '{}' does not support model '{}'",
                adapter.vendor(),
                model_id
            ));
        }

        let warnings = id_result
            .warnings
            .into_iter()
            .chain(adapter_result.warnings)
            .collect();
        ValidationResult::from_parts(errors, warnings)
    }

    /// Expected shape: `{region}.{vendor}.{model}`
    pub fn validate_inference_profile_format(&self, model_id: &str) -> ValidationResult {
        if self.profile_regex.is_match(model_id) {
            ValidationResult::from_parts(Vec::new(), Vec::new())
        } else {
            ValidationResult::invalid(
                "Invalid inference profile format, expected {region}.{vendor}.{model}",
            )
        }
    }

    /// Expected shape: `arn:aws:bedrock:{region}:{account}:provisioned-model/{id}`
    pub fn validate_arn_format(&self, model_id: &str) -> ValidationResult {
        if self.arn_regex.is_match(model_id) {
            ValidationResult::from_parts(Vec::new(), Vec::new())
        } else {
            ValidationResult::invalid("Invalid ARN format")
        }
    }

    pub fn validate_batch<I, S>(&self, model_ids: I) -> BTreeMap<String, ValidationResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        model_ids
            .into_iter()
            .map(|id| {
                let id = id.as_ref();
                (id.to_string(), self.validate_model_id(id))
            })
            .collect()
    }

    pub fn validation_stats<'a, I>(&self, results: I) -> ValidationStats
    where
        I: IntoIterator<Item = &'a ValidationResult>,
    {
        results
            .into_iter()
            .fold(ValidationStats::default(), |mut stats, result| {
                stats.total += 1;
                if result.valid {
                    stats.valid += 1;
                } else {
                    stats.invalid += 1;
                }
                stats.total_errors += result.errors.len();
                stats.total_warnings += result.warnings.len();
                stats
            })
    }
}

impl Default for AdapterValidator {
    fn default() -> Self {
        Self::new().expect("Failed to create adapter validator")
    }
}
