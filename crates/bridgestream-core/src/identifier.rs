//! Model identifier classification
//!
//! Pure functions that derive a vendor and an [`InferenceType`] from an opaque
//! model id. Nothing here fails: unknown ids classify as `ON_DEMAND` with no
//! vendor, and it is up to the caller to turn that into an error.
//!
//! Recognized id shapes:
//! ```text
//! anthropic.claude-3-haiku-20240307-v1:0              ON_DEMAND
//! us.anthropic.claude-sonnet-4-5-20250929-v1:0        INFERENCE_PROFILE
//! arn:aws:bedrock:us-east-1:123:provisioned-model/x   PROVISIONED
//! anthropic.cross-region.claude-3                     CROSS_REGION
//! claude-3-haiku / command-r                          bare aliases
//! ```

use crate::types::InferenceType;

/// Regional prefixes used by inference profile ids
pub const REGION_PREFIXES: [&str; 3] = ["us", "eu", "apac"];

/// Vendors recognized by id prefix
pub const KNOWN_VENDORS: [&str; 6] = ["anthropic", "cohere", "amazon", "ai21", "meta", "mistral"];

/// Bare aliases used by direct vendor APIs
const VENDOR_ALIASES: [(&str, &str); 2] = [("claude-", "anthropic"), ("command-", "cohere")];

const ARN_PREFIX: &str = "arn:aws:bedrock";
const CROSS_REGION_SEGMENT: &str = ".cross-region.";

/// Classification result for a model id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Detected vendor, if any
    pub vendor: Option<&'static str>,

    /// Detected invocation mode
    pub inference_type: InferenceType,
}

impl Classification {
    /// Both vendor and mode were determined
    pub fn is_complete(&self) -> bool {
        self.vendor.is_some()
    }
}

/// Classify a model id into vendor and inference type
pub fn classify(model_id: &str) -> Classification {
    Classification {
        vendor: detect_vendor(model_id),
        inference_type: detect_inference_type(model_id),
    }
}

/// Detect the invocation mode of a model id
///
/// Precedence: regional profile prefix, then provisioned ARN, then a
/// cross-region segment, then `ON_DEMAND`.
pub fn detect_inference_type(model_id: &str) -> InferenceType {
    if is_inference_profile_id(model_id) {
        InferenceType::InferenceProfile
    } else if is_arn(model_id) {
        InferenceType::Provisioned
    } else if model_id.contains(CROSS_REGION_SEGMENT) {
        InferenceType::CrossRegion
    } else {
        InferenceType::OnDemand
    }
}

/// Detect the vendor of a model id
pub fn detect_vendor(model_id: &str) -> Option<&'static str> {
    let model_id = model_id.trim();

    if is_arn(model_id) {
        return detect_vendor_in_arn(model_id);
    }

    let base = strip_regional_prefix(model_id);
    if let Some(vendor) = detect_by_prefix(base) {
        return Some(vendor);
    }

    detect_by_alias(base)
}

/// Match the first dot-delimited segment against the known vendors
pub fn detect_by_prefix(model_id: &str) -> Option<&'static str> {
    let head = model_id.split('.').next()?;
    KNOWN_VENDORS
        .into_iter()
        .find(|vendor| vendor.eq_ignore_ascii_case(head))
}

/// Recognize direct-API aliases such as `claude-*` and `command-*`
pub fn detect_by_alias(model_id: &str) -> Option<&'static str> {
    let lowered = model_id.to_ascii_lowercase();
    VENDOR_ALIASES
        .into_iter()
        .find(|(alias, _)| lowered.starts_with(alias))
        .map(|(_, vendor)| vendor)
}

/// Vendor segment of a `{region}.{vendor}.{model}` id
pub fn detect_by_inference_profile(model_id: &str) -> Option<&'static str> {
    if !is_inference_profile_id(model_id) {
        return None;
    }
    detect_by_prefix(strip_regional_prefix(model_id))
}

/// Vendor named by a Bedrock ARN, matched as a whole token
pub fn detect_vendor_in_arn(arn: &str) -> Option<&'static str> {
    // foundation-model/anthropic.claude-v2 carries a canonical id after the slash
    if let Some((_, resource)) = arn.rsplit_once('/') {
        if let Some(vendor) = detect_by_prefix(strip_regional_prefix(resource)) {
            return Some(vendor);
        }
    }

    let lowered = arn.to_ascii_lowercase();
    lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|token| KNOWN_VENDORS.into_iter().find(|vendor| *vendor == token))
}

/// Split `us.anthropic.x` into `("us", "anthropic.x")`
pub fn split_regional_prefix(model_id: &str) -> Option<(&str, &str)> {
    let (head, rest) = model_id.split_once('.')?;
    REGION_PREFIXES
        .iter()
        .any(|prefix| prefix.eq_ignore_ascii_case(head))
        .then_some((head, rest))
}

/// Whether the id starts with a `us.`, `eu.` or `apac.` prefix
pub fn has_regional_prefix(model_id: &str) -> bool {
    split_regional_prefix(model_id).is_some()
}

/// Remove a leading regional prefix, if present
pub fn strip_regional_prefix(model_id: &str) -> &str {
    split_regional_prefix(model_id)
        .map(|(_, rest)| rest)
        .unwrap_or(model_id)
}

/// Whether the id has the `{region}.{vendor}.` inference profile shape
pub fn is_inference_profile_id(model_id: &str) -> bool {
    let Some((_, rest)) = split_regional_prefix(model_id) else {
        return false;
    };
    match rest.split_once('.') {
        Some((vendor, _)) => !vendor.is_empty() && vendor.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

/// Whether the id is a Bedrock ARN
pub fn is_arn(model_id: &str) -> bool {
    model_id.starts_with(ARN_PREFIX)
}

/// Whether a model must be invoked through an inference profile
///
/// True for ids that already carry a regional prefix and for the Claude 4
/// families, which are not offered on demand.
pub fn requires_inference_profile(model_id: &str) -> bool {
    is_inference_profile_id(model_id) || is_claude_4_family(model_id)
}

/// `anthropic.claude-{sonnet,opus,haiku}-4...`, with or without a regional prefix
pub fn is_claude_4_family(model_id: &str) -> bool {
    let base = strip_regional_prefix(model_id).to_ascii_lowercase();
    ["sonnet", "opus", "haiku"]
        .into_iter()
        .any(|family| base.starts_with(&format!("anthropic.claude-{}-4", family)))
}

/// Match an id against a literal or `*` glob pattern
///
/// `*` matches any run of characters, including none. Patterns without a
/// wildcard must match exactly.
pub fn glob_match(pattern: &str, model_id: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == model_id;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return false,
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return false,
    };

    if !model_id.starts_with(first) {
        return false;
    }
    let mut remaining = &model_id[first.len()..];

    for part in middle {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }

    remaining.len() >= last.len() && remaining.ends_with(last)
}

/// Whether any pattern in the list matches the id
pub fn matches_any<S: AsRef<str>>(patterns: &[S], model_id: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| glob_match(pattern.as_ref(), model_id))
}
