//! Context-window suffixes and inference profile ids
//!
//! Catalog ids sometimes carry a context-window suffix (`amazon.nova-lite-v1:0:300k`)
//! that the invoke API rejects. Profile ids prefix the base id with a regional
//! group derived from the AWS region (`us-east-1` becomes `us`, `ap-*` becomes
//! `apac`).

use crate::identifier::{has_regional_prefix, strip_regional_prefix};
use std::fmt;

/// Context-window suffixes stripped before invocation
pub const KNOWN_SUFFIXES: [&str; 8] = [":8k", ":20k", ":24k", ":128k", ":256k", ":300k", ":1000k", ":mm"];

/// Return the known context-window suffix of an id, if any
pub fn context_suffix(model_id: &str) -> Option<&str> {
    let (_, tail) = model_id.rsplit_once(':')?;
    let suffix = &model_id[model_id.len() - tail.len() - 1..];
    KNOWN_SUFFIXES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(suffix))
        .then_some(suffix)
}

/// Whether the id ends with a known context-window suffix
pub fn has_context_suffix(model_id: &str) -> bool {
    context_suffix(model_id).is_some()
}

/// Strip a known context-window suffix
pub fn strip_context_suffix(model_id: &str) -> &str {
    match context_suffix(model_id) {
        Some(suffix) => &model_id[..model_id.len() - suffix.len()],
        None => model_id,
    }
}

/// Regional group used as an inference profile prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionPrefix {
    Us,
    Eu,
    Apac,
}

impl RegionPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::Eu => "eu",
            Self::Apac => "apac",
        }
    }

    /// Map an AWS region such as `eu-central-1` to its profile prefix
    ///
    /// Unknown regions fall back to `us`.
    pub fn from_region(region: &str) -> Self {
        if region.starts_with("ap-") {
            return Self::Apac;
        }

        match region.split('-').next().unwrap_or_default() {
            "us" => Self::Us,
            "eu" => Self::Eu,
            other => {
                tracing::warn!(region = %region, prefix = %other, "Unknown region prefix, using 'us'");
                Self::Us
            }
        }
    }
}

impl fmt::Display for RegionPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the id to invoke for a model in a region
///
/// The suffix is always stripped. Ids that already carry a regional prefix are
/// returned as-is; otherwise the prefix is added only when `requires_profile`.
pub fn resolve_profile_id(model_id: &str, region: &str, requires_profile: bool) -> String {
    let base = strip_context_suffix(model_id);

    if has_regional_prefix(base) {
        tracing::debug!(model_id = %base, "Model already has regional prefix");
        return base.to_string();
    }

    if !requires_profile {
        return base.to_string();
    }

    let profile_id = format!("{}.{}", RegionPrefix::from_region(region), base);
    tracing::info!(profile_id = %profile_id, region = %region, "Using inference profile");
    profile_id
}

/// Base model id of an inference profile id
pub fn remove_regional_prefix(profile_id: &str) -> &str {
    strip_regional_prefix(profile_id)
}
