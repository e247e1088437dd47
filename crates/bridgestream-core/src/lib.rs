//! BridgeStream Core
//!
//! Core types and pure utilities shared across the BridgeStream adapter layer.
//!
//! This crate provides:
//! - Vendor-neutral message, option, payload and chunk types
//! - Error types and result handling
//! - Model identifier classification (vendor and inference type)
//! - Context-window suffix handling and inference profile resolution

pub mod error;
pub mod identifier;
pub mod profile;
pub mod types;

pub use error::{Error, Result};
pub use identifier::{classify, glob_match, matches_any, Classification};
pub use types::{AdapterChunk, AdapterPayload, InferenceType, Role, UniversalMessage, UniversalOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::identifier::{classify, Classification};
    pub use crate::types::{
        AdapterChunk, AdapterPayload, InferenceType, Role, UniversalMessage, UniversalOptions,
    };
}
