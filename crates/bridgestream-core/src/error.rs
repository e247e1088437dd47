//! Error types for BridgeStream

/// Result type alias using BridgeStream's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for adapter dispatch and stream normalization
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model id could not be classified or no adapter accepts it
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// Vendor has no registered strategy or adapter
    #[error("unsupported vendor: {0}")]
    UnsupportedVendor(String),

    /// Adapter could not build a vendor payload
    #[error("format error: {0}")]
    Format(String),

    /// Stream processing errors
    #[error("stream error: {0}")]
    Stream(String),

    /// Structural validation failed (strict mode only)
    #[error("validation error: {0}")]
    Validation(String),

    /// Strategy registration or model registry lookup failed
    #[error("registry error: {0}")]
    Registry(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new unsupported-model error
    pub fn unsupported_model(msg: impl Into<String>) -> Self {
        Self::UnsupportedModel(msg.into())
    }

    /// Create a new unsupported-vendor error
    pub fn unsupported_vendor(msg: impl Into<String>) -> Self {
        Self::UnsupportedVendor(msg.into())
    }

    /// Create a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a new stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means the model id cannot be served
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedModel(_) | Self::UnsupportedVendor(_))
    }
}
