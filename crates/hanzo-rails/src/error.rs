//! Error types for Hanzo Rails

use thiserror::Error;

/// Result type alias for Rails operations
pub type Result<T> = std::result::Result<T, RailsError>;

/// Rails error types
#[derive(Debug, Error)]
pub enum RailsError {
    /// Engine, tagger or configuration failed to initialize
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Policy engine invocation failed for a request
    #[error("Policy engine error: {0}")]
    PolicyEngine(String),

    /// Entity tagging or span replacement failed for a request
    #[error("Redaction error: {0}")]
    Redaction(String),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error (when the chat-completions engine is enabled)
    #[cfg(feature = "http-engine")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RailsError {
    /// Whether this error is recovered inside the pipeline rather than
    /// surfaced to the caller
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RailsError::Redaction(_))
    }
}
