//! Configuration for Hanzo Rails

use crate::error::{RailsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Marker the policy engine emits when a query hits a blocked topic
pub const DEFAULT_SENTINEL: &str = "BLOCKED_TOPIC_DETECTED";

/// Topic reported when the sentinel fires but no configured topic is named
pub const DEFAULT_FALLBACK_TOPIC: &str = "blocked_topic";

/// Notice returned to the client for blocked queries
pub const DEFAULT_BLOCK_MESSAGE: &str = "Your input has been flagged for sensitive content by LLM Guardrails and has been blocked for security reasons.";

/// Main configuration for Rails
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RailsConfig {
    /// Topic guard configuration
    pub topics: TopicConfig,
    /// PII redaction configuration
    pub redaction: RedactionConfig,
    /// Policy engine connection
    pub engine: EngineConfig,
    /// Audit configuration
    pub audit: AuditConfig,
}

impl RailsConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check values that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.topics.sentinel.trim().is_empty() {
            return Err(RailsError::Configuration(
                "topics.sentinel must not be empty".to_string(),
            ));
        }
        if let Some(pos) = self
            .topics
            .blocked_topics
            .iter()
            .position(|t| t.trim().is_empty())
        {
            return Err(RailsError::Configuration(format!(
                "topics.blocked_topics[{}] is empty",
                pos
            )));
        }
        if self.topics.fallback_topic.trim().is_empty() {
            return Err(RailsError::Configuration(
                "topics.fallback_topic must not be empty".to_string(),
            ));
        }
        if self.redaction.script_gate_window == 0 {
            return Err(RailsError::Configuration(
                "redaction.script_gate_window must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Topic guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Disallowed topics, checked in order
    pub blocked_topics: Vec<String>,
    /// Topic reported when none of `blocked_topics` is named
    pub fallback_topic: String,
    /// Block marker in the engine's response
    pub sentinel: String,
    /// Notice returned for blocked queries
    pub block_message: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            blocked_topics: vec![
                "politics".to_string(),
                "public figure".to_string(),
                "legal advice".to_string(),
                "hate speech".to_string(),
                "financial advice".to_string(),
            ],
            fallback_topic: DEFAULT_FALLBACK_TOPIC.to_string(),
            sentinel: DEFAULT_SENTINEL.to_string(),
            block_message: DEFAULT_BLOCK_MESSAGE.to_string(),
        }
    }
}

/// How overlapping entity spans are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Keep the leftmost span and drop any span starting inside it
    #[default]
    KeepOutermost,
    /// Replace every span on the mutating copy, right to left.
    /// Overlapping spans can swallow placeholders already written.
    Unresolved,
}

/// PII redaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Enable redaction
    pub enabled: bool,
    /// Leading characters inspected for CJK script before tagging
    pub script_gate_window: usize,
    /// Overlap handling
    pub overlap_policy: OverlapPolicy,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            script_gate_window: 100,
            overlap_policy: OverlapPolicy::KeepOutermost,
        }
    }
}

/// Chat-completions policy engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base endpoint (OpenAI-compatible or Azure OpenAI resource)
    pub endpoint: String,
    /// API key
    pub api_key: Option<String>,
    /// Azure deployment id; when set the Azure URL layout is used
    pub deployment: Option<String>,
    /// Azure `api-version` query parameter
    pub api_version: Option<String>,
    /// Model name sent in the request body
    pub model: String,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Replaces the generated system instruction
    pub system_prompt: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            deployment: None,
            api_version: None,
            model: "gpt-35-turbo".to_string(),
            timeout_ms: 30_000,
            system_prompt: None,
        }
    }
}

impl EngineConfig {
    /// Read connection settings from the environment.
    ///
    /// Azure variables win over the plain OpenAI ones.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Overlay environment settings that are present onto this config
    pub fn merge_env(self) -> Self {
        self.merge_lookup(|key| std::env::var(key).ok())
    }

    fn merge_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) =
            lookup("AZURE_OPENAI_ENDPOINT").or_else(|| lookup("OPENAI_API_BASE"))
        {
            self.endpoint = endpoint;
        }
        if let Some(key) = lookup("AZURE_OPENAI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(deployment) = lookup("AZURE_OPENAI_DEPLOYMENT_ID") {
            self.deployment = Some(deployment);
        }
        if let Some(version) = lookup("API_VERSION") {
            self.api_version = Some(version);
        }
        self
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging
    pub enabled: bool,
    /// Log query content (vs. just hashes)
    pub log_content: bool,
    /// Log to stdout
    pub log_stdout: bool,
    /// JSONL file path
    pub log_file: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_content: false,
            log_stdout: false,
            log_file: None,
        }
    }
}
