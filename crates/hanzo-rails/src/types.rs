//! Core types for Hanzo Rails

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity kinds that have a redaction placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    /// Person name
    Person,
    /// Geopolitical entity (city, country, state)
    Gpe,
    /// Absolute or relative date
    Date,
    /// Company, agency, institution
    Org,
    /// Phone number
    Phone,
    /// Email address
    Email,
}

impl EntityKind {
    /// Parse a tagger label. Labels without a placeholder yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PERSON" => Some(EntityKind::Person),
            "GPE" => Some(EntityKind::Gpe),
            "DATE" => Some(EntityKind::Date),
            "ORG" => Some(EntityKind::Org),
            "PHONE" => Some(EntityKind::Phone),
            "EMAIL" => Some(EntityKind::Email),
            _ => None,
        }
    }

    /// Tagger label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Person => "PERSON",
            EntityKind::Gpe => "GPE",
            EntityKind::Date => "DATE",
            EntityKind::Org => "ORG",
            EntityKind::Phone => "PHONE",
            EntityKind::Email => "EMAIL",
        }
    }

    /// Semantic word written in place of the entity
    pub fn placeholder(&self) -> &'static str {
        match self {
            EntityKind::Person => "name",
            EntityKind::Gpe => "location",
            EntityKind::Date => "date",
            EntityKind::Org => "organization",
            EntityKind::Phone => "phone number",
            EntityKind::Email => "email",
        }
    }

    /// Placeholder token, e.g. `{name}`
    pub fn token(&self) -> String {
        format!("{{{}}}", self.placeholder())
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A labeled span produced by an entity tagger.
///
/// Offsets are character indices (not byte offsets) into the tagged text,
/// `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Raw tagger label (`PERSON`, `GPE`, `CARDINAL`, ...)
    pub label: String,
    /// First character of the span
    #[serde(rename = "start_char", alias = "start")]
    pub start: usize,
    /// One past the last character of the span
    #[serde(rename = "end_char", alias = "end")]
    pub end: usize,
}

impl EntitySpan {
    /// Create a new span
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// Kind of this span, if its label has a placeholder
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_label(&self.label)
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// A replacement applied by the redactor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRedaction {
    /// Entity kind replaced
    pub kind: EntityKind,
    /// Start character in the original text
    pub start: usize,
    /// End character in the original text
    pub end: usize,
    /// Placeholder written in its place
    pub replacement: String,
}

/// Output of the redactor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redacted {
    /// Text with entity spans replaced
    pub text: String,
    /// Replacements in ascending offset order
    pub redactions: Vec<AppliedRedaction>,
}

impl Redacted {
    /// Text passed through without changes
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            redactions: vec![],
        }
    }
}

/// Reason attached to an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Query touches a disallowed topic
    BlockedTopic,
    /// Query passed and PII was replaced
    PiiMasked,
    /// Query passed unchanged
    NoPiiDetected,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::BlockedTopic => "blocked_topic",
            ReasonCode::PiiMasked => "pii_masked",
            ReasonCode::NoPiiDetected => "no_pii_detected",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the query may be forwarded
    pub passed: bool,
    /// Why
    pub reason: ReasonCode,
    /// Redacted query on pass, policy notice on block
    pub message: String,
    /// Offending topics; empty on pass
    pub topics: Vec<String>,
}

impl Outcome {
    /// Blocked outcome carrying the policy notice and the detected topic
    pub fn blocked(notice: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: ReasonCode::BlockedTopic,
            message: notice.into(),
            topics: vec![topic.into()],
        }
    }

    /// Passing outcome; the reason is derived from whether redaction changed the query
    pub fn cleared(query: &str, redacted: String) -> Self {
        let reason = if redacted != query {
            ReasonCode::PiiMasked
        } else {
            ReasonCode::NoPiiDetected
        };
        Self {
            passed: true,
            reason,
            message: redacted,
            topics: vec![],
        }
    }

    /// Check if the query was blocked
    pub fn is_blocked(&self) -> bool {
        !self.passed
    }

    /// Client-visible response body
    pub fn to_response(&self) -> CheckResponse {
        CheckResponse {
            result: if self.passed {
                CheckStatus::Pass
            } else {
                CheckStatus::Fail
            },
            reason: self.reason,
            final_message: self.message.clone(),
            topics_found: self.topics.clone(),
        }
    }
}

/// Pass/fail marker in the client response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Response body handed to clients of the check endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub result: CheckStatus,
    pub reason: ReasonCode,
    pub final_message: String,
    pub topics_found: Vec<String>,
}

/// Body returned when processing fails internally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Generic failure without internal detail
    pub fn processing_failed() -> Self {
        Self {
            error: "Processing failed".to_string(),
        }
    }
}

/// Role-tagged chat message sent to the policy engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Policy engine output: either bare text or a message object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineResponse {
    Text(String),
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        content: String,
    },
}

impl EngineResponse {
    /// Normalize either shape to the response text
    pub fn into_content(self) -> String {
        match self {
            EngineResponse::Text(text) => text,
            EngineResponse::Message { content, .. } => content,
        }
    }
}

impl From<String> for EngineResponse {
    fn from(text: String) -> Self {
        EngineResponse::Text(text)
    }
}

impl From<&str> for EngineResponse {
    fn from(text: &str) -> Self {
        EngineResponse::Text(text.to_string())
    }
}

/// Request context for a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request ID
    pub request_id: Uuid,
    /// User identifier (optional)
    pub user_id: Option<String>,
    /// Session identifier (optional)
    pub session_id: Option<String>,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
            session_id: None,
            timestamp: Utc::now(),
        }
    }
}

impl RequestContext {
    /// Create a new context with a fresh request ID
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session ID
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Request context
    pub context: RequestContext,
    /// Query hash
    pub content_hash: String,
    /// Result of the check
    pub result: AuditResult,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Result for audit logging (simplified)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditResult {
    /// Query passed unchanged
    Passed,
    /// Query passed with redactions
    Redacted { count: usize },
    /// Query was blocked
    Blocked { topics: Vec<String> },
}
