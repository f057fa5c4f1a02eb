//! Query screening pipeline

use crate::audit::AuditLogger;
use crate::config::RailsConfig;
use crate::engine::PolicyEngine;
use crate::error::{RailsError, Result};
use crate::redact::Redactor;
use crate::tagger::{EntityTagger, NoopTagger};
use crate::topic::{BlockSignal, TopicGuard};
use crate::types::{ChatMessage, Outcome, Redacted, RequestContext};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Screening context built once at startup and shared across requests.
///
/// Every check asks the policy engine about the query, blocks it if the
/// engine flags a disallowed topic, and otherwise forwards it with PII
/// replaced by placeholders. `Rails` holds no per-request state, so one
/// instance may serve concurrent checks.
pub struct Rails {
    config: RailsConfig,
    engine: Arc<dyn PolicyEngine>,
    tagger: Arc<dyn EntityTagger>,
    topic_guard: TopicGuard,
    redactor: Redactor,
    audit_logger: AuditLogger,
}

impl Rails {
    /// Create a builder for Rails
    pub fn builder() -> RailsBuilder {
        RailsBuilder::new()
    }

    /// Screen a query
    pub async fn run_check(&self, query: &str) -> Result<Outcome> {
        self.run_check_with_context(query, &RequestContext::default())
            .await
    }

    /// Screen a query with request context
    ///
    /// Policy engine failures are returned to the caller. Tagging and
    /// redaction failures are logged and the query passes through unmodified.
    pub async fn run_check_with_context(
        &self,
        query: &str,
        context: &RequestContext,
    ) -> Result<Outcome> {
        let start = Instant::now();
        debug!(request_id = %context.request_id, "Received user query: {}", query);

        let response = self
            .engine
            .generate(&[ChatMessage::user(query)])
            .await
            .map_err(|e| match e {
                RailsError::PolicyEngine(_) => e,
                other => RailsError::PolicyEngine(other.to_string()),
            })?
            .into_content();
        debug!(request_id = %context.request_id, "Policy engine output: {}", response);

        if let Some(topic) = self.topic_guard.detect(&response) {
            debug!(request_id = %context.request_id, topic = %topic, "Blocked topic detected");
            let outcome = Outcome::blocked(self.config.topics.block_message.clone(), topic);
            self.audit_logger
                .log(context, query, &outcome, 0, elapsed_ms(start));
            return Ok(outcome);
        }

        let redacted = match self.redact(query).await {
            Ok(redacted) => redacted,
            Err(e) => {
                warn!(request_id = %context.request_id, error = %e, "PII redaction failed, passing query through");
                Redacted::unchanged(query)
            }
        };
        debug!(request_id = %context.request_id, "PII masked result: {}", redacted.text);

        let count = redacted.redactions.len();
        let outcome = Outcome::cleared(query, redacted.text);
        self.audit_logger
            .log(context, query, &outcome, count, elapsed_ms(start));

        Ok(outcome)
    }

    /// Tag and redact `text`. Gated text never reaches the tagger.
    pub async fn redact(&self, text: &str) -> Result<Redacted> {
        if self.redactor.is_gated(text) {
            debug!("Text is not Latin-script dominant or redaction is off, skipping PII masking");
            return Ok(Redacted::unchanged(text));
        }

        let entities = self.tagger.tag(text).await.map_err(|e| match e {
            RailsError::Redaction(_) => e,
            other => RailsError::Redaction(format!("entity tagging failed: {}", other)),
        })?;

        self.redactor.redact(text, &entities)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Builder for Rails
pub struct RailsBuilder {
    config: RailsConfig,
    engine: Option<Arc<dyn PolicyEngine>>,
    tagger: Option<Arc<dyn EntityTagger>>,
    signal: Option<Box<dyn BlockSignal>>,
}

impl RailsBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: RailsConfig::default(),
            engine: None,
            tagger: None,
            signal: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: RailsConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the policy engine
    pub fn engine(mut self, engine: Arc<dyn PolicyEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the entity tagger
    pub fn tagger(mut self, tagger: Arc<dyn EntityTagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    /// Replace the sentinel check with a custom block signal
    pub fn block_signal(mut self, signal: impl BlockSignal + 'static) -> Self {
        self.signal = Some(Box::new(signal));
        self
    }

    /// Set the blocked topics
    pub fn blocked_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.topics.blocked_topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Build Rails. Fails if the configuration is invalid or no policy
    /// engine was supplied. Without a tagger nothing is redacted.
    pub fn build(self) -> Result<Rails> {
        self.config.validate()?;

        let engine = self.engine.ok_or_else(|| {
            RailsError::Configuration("a policy engine is required".to_string())
        })?;
        let tagger = self.tagger.unwrap_or_else(|| Arc::new(NoopTagger));

        let topic_guard = match self.signal {
            Some(signal) => TopicGuard::with_boxed_signal(&self.config.topics, signal),
            None => TopicGuard::new(&self.config.topics),
        };

        Ok(Rails {
            topic_guard,
            redactor: Redactor::new(self.config.redaction.clone()),
            audit_logger: AuditLogger::new(self.config.audit.clone()),
            engine,
            tagger,
            config: self.config,
        })
    }
}

impl Default for RailsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
