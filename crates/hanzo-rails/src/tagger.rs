//! Entity taggers producing labeled spans for the redactor

use crate::error::Result;
use crate::types::EntitySpan;
use async_trait::async_trait;

#[cfg(feature = "patterns")]
use crate::error::RailsError;
#[cfg(feature = "patterns")]
use crate::types::EntityKind;
#[cfg(feature = "patterns")]
use regex::Regex;

/// Source of labeled entity spans.
///
/// Implementations must return character offsets into `text`. A named-entity
/// model behind a sidecar service, a local model, or the pattern tagger
/// below all fit here. Thread-safety of any internal state is the
/// implementation's concern.
#[async_trait]
pub trait EntityTagger: Send + Sync {
    /// Tag `text`
    async fn tag(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Tagger that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTagger;

#[async_trait]
impl EntityTagger for NoopTagger {
    async fn tag(&self, _text: &str) -> Result<Vec<EntitySpan>> {
        Ok(vec![])
    }
}

/// Regex tagger for structured identifiers a statistical NER model tends to
/// miss: `EMAIL` and `PHONE`
#[cfg(feature = "patterns")]
pub struct PatternTagger {
    patterns: Vec<(EntityKind, Regex)>,
}

#[cfg(feature = "patterns")]
impl PatternTagger {
    /// Create a tagger with the built-in email and phone patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: vec![
                (
                    EntityKind::Email,
                    compile(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")?,
                ),
                (
                    EntityKind::Phone,
                    compile(
                        r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b",
                    )?,
                ),
            ],
        })
    }

    /// Add a custom pattern for `kind`
    pub fn with_pattern(mut self, kind: EntityKind, pattern: &str) -> Result<Self> {
        self.patterns.push((kind, compile(pattern)?));
        Ok(self)
    }

    /// Synchronous tagging
    pub fn find(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans = vec![];
        for (kind, regex) in &self.patterns {
            for m in regex.find_iter(text) {
                let start = text[..m.start()].chars().count();
                let end = start + m.as_str().chars().count();
                spans.push(EntitySpan::new(kind.label(), start, end));
            }
        }
        spans.sort_by_key(|s| s.start);
        spans
    }
}

#[cfg(feature = "patterns")]
fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| RailsError::Configuration(format!("invalid tagger pattern: {}", e)))
}

#[cfg(feature = "patterns")]
#[async_trait]
impl EntityTagger for PatternTagger {
    async fn tag(&self, text: &str) -> Result<Vec<EntitySpan>> {
        Ok(self.find(text))
    }
}
