//! Blocked-topic detection over policy engine output

use crate::config::TopicConfig;

/// Decides from the engine's response whether the query was blocked.
///
/// Keeps the engine's marker format out of the rest of the pipeline.
pub trait BlockSignal: Send + Sync {
    /// Whether the response signals a topic violation
    fn is_blocked(&self, response: &str) -> bool;
}

/// Literal, case-sensitive sentinel substring
#[derive(Debug, Clone)]
pub struct SentinelSignal {
    sentinel: String,
}

impl SentinelSignal {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }
}

impl BlockSignal for SentinelSignal {
    fn is_blocked(&self, response: &str) -> bool {
        response.contains(&self.sentinel)
    }
}

/// Topic guard
pub struct TopicGuard {
    signal: Box<dyn BlockSignal>,
    topics: Vec<TopicNeedle>,
    fallback: String,
}

impl TopicGuard {
    /// Create a topic guard using the configured sentinel
    pub fn new(config: &TopicConfig) -> Self {
        Self::with_signal(config, SentinelSignal::new(config.sentinel.clone()))
    }

    /// Create a topic guard with a custom block signal
    pub fn with_signal(config: &TopicConfig, signal: impl BlockSignal + 'static) -> Self {
        Self::with_boxed_signal(config, Box::new(signal))
    }

    pub fn with_boxed_signal(config: &TopicConfig, signal: Box<dyn BlockSignal>) -> Self {
        let topics = config
            .blocked_topics
            .iter()
            .map(|topic| TopicNeedle::new(topic))
            .collect();

        Self {
            signal,
            topics,
            fallback: config.fallback_topic.clone(),
        }
    }

    /// Detect the blocked topic named in the engine's response.
    ///
    /// Returns `None` when the response carries no block signal. When it
    /// does, the first configured topic named verbatim in the response wins.
    /// Only if no topic is named verbatim are stems tried, in the same
    /// order, and the fallback label is used if neither pass matches.
    pub fn detect(&self, response: &str) -> Option<String> {
        if !self.signal.is_blocked(response) {
            return None;
        }

        let lower = response.to_lowercase();
        let topic = self
            .topics
            .iter()
            .find(|t| lower.contains(t.literal.as_str()))
            .or_else(|| {
                self.topics
                    .iter()
                    .find(|t| t.stem.as_deref().is_some_and(|stem| lower.contains(stem)))
            })
            .map(|t| t.topic.clone())
            .unwrap_or_else(|| self.fallback.clone());

        Some(topic)
    }
}

/// A configured topic with the lower-cased forms searched for
struct TopicNeedle {
    topic: String,
    literal: String,
    /// Singular stem, so "politics" also finds "political"
    stem: Option<String>,
}

impl TopicNeedle {
    fn new(topic: &str) -> Self {
        let literal = topic.trim().to_lowercase();
        let stem = literal
            .strip_suffix('s')
            .filter(|stem| stem.chars().count() >= 4)
            .map(str::to_string);

        Self {
            topic: topic.to_string(),
            literal,
            stem,
        }
    }
}
