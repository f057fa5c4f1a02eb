//! Policy engine collaborators

use crate::error::Result;
use crate::types::{ChatMessage, EngineResponse};
use async_trait::async_trait;

#[cfg(feature = "http-engine")]
use crate::config::{EngineConfig, TopicConfig};
#[cfg(feature = "http-engine")]
use crate::error::RailsError;
#[cfg(feature = "http-engine")]
use serde::{Deserialize, Serialize};

/// Evaluates a conversation against the guardrail policy.
///
/// When the query touches a blocked topic the response must contain the
/// configured sentinel (`BLOCKED_TOPIC_DETECTED` by default), ideally
/// followed by the topic name.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Generate the policy response for `messages`
    async fn generate(&self, messages: &[ChatMessage]) -> Result<EngineResponse>;
}

/// Build the instruction that teaches a plain chat model the sentinel
/// protocol for the given topics
pub fn policy_instruction(sentinel: &str, topics: &[String]) -> String {
    format!(
        "You are a content policy checker. If the user's message is about any of \
         these topics: {}, reply with exactly \"{} <topic>\" naming the matching \
         topic and nothing else. Otherwise reply with \"ALLOWED\".",
        topics.join(", "),
        sentinel
    )
}

/// Policy engine backed by an OpenAI-compatible chat-completions endpoint
#[cfg(feature = "http-engine")]
pub struct ChatCompletionsEngine {
    config: EngineConfig,
    instruction: String,
    client: reqwest::Client,
}

#[cfg(feature = "http-engine")]
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[cfg(feature = "http-engine")]
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[cfg(feature = "http-engine")]
#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[cfg(feature = "http-engine")]
#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    role: Option<String>,
    content: Option<String>,
}

#[cfg(feature = "http-engine")]
impl ChatCompletionsEngine {
    /// Create a new engine. Fails when the HTTP client cannot be built or no
    /// API key is configured.
    pub fn new(config: EngineConfig, topics: &TopicConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(RailsError::Configuration(
                "policy engine API key is not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RailsError::Configuration(format!("HTTP client: {}", e)))?;

        let instruction = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| policy_instruction(&topics.sentinel, &topics.blocked_topics));

        Ok(Self {
            config,
            instruction,
            client,
        })
    }

    /// Request URL; Azure deployments use their own path layout
    fn url(&self) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        match &self.config.deployment {
            Some(deployment) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base,
                deployment,
                self.config.api_version.as_deref().unwrap_or("2024-02-01")
            ),
            None => format!("{}/chat/completions", base),
        }
    }
}

#[cfg(feature = "http-engine")]
#[async_trait]
impl PolicyEngine for ChatCompletionsEngine {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<EngineResponse> {
        let mut all_messages = Vec::with_capacity(messages.len() + 1);
        all_messages.push(ChatMessage::system(self.instruction.clone()));
        all_messages.extend(messages.iter().cloned());

        let request = CompletionRequest {
            model: match self.config.deployment {
                Some(_) => None,
                None => Some(self.config.model.as_str()),
            },
            messages: all_messages,
            temperature: 0.0,
        };

        let mut req = self.client.post(self.url()).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = if self.config.deployment.is_some() {
                req.header("api-key", api_key)
            } else {
                req.header("Authorization", format!("Bearer {}", api_key))
            };
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            return Err(RailsError::PolicyEngine(format!(
                "engine returned status: {}",
                response.status()
            )));
        }

        let completion: CompletionResponse = response.json().await?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RailsError::PolicyEngine("response has no choices".to_string()))?;

        // A filtered completion carries no verdict and must not read as a pass
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(RailsError::PolicyEngine(
                "response was withheld by the content filter".to_string(),
            ));
        }
        let content = choice
            .message
            .content
            .ok_or_else(|| RailsError::PolicyEngine("response has no content".to_string()))?;

        Ok(EngineResponse::Message {
            role: choice.message.role,
            content,
        })
    }
}
