use async_trait::async_trait;
use hanzo_rails::config::{AuditConfig, OverlapPolicy, RailsConfig, DEFAULT_BLOCK_MESSAGE};
use hanzo_rails::engine::PolicyEngine;
use hanzo_rails::tagger::EntityTagger;
use hanzo_rails::topic::BlockSignal;
use hanzo_rails::{
    ChatMessage, CheckStatus, EngineResponse, EntitySpan, ErrorResponse, Rails, RailsError,
    ReasonCode, Result,
};
use std::sync::{Arc, Mutex};

/// Engine returning a canned response and recording what it was sent
struct ScriptedEngine {
    response: EngineResponse,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedEngine {
    fn new(response: EngineResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            seen: Mutex::new(vec![]),
        })
    }
}

#[async_trait]
impl PolicyEngine for ScriptedEngine {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<EngineResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(self.response.clone())
    }
}

struct DownEngine;

#[async_trait]
impl PolicyEngine for DownEngine {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<EngineResponse> {
        Err(RailsError::PolicyEngine("connection refused".to_string()))
    }
}

/// Tagger returning fixed spans
struct StaticTagger(Vec<EntitySpan>);

#[async_trait]
impl EntityTagger for StaticTagger {
    async fn tag(&self, _text: &str) -> Result<Vec<EntitySpan>> {
        Ok(self.0.clone())
    }
}

fn quiet_config() -> RailsConfig {
    RailsConfig {
        audit: AuditConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn rails(engine: Arc<dyn PolicyEngine>, spans: Vec<EntitySpan>) -> Rails {
    Rails::builder()
        .config(quiet_config())
        .engine(engine)
        .tagger(Arc::new(StaticTagger(spans)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn election_question_is_blocked_as_politics() {
    let engine = ScriptedEngine::new(EngineResponse::from(
        "BLOCKED_TOPIC_DETECTED: this question concerns politics.",
    ));
    let rails = rails(engine.clone(), vec![]);

    let outcome = rails
        .run_check("What is your opinion on the election?")
        .await
        .unwrap();

    assert!(!outcome.passed);
    assert_eq!(outcome.reason, ReasonCode::BlockedTopic);
    assert_eq!(outcome.message, DEFAULT_BLOCK_MESSAGE);
    assert_eq!(outcome.topics, vec!["politics".to_string()]);

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0],
        vec![ChatMessage::user("What is your opinion on the election?")]
    );
}

#[tokio::test]
async fn names_and_places_are_masked() {
    let engine = ScriptedEngine::new(EngineResponse::Message {
        role: Some("assistant".to_string()),
        content: "ALLOWED".to_string(),
    });
    let rails = rails(
        engine,
        vec![EntitySpan::new("GPE", 31, 37), EntitySpan::new("PERSON", 11, 16)],
    );

    let outcome = rails
        .run_check("My name is Sarah and I live in Boston")
        .await
        .unwrap();

    assert!(outcome.passed);
    assert_eq!(outcome.reason, ReasonCode::PiiMasked);
    assert_eq!(outcome.message, "My name is {name} and I live in {location}");
    assert!(outcome.topics.is_empty());
}

#[tokio::test]
async fn sentinel_without_known_topic_uses_fallback() {
    let rails = rails(
        ScriptedEngine::new(EngineResponse::from("BLOCKED_TOPIC_DETECTED")),
        vec![],
    );

    let outcome = rails.run_check("anything").await.unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.topics, vec!["blocked_topic".to_string()]);
}

#[tokio::test]
async fn blocked_query_is_never_tagged() {
    // A span past the end of the query would fail redaction if it were used
    let rails = rails(
        ScriptedEngine::new(EngineResponse::from("BLOCKED_TOPIC_DETECTED hate speech")),
        vec![EntitySpan::new("PERSON", 0, 500)],
    );

    let outcome = rails.run_check("short").await.unwrap();
    assert_eq!(outcome.reason, ReasonCode::BlockedTopic);
    assert_eq!(outcome.topics, vec!["hate speech".to_string()]);
}

#[tokio::test]
async fn missing_sentinel_always_passes() {
    for response in ["", "politics", "blocked topic detected", "Political advice is fine"] {
        let rails = rails(ScriptedEngine::new(EngineResponse::from(response)), vec![]);
        let outcome = rails.run_check("Tell me about Rome").await.unwrap();

        assert!(outcome.passed, "{:?}", response);
        assert!(outcome.topics.is_empty());
    }
}

#[tokio::test]
async fn policy_engine_failure_propagates() {
    let rails = rails(Arc::new(DownEngine), vec![]);

    let err = rails.run_check("hello").await.unwrap_err();
    assert!(matches!(err, RailsError::PolicyEngine(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn invalid_spans_pass_query_through() {
    let rails = rails(
        ScriptedEngine::new(EngineResponse::from("ok")),
        vec![EntitySpan::new("PERSON", 3, 99)],
    );

    let outcome = rails.run_check("I am Bob").await.unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.reason, ReasonCode::NoPiiDetected);
    assert_eq!(outcome.message, "I am Bob");
}

#[tokio::test]
async fn japanese_query_is_not_redacted() {
    let rails = rails(
        ScriptedEngine::new(EngineResponse::from("ok")),
        vec![EntitySpan::new("PERSON", 0, 2)],
    );

    let outcome = rails.run_check("田中さんは東京に住んでいます").await.unwrap();
    assert_eq!(outcome.reason, ReasonCode::NoPiiDetected);
    assert_eq!(outcome.message, "田中さんは東京に住んでいます");
}

#[tokio::test]
async fn nested_entities_keep_the_outer_span() {
    let rails = rails(
        ScriptedEngine::new(EngineResponse::from("ok")),
        vec![
            EntitySpan::new("GPE", 12, 19),
            EntitySpan::new("ORG", 4, 19),
            EntitySpan::new("DATE", 20, 25),
        ],
    );

    let outcome = rails.run_check("Ask Bank of America today").await.unwrap();
    assert_eq!(outcome.message, "Ask {organization} {date}");
}

#[tokio::test]
async fn legacy_overlap_policy_is_selectable() {
    let mut config = quiet_config();
    config.redaction.overlap_policy = OverlapPolicy::Unresolved;
    let rails = Rails::builder()
        .config(config)
        .engine(ScriptedEngine::new(EngineResponse::from("ok")))
        .tagger(Arc::new(StaticTagger(vec![
            EntitySpan::new("ORG", 4, 19),
            EntitySpan::new("GPE", 12, 19),
        ])))
        .build()
        .unwrap();

    let outcome = rails.run_check("Ask Bank of America today").await.unwrap();
    assert_eq!(outcome.reason, ReasonCode::PiiMasked);
    assert_ne!(outcome.message, "Ask {organization} today");
}

struct JsonVerdict;

impl BlockSignal for JsonVerdict {
    fn is_blocked(&self, response: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(response)
            .map(|v| v["allowed"] == false)
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn custom_block_signal_replaces_sentinel() {
    let rails = Rails::builder()
        .config(quiet_config())
        .engine(ScriptedEngine::new(EngineResponse::from(
            r#"{"allowed": false, "topic": "legal advice"}"#,
        )))
        .block_signal(JsonVerdict)
        .build()
        .unwrap();

    let outcome = rails.run_check("Can I sue my landlord?").await.unwrap();
    assert_eq!(outcome.reason, ReasonCode::BlockedTopic);
    assert_eq!(outcome.topics, vec!["legal advice".to_string()]);
}

#[tokio::test]
async fn client_response_shape() {
    let rails = rails(
        ScriptedEngine::new(EngineResponse::from("BLOCKED_TOPIC_DETECTED financial advice")),
        vec![],
    );

    let response = rails.run_check("Should I buy this stock?").await.unwrap().to_response();
    assert_eq!(response.result, CheckStatus::Fail);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["reason"], "blocked_topic");
    assert_eq!(json["topics_found"], serde_json::json!(["financial advice"]));
    assert_eq!(json["final_message"], DEFAULT_BLOCK_MESSAGE);

    let error = serde_json::to_value(ErrorResponse::processing_failed()).unwrap();
    assert_eq!(error, serde_json::json!({"error": "Processing failed"}));
}

#[tokio::test]
async fn concurrent_checks_share_one_instance() {
    let rails = Arc::new(rails(
        ScriptedEngine::new(EngineResponse::from("ok")),
        vec![EntitySpan::new("PERSON", 0, 4)],
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let rails = rails.clone();
            tokio::spawn(async move { rails.run_check("John lives here").await })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.message, "{name} lives here");
    }
}

#[cfg(feature = "patterns")]
#[tokio::test]
async fn pattern_tagger_masks_contact_details() {
    use hanzo_rails::tagger::PatternTagger;

    let rails = Rails::builder()
        .config(quiet_config())
        .engine(ScriptedEngine::new(EngineResponse::from("ok")))
        .tagger(Arc::new(PatternTagger::new().unwrap()))
        .build()
        .unwrap();

    let outcome = rails
        .run_check("Reach me at jane@corp.com or 555-867-5309")
        .await
        .unwrap();
    assert_eq!(outcome.message, "Reach me at {email} or {phone number}");
}

#[test]
fn redaction_is_idempotent_without_entities() {
    let rails = rails(ScriptedEngine::new(EngineResponse::from("ok")), vec![]);
    let text = "My name is {name} and I live in {location}";

    let redacted = tokio_test::block_on(rails.redact(text)).unwrap();
    assert_eq!(redacted.text, text);
}
