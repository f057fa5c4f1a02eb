//! # Hanzo Rails
//!
//! Topic guardrails and PII redaction for user queries, run before the query
//! reaches a conversational model.
//!
//! Each query goes through two checks:
//!
//! - **Topic Guard**: a policy engine evaluates the query; if its response
//!   carries the block sentinel, the query fails with the offending topic
//! - **PII Redactor**: otherwise the query is tagged for entities and every
//!   person, place, date, organization, phone number and email is replaced by
//!   a placeholder such as `{name}`
//!
//! ## Quick Start
//!
//! ```rust
//! use hanzo_rails::prelude::*;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Engine;
//!
//! #[async_trait]
//! impl PolicyEngine for Engine {
//!     async fn generate(&self, _messages: &[ChatMessage]) -> Result<EngineResponse> {
//!         Ok("ALLOWED".into())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let rails = Rails::builder().engine(Arc::new(Engine)).build()?;
//!
//!     let outcome = rails.run_check("What is the capital of France?").await?;
//!     assert!(outcome.passed);
//!     assert_eq!(outcome.reason, ReasonCode::NoPiiDetected);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! query ──► PolicyEngine ──► TopicGuard ──blocked──► Outcome { passed: false }
//!                                │
//!                              clear
//!                                ▼
//!                  EntityTagger ──► Redactor ──► Outcome { passed: true }
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod rails;
pub mod redact;
pub mod tagger;
pub mod topic;
pub mod types;

pub use config::RailsConfig;
pub use error::{RailsError, Result};
pub use rails::{Rails, RailsBuilder};
pub use types::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::RailsConfig;
    pub use crate::engine::PolicyEngine;
    pub use crate::error::{RailsError, Result};
    pub use crate::rails::Rails;
    pub use crate::tagger::EntityTagger;
    pub use crate::types::*;
}
