//! Audit logging for Rails

use crate::config::AuditConfig;
use crate::error::Result;
use crate::types::{AuditEntry, AuditResult, Outcome, ReasonCode, RequestContext};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{info, warn};

/// Audit logger
pub struct AuditLogger {
    config: AuditConfig,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Record the outcome of one check
    pub fn log(
        &self,
        context: &RequestContext,
        query: &str,
        outcome: &Outcome,
        redaction_count: usize,
        duration_ms: u64,
    ) {
        if !self.config.enabled {
            return;
        }

        let result = match outcome.reason {
            ReasonCode::BlockedTopic => AuditResult::Blocked {
                topics: outcome.topics.clone(),
            },
            ReasonCode::PiiMasked => AuditResult::Redacted {
                count: redaction_count,
            },
            ReasonCode::NoPiiDetected => AuditResult::Passed,
        };

        let entry = AuditEntry {
            context: context.clone(),
            content_hash: hash_content(query),
            result,
            processing_time_ms: duration_ms,
        };

        self.emit(&entry, query);
    }

    /// Emit an audit entry
    fn emit(&self, entry: &AuditEntry, query: &str) {
        let content_field = if self.config.log_content {
            Some(truncate(query, 500))
        } else {
            None
        };

        if self.config.log_stdout {
            let content_info = if self.config.log_content {
                format!(", content={}", truncate(query, 100))
            } else {
                String::new()
            };

            println!(
                "[AUDIT] {} | {} | result={:?} | {}ms{}",
                entry.context.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.context.request_id,
                entry.result,
                entry.processing_time_ms,
                content_info
            );
        }

        info!(
            request_id = %entry.context.request_id,
            user_id = ?entry.context.user_id,
            session_id = ?entry.context.session_id,
            content_hash = %entry.content_hash,
            result = ?entry.result,
            processing_time_ms = entry.processing_time_ms,
            content = ?content_field,
            "Rails audit"
        );

        if let Some(ref path) = self.config.log_file {
            if let Err(e) = append_json_line(path, entry) {
                warn!(path = %path, error = %e, "Failed to write audit entry");
            }
        }
    }
}

fn append_json_line(path: &str, entry: &AuditEntry) -> Result<()> {
    use std::io::Write;

    let json = serde_json::to_string(entry)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{json}")?;
    Ok(())
}

/// Hash content for audit (privacy-preserving)
fn hash_content(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Truncate to `max_chars` characters for logging
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("test");
        let hash2 = hash_content("test");
        let hash3 = hash_content("different");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a longer string", 10), "this is a ...");
        assert_eq!(truncate("東京都東京都", 2), "東京...");
    }

    #[test]
    fn test_audit_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(AuditConfig {
            enabled: false,
            log_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        });

        let outcome = Outcome::cleared("hello", "hello".to_string());
        logger.log(&RequestContext::default(), "hello", &outcome, 0, 1);

        assert!(!path.exists());
    }

    #[test]
    fn test_audit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(AuditConfig {
            log_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        });

        let ctx = RequestContext::new()
            .with_user_id("user123")
            .with_session_id("session-7");
        logger.log(
            &ctx,
            "I am Bob",
            &Outcome::cleared("I am Bob", "I am {name}".to_string()),
            1,
            3,
        );
        logger.log(&ctx, "vote?", &Outcome::blocked("notice", "politics"), 0, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<AuditEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].context.session_id.as_deref(), Some("session-7"));
        assert_eq!(entries[0].result, AuditResult::Redacted { count: 1 });
        assert_eq!(
            entries[1].result,
            AuditResult::Blocked {
                topics: vec!["politics".to_string()]
            }
        );
        assert!(!contents.contains("Bob"));
    }

    #[test]
    fn test_append_to_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let entry = AuditEntry {
            context: RequestContext::new(),
            content_hash: hash_content("hello"),
            result: AuditResult::Passed,
            processing_time_ms: 0,
        };

        let err = append_json_line(&dir.path().to_string_lossy(), &entry).unwrap_err();
        assert!(matches!(err, crate::error::RailsError::Io(_)));
    }
}
