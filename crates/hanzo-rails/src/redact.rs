//! Entity-driven PII redaction

use crate::config::{OverlapPolicy, RedactionConfig};
use crate::error::{RailsError, Result};
use crate::types::{AppliedRedaction, EntityKind, EntitySpan, Redacted};
use std::iter;

/// Replaces tagged entity spans with semantic placeholders
pub struct Redactor {
    config: RedactionConfig,
}

/// A span that survived label filtering and validation
#[derive(Debug, Clone, Copy)]
struct Candidate {
    kind: EntityKind,
    start: usize,
    end: usize,
}

impl Redactor {
    /// Create a new redactor with the given configuration
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// Whether `text` bypasses redaction entirely.
    ///
    /// The tagger is only reliable on Latin-script text, so anything with a
    /// CJK character near the start is left alone.
    pub fn is_gated(&self, text: &str) -> bool {
        !self.config.enabled || is_cjk_dominant(text, self.config.script_gate_window)
    }

    /// Replace every mapped entity span in `text` with its placeholder.
    ///
    /// Offsets in `entities` are character indices into `text`. Spans whose
    /// label has no placeholder are ignored. The result does not depend on
    /// the order of `entities`.
    pub fn redact(&self, text: &str, entities: &[EntitySpan]) -> Result<Redacted> {
        if self.is_gated(text) {
            return Ok(Redacted::unchanged(text));
        }

        let char_len = text.chars().count();
        let mut candidates = Vec::with_capacity(entities.len());
        for span in entities {
            let Some(kind) = span.kind() else {
                continue;
            };
            if span.start >= span.end || span.end > char_len {
                return Err(RailsError::Redaction(format!(
                    "{} span {}..{} is invalid for text of {} characters",
                    span.label, span.start, span.end, char_len
                )));
            }
            candidates.push(Candidate {
                kind,
                start: span.start,
                end: span.end,
            });
        }

        if candidates.is_empty() {
            return Ok(Redacted::unchanged(text));
        }

        match self.config.overlap_policy {
            OverlapPolicy::KeepOutermost => Ok(replace_outermost(text, candidates)),
            OverlapPolicy::Unresolved => Ok(replace_unresolved(text, candidates)),
        }
    }
}

/// Sort by start, widest first on ties, and drop every span that starts
/// before the previous kept span ends. Kept spans are disjoint, so replacing
/// right to left leaves the byte offsets of the remaining spans valid.
fn replace_outermost(text: &str, mut candidates: Vec<Candidate>) -> Redacted {
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match kept.last() {
            Some(last) if candidate.start < last.end => {
                tracing::trace!(
                    kind = %candidate.kind,
                    start = candidate.start,
                    end = candidate.end,
                    "Dropping overlapping entity span"
                );
            }
            _ => kept.push(candidate),
        }
    }

    let offsets = byte_offsets(text);
    let mut out = text.to_string();
    for candidate in kept.iter().rev() {
        let range = offsets[candidate.start]..offsets[candidate.end];
        out.replace_range(range, &candidate.kind.token());
    }

    Redacted {
        text: out,
        redactions: kept.into_iter().map(applied).collect(),
    }
}

/// Replace every span on a mutating copy, rightmost start first, slicing
/// the current text at the original offsets.
fn replace_unresolved(text: &str, mut candidates: Vec<Candidate>) -> Redacted {
    candidates.sort_by_key(|c| c.start);

    let mut chars: Vec<char> = text.chars().collect();
    for candidate in candidates.iter().rev() {
        let start = candidate.start.min(chars.len());
        let end = candidate.end.clamp(start, chars.len());
        chars.splice(start..end, candidate.kind.token().chars());
    }

    Redacted {
        text: chars.into_iter().collect(),
        redactions: candidates.into_iter().map(applied).collect(),
    }
}

fn applied(candidate: Candidate) -> AppliedRedaction {
    AppliedRedaction {
        kind: candidate.kind,
        start: candidate.start,
        end: candidate.end,
        replacement: candidate.kind.token(),
    }
}

/// Byte offset of every character boundary, including the end of the text
fn byte_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(iter::once(text.len()))
        .collect()
}

/// CJK symbols, kana and unified ideographs
fn is_cjk(c: char) -> bool {
    ('\u{3000}'..='\u{9FFF}').contains(&c)
}

/// Whether any of the first `window` characters is CJK
pub fn is_cjk_dominant(text: &str, window: usize) -> bool {
    text.chars().take(window).any(is_cjk)
}
