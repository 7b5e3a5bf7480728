// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivered body layout
//!
//! Every body starts with the speaker marker and a timestamp, followed by a
//! separator line, followed by the verbatim turn content:
//!
//! ```text
//! **User** · 2026-10-14 12:00:00 UTC
//!
//! ---
//!
//! <content>
//! ```

use crate::content::{salient_terms, term_coverage, ContentHash};
use crate::entry::{Speaker, WalEntry};
use std::fmt;

/// Line separating the header from the content
pub const SEPARATOR: &str = "---";

/// Leading marker identifying the speaker of a delivered body
pub fn speaker_marker(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::Local => "**User**",
        Speaker::Counterpart => "**Assistant**",
    }
}

/// Render the body delivered to the sink for an entry
pub fn render_body(entry: &WalEntry) -> String {
    format!(
        "{} · {}\n\n{}\n\n{}",
        speaker_marker(entry.speaker),
        entry.ts.format("%Y-%m-%d %H:%M:%S UTC"),
        SEPARATOR,
        entry.content
    )
}

/// Content portion of a delivered body (everything after the first separator line)
///
/// Bodies without a separator are returned whole.
pub fn extract_content(body: &str) -> &str {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == SEPARATOR {
            return body[offset..].trim_matches('\n');
        }
    }
    body
}

/// Hash of the content portion of a delivered body
pub fn body_hash(body: &str) -> ContentHash {
    ContentHash::of(extract_content(body))
}

/// Structural problem with a delivered body
#[derive(Debug, Clone, PartialEq)]
pub enum FormatViolation {
    MissingSpeakerMarker { expected: &'static str },
    MissingSeparator,
    Truncated { coverage: f64 },
}

impl fmt::Display for FormatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatViolation::MissingSpeakerMarker { expected } => {
                write!(f, "missing speaker marker {}", expected)
            }
            FormatViolation::MissingSeparator => write!(f, "missing '{}' separator", SEPARATOR),
            FormatViolation::Truncated { coverage } => write!(
                f,
                "truncated: only {:.0}% of key terms present",
                coverage * 100.0
            ),
        }
    }
}

/// Check a delivered body against the entry it was matched to
///
/// `threshold` is the minimum fraction of the entry's salient terms that must
/// survive in the delivered content.
pub fn check_conformance(entry: &WalEntry, body: &str, threshold: f64) -> Vec<FormatViolation> {
    let mut violations = Vec::new();

    let expected = speaker_marker(entry.speaker);
    if !body.trim_start().starts_with(expected) {
        violations.push(FormatViolation::MissingSpeakerMarker { expected });
    }

    if !body.lines().any(|line| line.trim() == SEPARATOR) {
        violations.push(FormatViolation::MissingSeparator);
    }

    let content = extract_content(body);
    if ContentHash::of(content) != entry.hash {
        let source = salient_terms(&entry.content);
        if let Some(coverage) = term_coverage(&source, content) {
            if coverage < threshold {
                violations.push(FormatViolation::Truncated { coverage });
            }
        }
    }

    violations
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
