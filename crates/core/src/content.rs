// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content normalization and fingerprints
//!
//! Three fingerprints of a turn's text are used to recognise it again after
//! delivery, from strictest to loosest:
//! - [`ContentHash`]: digest of the normalized text, used for dedup
//! - [`signature`]: alphanumeric prefix of the normalized text
//! - [`salient_terms`]: the set of key terms, compared by overlap

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Number of hex characters in a [`ContentHash`]
pub const HASH_HEX_LEN: usize = 16;

/// Shortest term considered salient
const MIN_TERM_LEN: usize = 4;

/// Common words that carry no signal when comparing turns
const STOPWORDS: &[&str] = &[
    "about", "also", "been", "could", "does", "from", "have", "here", "into", "just", "like",
    "more", "only", "should", "some", "than", "that", "their", "them", "then", "there", "they",
    "this", "very", "were", "what", "when", "which", "will", "with", "would", "your",
];

/// Lower-case and collapse every whitespace run to a single space
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Error returned when a stored hash is not 16 lowercase hex characters
#[derive(Debug, Clone, Error)]
#[error("invalid content hash: {0:?}")]
pub struct InvalidHash(pub String);

/// Fixed-length digest of normalized content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash the normalized form of `content`
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize(content).as_bytes());
        let result = hasher.finalize();
        Self(hex_encode(&result[..HASH_HEX_LEN / 2]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentHash {
    type Error = InvalidHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let valid = value.len() == HASH_HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(value))
        } else {
            Err(InvalidHash(value))
        }
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Hex encoding helper
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Normalized, punctuation-free prefix of `text`, at most `len` characters
///
/// Survives markup changes that keep the words in order (quoting, link
/// brackets, emphasis), which the exact hash does not.
pub fn signature(text: &str, len: usize) -> String {
    let stripped: String = normalize(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(len)
        .collect()
}

/// True when two signatures agree over their common prefix of at least `min_len` chars
pub fn signatures_agree(a: &str, b: &str, min_len: usize) -> bool {
    let common = a.chars().count().min(b.chars().count());
    if common < min_len {
        return false;
    }
    a.chars().take(common).eq(b.chars().take(common))
}

/// Distinct key terms of `text`: alphanumeric words of 4+ chars, minus stopwords
pub fn salient_terms(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TERM_LEN)
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Fraction of `source` terms that also occur in `candidate`
///
/// Returns `None` when `source` has no salient terms, in which case overlap
/// says nothing about whether the texts match.
pub fn term_coverage(source: &BTreeSet<String>, candidate: &str) -> Option<f64> {
    if source.is_empty() {
        return None;
    }
    let candidate = salient_terms(candidate);
    let shared = source.intersection(&candidate).count();
    Some(shared as f64 / source.len() as f64)
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;
