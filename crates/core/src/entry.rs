// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL entry data model

use crate::content::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the conversation produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person typing into the host
    Local,
    /// The host's reply
    Counterpart,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Local => "local",
            Speaker::Counterpart => "counterpart",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote destination identifier
///
/// `0` means unresolved: the worker must find or create a fallback channel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl ChannelId {
    pub const UNRESOLVED: ChannelId = ChannelId(0);

    pub fn is_unresolved(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One captured turn, serialized as a single JSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub speaker: Speaker,
    pub channel: ChannelId,
    pub content: String,
    pub posted: bool,
    pub external_ref: Option<String>,
    pub hash: ContentHash,
}

impl WalEntry {
    /// Create an unposted entry, hashing its content
    pub fn new(
        seq: u64,
        ts: DateTime<Utc>,
        speaker: Speaker,
        channel: ChannelId,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let hash = ContentHash::of(&content);
        Self::with_hash(seq, ts, speaker, channel, content, hash)
    }

    /// Create an unposted entry with a precomputed hash
    pub fn with_hash(
        seq: u64,
        ts: DateTime<Utc>,
        speaker: Speaker,
        channel: ChannelId,
        content: impl Into<String>,
        hash: ContentHash,
    ) -> Self {
        Self {
            seq,
            ts,
            speaker,
            channel,
            content: content.into(),
            posted: false,
            external_ref: None,
            hash,
        }
    }

    /// Record delivery; `posted` is only ever set together with its reference
    pub fn mark_posted(&mut self, external_ref: impl Into<String>) {
        self.posted = true;
        self.external_ref = Some(external_ref.into());
    }

    /// Serialize to a single line (without trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse one line, rejecting records that break the posted/reference invariant
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        let entry: WalEntry = serde_json::from_str(line)?;
        if entry.posted && entry.external_ref.as_deref().is_none_or(str::is_empty) {
            return Err(serde::de::Error::custom(format!(
                "entry {} is posted without an external_ref",
                entry.seq
            )));
        }
        Ok(entry)
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
