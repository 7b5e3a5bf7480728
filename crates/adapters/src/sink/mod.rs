// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote sink adapters
//!
//! The sink is the external, append-only system of record. Only three
//! operations are used: append to a channel, list a channel's recent entries,
//! and find or create a channel by marker.

mod github;

pub use github::GhSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSink, SinkCall};

use async_trait::async_trait;
use thiserror::Error;
use trl_core::ChannelId;

/// Errors from sink operations
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("unexpected sink output: {0}")]
    Parse(String),
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// One entry already present in a remote channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Reference assigned by the sink
    pub id: String,
    pub body: String,
}

/// Adapter for the remote sink
#[async_trait]
pub trait Sink: Clone + Send + Sync + 'static {
    /// Append a body to a channel, returning the remote-assigned reference
    async fn append(&self, channel: ChannelId, body: &str) -> Result<String, SinkError>;

    /// Most recent entries of a channel, oldest first, at most `limit`
    async fn list_recent(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, SinkError>;

    /// Find a channel whose description contains `marker`, creating one if none does
    async fn find_or_create_channel(&self, marker: &str) -> Result<ChannelId, SinkError>;
}
