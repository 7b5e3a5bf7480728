// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced sink wrapper for consistent observability

use crate::sink::{RemoteEntry, Sink, SinkError};
use async_trait::async_trait;
use tracing::Instrument;
use trl_core::ChannelId;

/// Wrapper that adds tracing to any Sink
#[derive(Clone)]
pub struct TracedSink<S> {
    inner: S,
}

impl<S> TracedSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Sink> Sink for TracedSink<S> {
    async fn append(&self, channel: ChannelId, body: &str) -> Result<String, SinkError> {
        let span = tracing::info_span!("sink.append", %channel);
        async {
            tracing::debug!(body_len = body.len(), "appending");

            let start = std::time::Instant::now();
            let result = self.inner.append(channel, body).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(external_ref) => tracing::info!(external_ref, elapsed_ms, "appended"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "append failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn list_recent(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, SinkError> {
        let span = tracing::info_span!("sink.list_recent", %channel, limit);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.list_recent(channel, limit).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(entries) => tracing::debug!(count = entries.len(), elapsed_ms, "listed"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "list failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn find_or_create_channel(&self, marker: &str) -> Result<ChannelId, SinkError> {
        let span = tracing::info_span!("sink.find_or_create", marker);
        async {
            let result = self.inner.find_or_create_channel(marker).await;
            match &result {
                Ok(channel) => tracing::info!(%channel, "resolved fallback channel"),
                Err(e) => tracing::error!(error = %e, "channel resolution failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
