// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RemoteEntry, Sink, SinkError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use trl_core::ChannelId;

/// Recorded sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Append { channel: ChannelId, body: String },
    ListRecent { channel: ChannelId, limit: usize },
    FindOrCreate { marker: String },
}

type Rewrite = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Default)]
struct FakeState {
    channels: BTreeMap<ChannelId, Vec<RemoteEntry>>,
    markers: BTreeMap<String, ChannelId>,
    calls: Vec<SinkCall>,
    next_id: u64,
    next_channel: u64,
    fail_containing: Vec<String>,
    fail_next: usize,
    fail_listing: bool,
    rewrite: Option<Rewrite>,
}

/// Fake sink that stores entries in memory and records every call
#[derive(Clone)]
pub struct FakeSink {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSink {
    pub fn new() -> Self {
        let state = FakeState {
            next_id: 1,
            next_channel: 1000,
            ..FakeState::default()
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SinkCall> {
        self.state().calls.clone()
    }

    /// Bodies appended through `append`, in call order
    pub fn appended(&self) -> Vec<(ChannelId, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Append { channel, body } => Some((*channel, body.clone())),
                _ => None,
            })
            .collect()
    }

    /// Current contents of a channel
    pub fn entries(&self, channel: ChannelId) -> Vec<RemoteEntry> {
        self.state().channels.get(&channel).cloned().unwrap_or_default()
    }

    /// Seed a remote entry directly, as if posted by an earlier run
    pub fn insert_entry(&self, channel: ChannelId, body: impl Into<String>) -> String {
        let mut state = self.state();
        let id = format!("c{}", state.next_id);
        state.next_id += 1;
        state.channels.entry(channel).or_default().push(RemoteEntry {
            id: id.clone(),
            body: body.into(),
        });
        id
    }

    /// Register a channel under a marker
    pub fn insert_channel(&self, marker: impl Into<String>, channel: ChannelId) {
        self.state().markers.insert(marker.into(), channel);
    }

    /// Fail every append whose body contains `needle`
    pub fn fail_appends_containing(&self, needle: impl Into<String>) {
        self.state().fail_containing.push(needle.into());
    }

    /// Fail the next `count` appends regardless of body
    pub fn fail_next_appends(&self, count: usize) {
        self.state().fail_next = count;
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state().fail_listing = fail;
    }

    /// Transform bodies on the way in, as a sink that rewrites links would
    pub fn rewrite_bodies<F>(&self, f: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.state().rewrite = Some(Arc::new(f));
    }
}

#[async_trait]
impl Sink for FakeSink {
    async fn append(&self, channel: ChannelId, body: &str) -> Result<String, SinkError> {
        let mut state = self.state();
        state.calls.push(SinkCall::Append {
            channel,
            body: body.to_string(),
        });

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(SinkError::CommandFailed("injected failure".to_string()));
        }
        if state.fail_containing.iter().any(|needle| body.contains(needle)) {
            return Err(SinkError::CommandFailed("injected failure".to_string()));
        }

        let stored = match &state.rewrite {
            Some(rewrite) => rewrite(body),
            None => body.to_string(),
        };
        let id = format!("c{}", state.next_id);
        state.next_id += 1;
        state.channels.entry(channel).or_default().push(RemoteEntry {
            id: id.clone(),
            body: stored,
        });
        Ok(id)
    }

    async fn list_recent(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, SinkError> {
        let mut state = self.state();
        state.calls.push(SinkCall::ListRecent { channel, limit });
        if state.fail_listing {
            return Err(SinkError::CommandFailed("injected listing failure".to_string()));
        }
        let entries = state.channels.get(&channel).cloned().unwrap_or_default();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }

    async fn find_or_create_channel(&self, marker: &str) -> Result<ChannelId, SinkError> {
        let mut state = self.state();
        state.calls.push(SinkCall::FindOrCreate {
            marker: marker.to_string(),
        });
        if let Some(channel) = state.markers.get(marker) {
            return Ok(*channel);
        }
        let channel = ChannelId(state.next_channel);
        state.next_channel += 1;
        state.markers.insert(marker.to_string(), channel);
        state.channels.entry(channel).or_default();
        Ok(channel)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
