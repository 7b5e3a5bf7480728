// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivering one WAL entry to the sink
//!
//! Shared by the worker and the verifier's inline delivery. Remote listings
//! are cached per channel for the lifetime of a `Delivery`, and every body
//! this process delivers is added to the cache.

use crate::{EngineError, Relay};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use trl_adapters::{RemoteEntry, Sink, SinkError};
use trl_core::render::body_hash;
use trl_core::{render_body, ChannelId, Clock, WalEntry};

/// How an entry reached the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivered {
    Posted(String),
    /// Pre-flight dedup found it already present remotely
    AlreadyPresent(String),
}

impl Delivered {
    pub(crate) fn external_ref(&self) -> &str {
        match self {
            Delivered::Posted(r) | Delivered::AlreadyPresent(r) => r,
        }
    }
}

pub(crate) struct Delivery<'a, C: Clock, S> {
    relay: &'a Relay<C>,
    sink: &'a S,
    fallback: Option<ChannelId>,
    remote: HashMap<ChannelId, Vec<RemoteEntry>>,
}

impl<'a, C: Clock, S: Sink> Delivery<'a, C, S> {
    pub(crate) fn new(relay: &'a Relay<C>, sink: &'a S) -> Self {
        Self {
            relay,
            sink,
            fallback: None,
            remote: HashMap::new(),
        }
    }

    /// Drop cached listings so the next lookup sees fresh remote state
    pub(crate) fn refresh(&mut self) {
        self.remote.clear();
    }

    /// Channel an entry is delivered to, resolving the fallback when unset
    pub(crate) async fn resolve_channel(
        &mut self,
        channel: ChannelId,
    ) -> Result<ChannelId, EngineError> {
        if !channel.is_unresolved() {
            return Ok(channel);
        }
        if let Some(fallback) = self.fallback {
            return Ok(fallback);
        }

        let marker = self.relay.config.sink.fallback_marker.clone();
        let channels = self.relay.channels();
        let fallback = match channels.load()?.get(&marker) {
            Some(known) => known,
            None => {
                let created = self
                    .bounded(self.sink.find_or_create_channel(&marker))
                    .await?;
                channels.update(|map| map.remember(&marker, created))?;
                created
            }
        };
        self.fallback = Some(fallback);
        Ok(fallback)
    }

    /// Fallback channel if one is already known, without contacting the sink
    pub(crate) fn known_channel(&self, channel: ChannelId) -> Option<ChannelId> {
        if !channel.is_unresolved() {
            return Some(channel);
        }
        self.fallback.or_else(|| {
            let marker = &self.relay.config.sink.fallback_marker;
            self.relay.channels().load().ok()?.get(marker)
        })
    }

    /// Recent remote entries of a channel, listed once and then cached
    pub(crate) async fn remote_entries(
        &mut self,
        channel: ChannelId,
    ) -> Result<&[RemoteEntry], SinkError> {
        if !self.remote.contains_key(&channel) {
            let limit = self.relay.config.sink.list_limit;
            let listed = self.bounded(self.sink.list_recent(channel, limit)).await?;
            self.remote.insert(channel, listed);
        }
        Ok(self.remote.get(&channel).map(Vec::as_slice).unwrap_or_default())
    }

    /// Deliver `entry`, trying up to `attempts` times, and mark it posted
    ///
    /// A failure to mark the entry posted is logged and otherwise ignored: the
    /// next pass finds the remote copy through pre-flight dedup.
    pub(crate) async fn deliver(
        &mut self,
        entry: &WalEntry,
        attempts: usize,
    ) -> Result<Delivered, EngineError> {
        let channel = self.resolve_channel(entry.channel).await?;

        let delivered = match self.preflight(entry, channel).await {
            Some(existing) => Delivered::AlreadyPresent(existing),
            None => {
                let body = render_body(entry);
                let external_ref = self.append_with_retry(channel, &body, attempts).await?;
                self.remote.entry(channel).or_default().push(RemoteEntry {
                    id: external_ref.clone(),
                    body,
                });
                Delivered::Posted(external_ref)
            }
        };

        match self.relay.store.mark_posted(entry.seq, delivered.external_ref()) {
            Ok(true) => {}
            Ok(false) => tracing::warn!(seq = entry.seq, "entry vanished before it was marked"),
            Err(e) => tracing::error!(
                seq = entry.seq,
                error = %e,
                "delivered but not marked posted; dedup will reconcile"
            ),
        }
        Ok(delivered)
    }

    /// Remote id of an existing copy of `entry`, matched by content hash
    async fn preflight(&mut self, entry: &WalEntry, channel: ChannelId) -> Option<String> {
        match self.remote_entries(channel).await {
            Ok(remote) => remote
                .iter()
                .find(|r| body_hash(&r.body) == entry.hash)
                .map(|r| r.id.clone()),
            Err(e) => {
                tracing::warn!(seq = entry.seq, %channel, error = %e, "pre-flight listing failed");
                None
            }
        }
    }

    async fn append_with_retry(
        &self,
        channel: ChannelId,
        body: &str,
        attempts: usize,
    ) -> Result<String, SinkError> {
        let backoff = &self.relay.config.worker.backoff;
        let mut attempt = 0;
        loop {
            match self.bounded(self.sink.append(channel, body)).await {
                Ok(external_ref) => return Ok(external_ref),
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts.max(1) {
                        return Err(e);
                    }
                    let delay = backoff
                        .get(attempt - 1)
                        .or(backoff.last())
                        .copied()
                        .unwrap_or(Duration::ZERO);
                    tracing::warn!(%channel, attempt, error = %e, ?delay, "append failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Bound a sink call by the per-attempt timeout
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, SinkError>>,
    ) -> Result<T, SinkError> {
        let limit = self.relay.config.worker.attempt_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| SinkError::Timeout(limit))?
    }
}
