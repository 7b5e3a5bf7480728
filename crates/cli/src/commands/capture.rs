// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capture hooks: `trl prompt`, `trl reply`, `trl recover`, `trl handoff`

use crate::hook::HookInput;
use crate::launch::DetachedLauncher;
use trl_engine::{Producer, Relay};

pub fn prompt(relay: &Relay, input: &HookInput) {
    let Some(prompt) = input.prompt.as_deref() else {
        tracing::warn!("prompt hook without a prompt");
        return;
    };
    let producer = Producer::new(relay, DetachedLauncher::new(relay));
    let outcome = producer.capture_local(prompt, relay.config.channel);
    tracing::info!(?outcome, session = input.session_id.as_deref(), "captured prompt");
}

pub fn reply(relay: &Relay, input: &HookInput) -> anyhow::Result<()> {
    let transcript = input.require_transcript()?;
    let producer = Producer::new(relay, DetachedLauncher::new(relay));
    let outcomes = producer.capture_counterpart(transcript, relay.config.channel)?;
    tracing::info!(?outcomes, session = input.session_id.as_deref(), "captured replies");
    Ok(())
}

pub fn recover(relay: &Relay) -> anyhow::Result<()> {
    let producer = Producer::new(relay, DetachedLauncher::new(relay));
    let outcomes = producer.recover()?;
    if !outcomes.is_empty() {
        tracing::info!(?outcomes, "replayed hand-off transcript");
    }
    Ok(())
}

pub fn handoff(relay: &Relay, input: &HookInput) -> anyhow::Result<()> {
    let transcript = input.require_transcript()?;
    let producer = Producer::new(relay, DetachedLauncher::new(relay));
    producer.write_handoff(transcript, relay.config.channel)?;
    tracing::info!(transcript = %transcript.display(), "wrote hand-off marker");
    Ok(())
}
