// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `trl drain` - the background worker

use crate::adapters::make_sink;
use trl_engine::{Relay, Worker};

pub async fn drain(relay: &Relay) -> anyhow::Result<()> {
    let Some(sink) = make_sink(&relay.config.sink) else {
        tracing::info!("sink disabled, nothing to drain");
        return Ok(());
    };
    let report = Worker::new(relay, sink).drain().await?;
    if !report.failed.is_empty() {
        tracing::warn!(failed = ?report.failed, "entries left unposted");
    }
    Ok(())
}
