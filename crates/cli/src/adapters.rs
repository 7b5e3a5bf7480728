// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sink factory for CLI commands

use trl_adapters::{GhSink, TracedSink};
use trl_core::{SinkConfig, SinkKind};

/// The configured production sink, or `None` when delivery is disabled
pub fn make_sink(config: &SinkConfig) -> Option<TracedSink<GhSink>> {
    match config.kind {
        SinkKind::Github => Some(TracedSink::new(GhSink::new(config.repo.clone()))),
        SinkKind::Disabled => None,
    }
}
