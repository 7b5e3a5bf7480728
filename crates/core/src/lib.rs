// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trl-core: Core types for the Turn Relay (trl) hook tool
//!
//! This crate provides:
//! - The WAL entry data model (speaker, channel, content hash)
//! - Content normalization, signatures, and salient-term overlap
//! - Rendering of delivered bodies and their conformance checks
//! - Clock abstraction and per-process configuration

pub mod clock;
pub mod config;
pub mod content;
pub mod entry;
pub mod render;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ConfigError, LocksConfig, RelayConfig, SinkConfig, SinkKind, StatePaths, VerifyConfig,
    WorkerConfig, STATE_DIR_NAME,
};
pub use content::{normalize, salient_terms, signature, term_coverage, ContentHash, InvalidHash};
pub use entry::{ChannelId, Speaker, WalEntry};
pub use render::{check_conformance, extract_content, render_body, FormatViolation};
