// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Turn relay engine: capture, delivery, and verification

mod delivery;
mod error;
mod launch;
pub mod matching;
mod producer;
mod relay;
pub mod transcript;
mod verifier;
mod worker;

pub use error::EngineError;
pub use launch::{NoLaunch, WorkerLauncher};
pub use producer::{CaptureOutcome, Producer};
pub use relay::Relay;
pub use transcript::{Turn, TranscriptChunk};
pub use verifier::{Finding, Problem, Verdict, Verifier};
pub use worker::{DrainReport, Worker};

#[cfg(test)]
mod test_helpers;
