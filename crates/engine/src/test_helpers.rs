// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::{EngineError, Relay, WorkerLauncher};
use std::cell::Cell;
use std::time::Duration;
use tempfile::TempDir;
use trl_core::{FakeClock, RelayConfig, StatePaths};

pub fn user_line(text: &str) -> String {
    let line = serde_json::json!({"type": "user", "message": {"role": "user", "content": text}});
    format!("{line}\n")
}

pub fn assistant_line(text: &str) -> String {
    let line = serde_json::json!({
        "type": "assistant",
        "message": {"role": "assistant", "content": [{"type": "text", "text": text}]}
    });
    format!("{line}\n")
}

pub fn tool_result_line() -> String {
    let line = serde_json::json!({
        "type": "user",
        "message": {"role": "user", "content": [{"type": "tool_result", "tool_use_id": "t1", "content": "ok"}]}
    });
    format!("{line}\n")
}

/// Config with no real waiting
pub fn fast_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.worker.backoff = vec![Duration::ZERO; 2];
    config.worker.pace = Duration::ZERO;
    config.worker.attempt_timeout = Duration::from_secs(5);
    config.verify.wait = Duration::ZERO;
    config.locks.attempts = 50;
    config.locks.interval = Duration::from_millis(5);
    config
}

pub struct TestRelay {
    pub dir: TempDir,
    pub relay: Relay<FakeClock>,
    pub clock: FakeClock,
}

pub fn test_relay() -> TestRelay {
    test_relay_with(fast_config())
}

pub fn test_relay_with(config: RelayConfig) -> TestRelay {
    let dir = tempfile::tempdir().unwrap();
    let paths = StatePaths::at(dir.path().join(".trl")).unwrap();
    let clock = FakeClock::new();
    let relay = Relay::with_clock(paths, config, clock.clone());
    TestRelay { dir, relay, clock }
}

/// Counts launches instead of spawning anything
#[derive(Default)]
pub struct CountingLauncher {
    pub launches: Cell<usize>,
}

impl WorkerLauncher for CountingLauncher {
    fn launch(&self) -> Result<(), EngineError> {
        self.launches.set(self.launches.get() + 1);
        Ok(())
    }
}
