// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detached background worker launch

use std::process::{Command, Stdio};
use trl_core::config::STATE_DIR_ENV;
use trl_core::SinkKind;
use trl_engine::{EngineError, Relay, WorkerLauncher};

/// Re-executes this binary as `trl drain`, detached from the caller
pub struct DetachedLauncher {
    state_dir: std::path::PathBuf,
    enabled: bool,
}

impl DetachedLauncher {
    /// Launcher for `relay`; inert when the sink is disabled
    pub fn new(relay: &Relay) -> Self {
        Self {
            state_dir: relay.paths.root().to_path_buf(),
            enabled: relay.config.sink.kind != SinkKind::Disabled,
        }
    }
}

impl WorkerLauncher for DetachedLauncher {
    fn launch(&self) -> Result<(), EngineError> {
        if !self.enabled {
            return Ok(());
        }
        let exe = std::env::current_exe().map_err(|e| EngineError::Launch(e.to_string()))?;

        let mut cmd = Command::new(exe);
        cmd.arg("drain")
            .env(STATE_DIR_ENV, &self.state_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so the host's signals don't reach the worker
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .map_err(|e| EngineError::Launch(e.to_string()))?;
        tracing::debug!(pid = child.id(), "launched worker");
        Ok(())
    }
}
