// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seam for starting a background worker after a capture

use crate::EngineError;

/// Starts a detached worker and returns without waiting for it
pub trait WorkerLauncher {
    fn launch(&self) -> Result<(), EngineError>;
}

/// Launcher that never starts anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLaunch;

impl WorkerLauncher for NoLaunch {
    fn launch(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

impl<L: WorkerLauncher + ?Sized> WorkerLauncher for &L {
    fn launch(&self) -> Result<(), EngineError> {
        (**self).launch()
    }
}
