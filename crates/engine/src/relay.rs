// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process relay context

use crate::EngineError;
use trl_core::{Clock, RelayConfig, StatePaths, SystemClock};
use trl_storage::{
    ChannelMap, HandoffMarker, LockPolicy, StateFile, VerifyCheckpoint, WalStore, Watermarks,
};

/// Configuration, state layout, and the WAL, resolved once per process
#[derive(Clone)]
pub struct Relay<C: Clock = SystemClock> {
    pub config: RelayConfig,
    pub paths: StatePaths,
    pub store: WalStore<C>,
    clock: C,
}

impl Relay<SystemClock> {
    /// Load configuration from the state directory
    pub fn open(paths: StatePaths) -> Result<Self, EngineError> {
        let config = RelayConfig::load(&paths)?;
        Ok(Self::new(paths, config))
    }

    pub fn new(paths: StatePaths, config: RelayConfig) -> Self {
        Self::with_clock(paths, config, SystemClock)
    }
}

impl<C: Clock> Relay<C> {
    pub fn with_clock(paths: StatePaths, config: RelayConfig, clock: C) -> Self {
        let policy = LockPolicy::from_config(&config.locks);
        let store = WalStore::with_clock(&paths, policy, clock.clone());
        Self {
            config,
            paths,
            store,
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy::from_config(&self.config.locks)
    }

    pub fn watermarks(&self) -> StateFile<Watermarks> {
        StateFile::new(self.paths.watermarks(), self.lock_policy())
    }

    pub fn handoff(&self) -> StateFile<Option<HandoffMarker>> {
        StateFile::new(self.paths.handoff(), self.lock_policy())
    }

    pub fn channels(&self) -> StateFile<ChannelMap> {
        StateFile::new(self.paths.channels(), self.lock_policy())
    }

    pub fn checkpoint(&self) -> StateFile<VerifyCheckpoint> {
        StateFile::new(self.paths.verified(), self.lock_policy())
    }
}
