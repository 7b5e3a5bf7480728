// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic sequence allocation backed by a counter file
//!
//! The counter file holds the *next* value to hand out. It is only read and
//! written under the counter lock.

use crate::atomic::write_atomic;
use crate::lock::{FileLock, LockPolicy};
use crate::StorageError;
use std::path::PathBuf;
use trl_core::{Clock, StatePaths, SystemClock};

/// First id of the range reserved for clock-derived fallback ids
///
/// Real sequence ids stay far below this, so a fallback id can never equal
/// one. Fallback ids are never written to the WAL.
pub const FALLBACK_SEQ_BASE: u64 = 1_000_000_000_000_000_000;

/// True for ids produced by [`Sequencer::get_next`] under lock contention
pub fn is_fallback_seq(seq: u64) -> bool {
    seq >= FALLBACK_SEQ_BASE
}

/// Allocates strictly increasing ids shared by every process using the state directory
#[derive(Clone)]
pub struct Sequencer<C: Clock = SystemClock> {
    counter: PathBuf,
    lock: PathBuf,
    policy: LockPolicy,
    clock: C,
}

impl Sequencer<SystemClock> {
    pub fn new(paths: &StatePaths, policy: LockPolicy) -> Self {
        Self::with_clock(paths, policy, SystemClock)
    }
}

impl<C: Clock> Sequencer<C> {
    pub fn with_clock(paths: &StatePaths, policy: LockPolicy, clock: C) -> Self {
        Self {
            counter: paths.counter(),
            lock: paths.counter_lock(),
            policy,
            clock,
        }
    }

    /// Allocate the next id, falling back to a clock-derived id when the lock stays busy
    ///
    /// The fallback keeps callers moving under extreme contention. It lies in
    /// the disjoint range above [`FALLBACK_SEQ_BASE`].
    pub fn get_next(&self) -> u64 {
        match self.allocate(1) {
            Ok(seq) => seq,
            Err(e) => {
                let fallback = self.fallback_id();
                tracing::warn!(error = %e, fallback, "sequence allocation fell back to clock id");
                fallback
            }
        }
    }

    /// Allocate the next id, never lower than `floor`, or fail
    ///
    /// Used by the WAL so a missing or stale counter can never re-issue an id
    /// already present in the log.
    pub fn allocate(&self, floor: u64) -> Result<u64, StorageError> {
        let _guard = FileLock::acquire(&self.lock, self.policy)?;
        let stored = self.read_counter();
        let seq = stored.max(floor).max(1);
        if seq != stored {
            tracing::debug!(stored, seq, "reseeding sequence counter");
        }
        write_atomic(&self.counter, format!("{}\n", seq + 1).as_bytes())?;
        Ok(seq)
    }

    /// Next id that would be allocated, without allocating it
    pub fn peek(&self) -> u64 {
        self.read_counter()
    }

    fn read_counter(&self) -> u64 {
        let text = match std::fs::read_to_string(&self.counter) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 1,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable sequence counter, restarting at 1");
                return 1;
            }
        };
        match text.trim().parse::<u64>() {
            Ok(n) if n >= 1 && !is_fallback_seq(n) => n,
            _ => {
                tracing::warn!(contents = %text.trim(), "corrupt sequence counter, restarting at 1");
                1
            }
        }
    }

    fn fallback_id(&self) -> u64 {
        let millis = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        FALLBACK_SEQ_BASE.saturating_add(millis)
    }
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
