// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable local storage: locks, sequence allocation, the WAL, and small state files

mod atomic;
mod error;
pub mod lock;
pub mod sequencer;
pub mod state;
pub mod wal;

pub use error::StorageError;
pub use lock::{FileLock, LockError, LockPolicy, RunLock};
pub use sequencer::{is_fallback_seq, Sequencer, FALLBACK_SEQ_BASE};
pub use state::{
    ChannelMap, HandoffMarker, StateFile, StateGuard, VerifyCheckpoint, Watermarks,
};
pub use wal::{CompactReport, WalScan, WalStore};
