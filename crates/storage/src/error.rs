// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error type

use crate::lock::LockError;
use std::io;
use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("external reference for entry {seq} is empty")]
    EmptyExternalRef { seq: u64 },
}

impl StorageError {
    /// True for lock contention, which callers retry on a later invocation
    pub fn is_lock_busy(&self) -> bool {
        matches!(self, StorageError::Lock(LockError::Busy { .. }))
    }
}
