// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the relay engine

use thiserror::Error;
use trl_adapters::SinkError;
use trl_core::ConfigError;
use trl_storage::{LockError, StorageError};

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot read transcript {path}: {source}")]
    Transcript {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to launch worker: {0}")]
    Launch(String),
}
