// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File logging under the state directory

use anyhow::Context;
use trl_core::StatePaths;

/// Environment variable holding the log filter directive
const LOG_ENV: &str = "TRL_LOG";

/// Log to `trl.log` in the state directory; hooks never log to stdout
///
/// The returned guard flushes buffered lines when dropped.
pub fn setup_logging(
    paths: &StatePaths,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = paths.log();
    let file_name = log_path
        .file_name()
        .context("log path has no file name")?;
    let file_appender = tracing_appender::rolling::never(paths.root(), file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(guard)
}
