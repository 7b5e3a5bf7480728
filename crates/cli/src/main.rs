// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! trl - Turn Relay CLI
//!
//! Hook entry points that capture conversational turns into a local WAL,
//! plus the background worker that relays them to the session log.

mod adapters;
mod commands;
mod error;
mod hook;
mod launch;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use commands::{capture, drain, status, verify};
use std::process::ExitCode;
use trl_core::StatePaths;
use trl_engine::Relay;

use crate::hook::HookInput;

#[derive(Parser)]
#[command(
    name = "trl",
    version,
    about = "Turn Relay - durable, ordered session log for agent hooks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a submitted prompt (prompt-submit hook)
    Prompt,
    /// Capture new replies from the transcript (stop hook)
    Reply,
    /// Replay turns the previous session left behind (session-start hook)
    Recover,
    /// Mark the transcript for replay by the next session (session-end hook)
    Handoff,
    /// Block until this unit of work's turns are confirmed delivered
    Verify(verify::VerifyArgs),
    /// Deliver pending entries (run by the background worker)
    Drain,
    /// Remove delivered entries older than the retention window
    Compact(status::CompactArgs),
    /// Show queue and worker state
    Status(status::StatusArgs),
}

impl Commands {
    /// Exit code when the command fails before producing a result
    ///
    /// Capture hooks must never disturb the host; the gate fails closed.
    fn failure_code(&self) -> ExitCode {
        match self {
            _ if self.is_background() => ExitCode::SUCCESS,
            Commands::Verify(_) => ExitCode::from(verify::BLOCK_EXIT_CODE),
            _ => ExitCode::FAILURE,
        }
    }

    /// Commands whose failures are only logged
    fn is_background(&self) -> bool {
        matches!(
            self,
            Commands::Prompt
                | Commands::Reply
                | Commands::Recover
                | Commands::Handoff
                | Commands::Drain
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let failure = cli.command.failure_code();
    let background = cli.command.is_background();

    let paths = match StatePaths::from_env() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!(
                "{}",
                error::TrlError::new("cannot open state directory").with_context(e.to_string())
            );
            return failure;
        }
    };

    let _log_guard = match logging::setup_logging(&paths) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    };

    match run(cli.command, paths).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            if !background {
                eprintln!("error: {e:#}");
            }
            failure
        }
    }
}

async fn run(command: Commands, paths: StatePaths) -> anyhow::Result<ExitCode> {
    let relay = Relay::open(paths)?;

    match command {
        Commands::Prompt => capture::prompt(&relay, &read_hook()?),
        Commands::Reply => capture::reply(&relay, &read_hook()?)?,
        Commands::Recover => capture::recover(&relay)?,
        Commands::Handoff => capture::handoff(&relay, &read_hook()?)?,
        Commands::Verify(args) => return Ok(verify::verify(&relay, args).await),
        Commands::Drain => drain::drain(&relay).await?,
        Commands::Compact(args) => status::compact(&relay, args)?,
        Commands::Status(args) => status::status(&relay, args)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn read_hook() -> anyhow::Result<HookInput> {
    HookInput::from_reader(std::io::stdin().lock())
}
