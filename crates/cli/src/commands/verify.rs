// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `trl verify` - the termination gate

use crate::adapters::make_sink;
use crate::error::TrlError;
use clap::Args;
use std::process::ExitCode;
use trl_engine::{Relay, Verdict, Verifier};

/// Exit status telling the host to keep going
pub const BLOCK_EXIT_CODE: u8 = 2;

#[derive(Args)]
pub struct VerifyArgs {
    /// Print a decision object on stdout instead of exiting non-zero
    #[arg(long)]
    pub json: bool,
}

pub async fn verify(relay: &Relay, args: VerifyArgs) -> ExitCode {
    let Some(sink) = make_sink(&relay.config.sink) else {
        tracing::info!("sink disabled, verification skipped");
        return allow(&args);
    };

    match Verifier::new(relay, sink).verify().await {
        Ok(verdict) if verdict.is_allow() => allow(&args),
        Ok(verdict) => block(&args, &TrlError::verification_blocked(&verdict), &verdict),
        Err(e) => {
            tracing::error!(error = %e, "verification failed");
            block(&args, &TrlError::verification_failed(&e), &Verdict::Block(Vec::new()))
        }
    }
}

fn allow(args: &VerifyArgs) -> ExitCode {
    if args.json {
        println!("{}", serde_json::json!({}));
    }
    ExitCode::SUCCESS
}

fn block(args: &VerifyArgs, err: &TrlError, verdict: &Verdict) -> ExitCode {
    if args.json {
        let reason = match verdict {
            Verdict::Block(findings) if !findings.is_empty() => verdict.diagnostic(),
            _ => err.to_string(),
        };
        println!("{}", serde_json::json!({"decision": "block", "reason": reason}));
        return ExitCode::SUCCESS;
    }
    eprint!("{err}");
    ExitCode::from(BLOCK_EXIT_CODE)
}
