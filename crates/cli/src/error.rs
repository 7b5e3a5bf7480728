// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.

use std::fmt;
use trl_engine::Verdict;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct TrlError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl TrlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// The verifier refused to let the unit of work finish
    pub fn verification_blocked(verdict: &Verdict) -> Self {
        let mut err = TrlError::new("session log is missing captured turns");
        if let Verdict::Block(findings) = verdict {
            for finding in findings {
                err = err.with_context(finding.to_string());
            }
        }
        err.with_suggestion("Wait for the background worker, then try again")
            .with_suggestion("Inspect the queue: trl status")
            .with_suggestion("Deliver pending turns now: trl drain")
    }

    /// Verification itself could not run
    pub fn verification_failed(error: &dyn std::error::Error) -> Self {
        TrlError::new("could not verify the session log")
            .with_context(error.to_string())
            .with_suggestion("Check the log: .trl/trl.log")
    }
}

impl fmt::Display for TrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for TrlError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
