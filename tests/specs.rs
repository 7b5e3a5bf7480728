//! Behavioral specifications for the trl CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, exit codes, and the files left in the state directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/help.rs"]
mod cli_help;
#[path = "specs/cli/status.rs"]
mod cli_status;

// hooks/
#[path = "specs/hooks/capture.rs"]
mod hooks_capture;
#[path = "specs/hooks/handoff.rs"]
mod hooks_handoff;
#[path = "specs/hooks/verify.rs"]
mod hooks_verify;
