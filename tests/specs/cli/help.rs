//! Help and usage specs

use crate::prelude::*;

#[test]
fn help_lists_hook_commands() {
    let temp = Project::empty();
    let out = temp.trl().args(&["--help"]).passes();
    for command in ["prompt", "reply", "recover", "handoff", "verify", "drain", "compact", "status"] {
        assert!(out.stdout.contains(command), "help missing {command}");
    }
}

#[test]
fn unknown_command_is_a_usage_error() {
    let temp = Project::empty();
    temp.trl()
        .args(&["bogus"])
        .exits_with(2)
        .stderr_has("unrecognized subcommand");
}
