//! Verification gate specs
//!
//! Delivery failures are produced by running with the GitHub sink and no
//! `gh` on PATH.

use crate::prelude::*;

fn capture(temp: &Project, prompt: &str) {
    temp.trl()
        .args(&["prompt"])
        .env("TRL_CHANNEL", "5")
        .stdin(hook(serde_json::json!({"prompt": prompt})))
        .passes();
}

#[test]
fn disabled_sink_allows() {
    let temp = Project::empty();
    capture(&temp, "anything");
    temp.trl().args(&["verify"]).passes().stdout_eq("");
    temp.trl().args(&["verify", "--json"]).passes().stdout_eq("{}\n");
}

#[test]
fn nothing_captured_allows_without_sink_access() {
    let temp = Project::empty();
    temp.trl()
        .args(&["verify"])
        .env("TRL_SINK", "github")
        .env("PATH", temp.path().to_str().unwrap())
        .passes();
}

#[test]
fn undeliverable_turn_blocks_with_diagnostic() {
    let temp = Project::empty();
    capture(&temp, "must reach the log");

    temp.trl()
        .args(&["verify"])
        .env("TRL_SINK", "github")
        .env("TRL_CHANNEL", "5")
        .env("PATH", temp.path().to_str().unwrap())
        .exits_with(2)
        .stderr_has("error: session log is missing captured turns")
        .stderr_has("entry 1 (local, channel 5): not delivered")
        .stderr_has("trl status");

    // Blocked entries stay pending for the next check
    temp.trl()
        .args(&["status"])
        .passes()
        .stdout_has("Verified:  through seq 0");
}

#[test]
fn json_block_is_a_decision_object() {
    let temp = Project::empty();
    capture(&temp, "must reach the log");

    let out = temp
        .trl()
        .args(&["verify", "--json"])
        .env("TRL_SINK", "github")
        .env("PATH", temp.path().to_str().unwrap())
        .passes();
    let json = out.stdout_json();
    assert_eq!(json["decision"], "block");
    assert!(json["reason"].as_str().unwrap().contains("entry 1"));
}

#[test]
fn failed_drain_leaves_entry_unposted() {
    let temp = Project::empty();
    temp.write_config("[worker]\nbackoff = []\npace = \"0s\"\n");
    capture(&temp, "retry later");

    temp.trl()
        .args(&["drain"])
        .env("TRL_SINK", "github")
        .env("PATH", temp.path().to_str().unwrap())
        .passes();

    let wal = temp.wal();
    assert_eq!(wal[0]["posted"], false);
    temp.trl()
        .args(&["status"])
        .passes()
        .stdout_has("(1 unposted, 0 malformed)")
        .stdout_has("Worker:    idle");
}
