//! Status and compaction specs

use crate::prelude::*;

#[test]
fn status_of_empty_state() {
    let temp = Project::empty();
    temp.trl()
        .args(&["status"])
        .passes()
        .stdout_has("Sink:      disabled (channel 0)")
        .stdout_has("Entries:   0 (0 unposted, 0 malformed)")
        .stdout_has("Last seq:  - (next 1)")
        .stdout_has("Worker:    idle")
        .stdout_has("Hand-off:  -");
}

#[test]
fn status_json_counts_captures() {
    let temp = Project::empty();
    temp.trl()
        .args(&["prompt"])
        .stdin(hook(serde_json::json!({"prompt": "count me"})))
        .passes();

    let out = temp.trl().args(&["status", "-o", "json"]).passes();
    let json = out.stdout_json();
    assert_eq!(json["entries"], 1);
    assert_eq!(json["unposted"], 1);
    assert_eq!(json["last_seq"], 1);
    assert_eq!(json["next_seq"], 2);
    assert_eq!(json["worker_pid"], serde_json::Value::Null);
}

#[test]
fn status_reports_malformed_lines() {
    let temp = Project::empty();
    temp.trl()
        .args(&["prompt"])
        .stdin(hook(serde_json::json!({"prompt": "fine"})))
        .passes();
    temp.append(&temp.state_dir().join("wal.jsonl"), "{broken\n");

    temp.trl()
        .args(&["status"])
        .passes()
        .stdout_has("Entries:   1 (1 unposted, 1 malformed)");
}

#[test]
fn compact_keeps_unposted_entries() {
    let temp = Project::empty();
    temp.trl()
        .args(&["prompt"])
        .stdin(hook(serde_json::json!({"prompt": "keep me"})))
        .passes();

    temp.trl()
        .args(&["compact", "--retention", "0s"])
        .passes()
        .stdout_eq("Removed 0 entries, kept 1\n");
    assert_eq!(temp.wal_contents(), vec!["keep me"]);
}

#[test]
fn invalid_environment_fails_status() {
    let temp = Project::empty();
    temp.trl()
        .args(&["status"])
        .env("TRL_CHANNEL", "abc")
        .exits_with(1)
        .stderr_has("TRL_CHANNEL");
}

#[test]
fn invalid_config_file_fails_status() {
    let temp = Project::empty();
    temp.write_config("channel = \"not a number\"\n");
    temp.trl()
        .args(&["status"])
        .exits_with(1)
        .stderr_has("config.toml");
}
