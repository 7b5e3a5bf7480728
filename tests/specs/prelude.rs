//! Shared helpers for CLI specs

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch project with its own state directory
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join(".trl")
    }

    /// `trl` with delivery disabled and no background worker
    pub fn trl(&self) -> Cli {
        let mut cmd = Command::cargo_bin("trl").unwrap();
        cmd.current_dir(self.path())
            .env("TRL_STATE_DIR", self.state_dir())
            .env("TRL_SINK", "disabled")
            .env("TRL_WORKER_AUTOSTART", "0")
            .env("TRL_VERIFY_WAIT_MS", "0")
            .env_remove("TRL_CHANNEL")
            .env_remove("TRL_LOG");
        Cli { cmd }
    }

    pub fn write_config(&self, toml: &str) {
        std::fs::create_dir_all(self.state_dir()).unwrap();
        std::fs::write(self.state_dir().join("config.toml"), toml).unwrap();
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn append(&self, path: &Path, contents: &str) {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    /// Parsed WAL records
    pub fn wal(&self) -> Vec<serde_json::Value> {
        let text = std::fs::read_to_string(self.state_dir().join("wal.jsonl")).unwrap_or_default();
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    pub fn wal_contents(&self) -> Vec<String> {
        self.wal()
            .iter()
            .map(|e| e["content"].as_str().unwrap().to_string())
            .collect()
    }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.cmd.write_stdin(input.into());
        self
    }

    /// Run and expect exit code 0
    pub fn passes(self) -> Output {
        self.exits_with(0)
    }

    /// Run and expect the given exit code
    pub fn exits_with(mut self, code: i32) -> Output {
        let out = Output::from(self.cmd.output().unwrap());
        assert_eq!(out.code, Some(code), "unexpected exit code\n{}", out.describe());
        out
    }
}

pub struct Output {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for Output {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Output {
    fn describe(&self) -> String {
        format!("stdout:\n{}\nstderr:\n{}", self.stdout, self.stderr)
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}\n{}", self.describe());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}\n{}", self.describe());
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout, expected);
        self
    }

    pub fn stdout_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap()
    }
}

/// Hook payload as the host sends it
pub fn hook(fields: serde_json::Value) -> String {
    fields.to_string()
}

pub fn user_line(text: &str) -> String {
    let line = serde_json::json!({"type": "user", "message": {"role": "user", "content": text}});
    format!("{line}\n")
}

pub fn assistant_line(text: &str) -> String {
    let line = serde_json::json!({
        "type": "assistant",
        "message": {"role": "assistant", "content": [{"type": "text", "text": text}]}
    });
    format!("{line}\n")
}
