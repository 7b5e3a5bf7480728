// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub issue sink driven through the `gh` CLI
//!
//! A channel is an issue number and each delivered entry is one issue comment.

use super::{RemoteEntry, Sink, SinkError};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use trl_core::ChannelId;

const ISSUE_TITLE: &str = "Session log";

/// Comments per page of the GitHub REST API listing
const PAGE_SIZE: u64 = 100;

/// Sink that posts issue comments with `gh`
#[derive(Clone, Debug, Default)]
pub struct GhSink {
    repo: Option<String>,
}

impl GhSink {
    /// `repo` is `owner/name`; `None` lets `gh` infer it from the working directory
    pub fn new(repo: Option<String>) -> Self {
        Self { repo }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("gh");
        cmd.kill_on_drop(true);
        cmd
    }

    fn repo_args(&self, cmd: &mut Command) {
        if let Some(repo) = &self.repo {
            cmd.arg("-R").arg(repo);
        }
    }

    fn issue_endpoint(&self, channel: ChannelId) -> String {
        match &self.repo {
            Some(repo) => format!("repos/{repo}/issues/{channel}"),
            None => format!("repos/{{owner}}/{{repo}}/issues/{channel}"),
        }
    }

    fn comments_page(&self, channel: ChannelId, page: u64) -> String {
        format!(
            "{}/comments?per_page={PAGE_SIZE}&page={page}",
            self.issue_endpoint(channel)
        )
    }

    /// `gh api <path> --jq <filter>`, mapping a missing issue to `ChannelNotFound`
    async fn api(&self, channel: ChannelId, path: String, jq: &str) -> Result<String, SinkError> {
        let mut cmd = self.command();
        cmd.arg("api").arg(path).arg("--jq").arg(jq);
        match run(cmd, None).await {
            Err(SinkError::CommandFailed(msg)) if msg.contains("Not Found") => {
                Err(SinkError::ChannelNotFound(channel))
            }
            other => other,
        }
    }
}

async fn run(mut cmd: Command, stdin: Option<&str>) -> Result<String, SinkError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| SinkError::CommandFailed(format!("failed to run gh: {e}")))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .await
            .map_err(|e| SinkError::CommandFailed(e.to_string()))?;
        // Close stdin so gh sees EOF
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| SinkError::CommandFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SinkError::CommandFailed(stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl Sink for GhSink {
    async fn append(&self, channel: ChannelId, body: &str) -> Result<String, SinkError> {
        let mut cmd = self.command();
        cmd.arg("issue").arg("comment").arg(channel.to_string());
        self.repo_args(&mut cmd);
        cmd.arg("--body-file").arg("-");

        let stdout = run(cmd, Some(body)).await?;
        parse_comment_ref(&stdout)
    }

    async fn list_recent(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, SinkError> {
        let count = self.api(channel, self.issue_endpoint(channel), ".comments").await?;
        let count = parse_comment_count(&count)?;

        let mut stdout = String::new();
        for page in recent_pages(count, limit) {
            let listed = self
                .api(channel, self.comments_page(channel, page), ".[] | {id: .id, body: .body}")
                .await?;
            stdout.push_str(&listed);
            stdout.push('\n');
        }
        parse_comment_lines(&stdout, limit)
    }

    async fn find_or_create_channel(&self, marker: &str) -> Result<ChannelId, SinkError> {
        let mut cmd = self.command();
        cmd.arg("issue").arg("list");
        self.repo_args(&mut cmd);
        cmd.arg("--state")
            .arg("open")
            .arg("--search")
            .arg(format!("\"{marker}\" in:body"))
            .arg("--json")
            .arg("number,body");

        let stdout = run(cmd, None).await?;
        if let Some(found) = parse_issue_search(&stdout, marker)? {
            return Ok(found);
        }

        let mut cmd = self.command();
        cmd.arg("issue").arg("create");
        self.repo_args(&mut cmd);
        cmd.arg("--title").arg(ISSUE_TITLE).arg("--body").arg(marker);

        let stdout = run(cmd, None).await?;
        tracing::info!(marker, url = stdout.trim(), "created fallback channel");
        parse_issue_url(&stdout)
    }
}

/// Pages holding the last `limit` of `count` comments, oldest first
#[allow(clippy::reversed_empty_ranges)]
pub(crate) fn recent_pages(count: u64, limit: usize) -> std::ops::RangeInclusive<u64> {
    let wanted = count.min(limit as u64);
    if wanted == 0 {
        return 1..=0;
    }
    let first = (count - wanted) / PAGE_SIZE + 1;
    let last = count.div_ceil(PAGE_SIZE);
    first..=last
}

/// Comment count `gh api .../issues/N --jq .comments` prints
pub(crate) fn parse_comment_count(stdout: &str) -> Result<u64, SinkError> {
    stdout
        .trim()
        .parse()
        .map_err(|_| SinkError::Parse(format!("bad comment count {:?}", stdout.trim())))
}

/// Comment id from the URL `gh issue comment` prints
pub(crate) fn parse_comment_ref(stdout: &str) -> Result<String, SinkError> {
    let url = stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| line.contains("#issuecomment-"))
        .ok_or_else(|| SinkError::Parse(format!("no comment url in {:?}", stdout.trim())))?;

    let id = url
        .rsplit_once("#issuecomment-")
        .map(|(_, id)| id)
        .unwrap_or_default();
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SinkError::Parse(format!("bad comment url {url:?}")));
    }
    Ok(id.to_string())
}

#[derive(Deserialize)]
struct CommentLine {
    id: u64,
    #[serde(default)]
    body: String,
}

/// JSON lines of `{id, body}`, keeping the last `limit`
pub(crate) fn parse_comment_lines(stdout: &str, limit: usize) -> Result<Vec<RemoteEntry>, SinkError> {
    let mut entries = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let comment: CommentLine =
            serde_json::from_str(line).map_err(|e| SinkError::Parse(e.to_string()))?;
        entries.push(RemoteEntry {
            id: comment.id.to_string(),
            body: comment.body,
        });
    }
    let skip = entries.len().saturating_sub(limit);
    Ok(entries.split_off(skip))
}

#[derive(Deserialize)]
struct IssueSummary {
    number: u64,
    #[serde(default)]
    body: String,
}

/// Lowest-numbered issue whose body really contains `marker`
///
/// Search is fuzzy, so the body is checked again here.
pub(crate) fn parse_issue_search(stdout: &str, marker: &str) -> Result<Option<ChannelId>, SinkError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let issues: Vec<IssueSummary> =
        serde_json::from_str(trimmed).map_err(|e| SinkError::Parse(e.to_string()))?;
    Ok(issues
        .into_iter()
        .filter(|issue| issue.body.contains(marker))
        .map(|issue| issue.number)
        .min()
        .map(ChannelId))
}

/// Issue number from the URL `gh issue create` prints
pub(crate) fn parse_issue_url(stdout: &str) -> Result<ChannelId, SinkError> {
    let url = stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| line.contains("/issues/"))
        .ok_or_else(|| SinkError::Parse(format!("no issue url in {:?}", stdout.trim())))?;

    url.rsplit_once("/issues/")
        .and_then(|(_, n)| n.parse::<u64>().ok())
        .filter(|n| *n != 0)
        .map(ChannelId)
        .ok_or_else(|| SinkError::Parse(format!("bad issue url {url:?}")))
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
