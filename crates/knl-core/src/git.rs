use crate::error::{KnlError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub email: String,
    pub date: DateTime<Utc>,
    pub subject: String,
    pub body: String,
}

impl Commit {
    /// Full commit message (subject + body).
    pub fn message(&self) -> String {
        if self.body.is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.body)
        }
    }
}

// Format: hash|short_hash|author|email|date|subject|body
const LOG_FORMAT: &str = "%H|%h|%an|%ae|%aI|%s|%b";

// ---------------------------------------------------------------------------
// Subprocess plumbing
// ---------------------------------------------------------------------------

fn run_git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| KnlError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        return Err(KnlError::Git(stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Errors that just mean "the ref doesn't exist" degrade to empty results.
fn is_unknown_revision(err: &KnlError) -> bool {
    match err {
        KnlError::Git(msg) => {
            let lower = msg.to_lowercase();
            lower.contains("unknown revision") || lower.contains("bad revision")
        }
        _ => false,
    }
}

fn parse_log(stdout: &str) -> Vec<Commit> {
    let mut commits = Vec::new();

    // One block per commit: the formatted line, then any remaining body lines.
    for block in stdout.trim().split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        let mut lines = block.lines();
        let Some(first) = lines.next() else {
            continue;
        };
        let parts: Vec<&str> = first.splitn(7, '|').collect();
        if parts.len() < 6 {
            continue;
        }

        let Ok(date) = DateTime::parse_from_rfc3339(parts[4]) else {
            continue;
        };

        let mut body = parts.get(6).map(|s| s.to_string()).unwrap_or_default();
        let rest: Vec<&str> = lines.collect();
        if !rest.is_empty() {
            body = rest.join("\n");
        }

        commits.push(Commit {
            hash: parts[0].trim().to_string(),
            short_hash: parts[1].trim().to_string(),
            author: parts[2].trim().to_string(),
            email: parts[3].trim().to_string(),
            date: date.with_timezone(&Utc),
            subject: parts[5].trim().to_string(),
            body: body.trim().to_string(),
        });
    }

    commits
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn current_branch(repo: &Path) -> Option<String> {
    run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])
        .ok()
        .map(|s| s.trim().to_string())
}

pub fn is_git_repo(repo: &Path) -> bool {
    run_git(repo, &["rev-parse", "--show-toplevel"]).is_ok()
}

/// Commits in `<ref>..HEAD`. Unknown refs yield an empty list.
pub fn commits_since(repo: &Path, git_ref: &str) -> Result<Vec<Commit>> {
    let range = format!("{git_ref}..HEAD");
    let format = format!("--format={LOG_FORMAT}");
    match run_git(repo, &["log", &range, &format]) {
        Ok(out) => Ok(parse_log(&out)),
        Err(e) if is_unknown_revision(&e) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Commits across all branches that are newer than `since`, newest first.
pub fn commits_since_time(repo: &Path, since: DateTime<Utc>) -> Result<Vec<Commit>> {
    let format = format!("--format={LOG_FORMAT}");
    let out = run_git(repo, &["log", "--all", &format])?;
    let mut commits: Vec<Commit> = parse_log(&out)
        .into_iter()
        .filter(|c| c.date >= since)
        .collect();
    commits.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(commits)
}

/// Unified diff of `<ref>..HEAD`. Unknown refs yield an empty diff.
pub fn diff_since(repo: &Path, git_ref: &str) -> Result<String> {
    let range = format!("{git_ref}..HEAD");
    match run_git(repo, &["diff", &range]) {
        Ok(out) => Ok(out),
        Err(e) if is_unknown_revision(&e) => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Paths changed in `<ref>..HEAD`. Unknown refs yield an empty list.
pub fn changed_files(repo: &Path, git_ref: &str) -> Result<Vec<String>> {
    let range = format!("{git_ref}..HEAD");
    match run_git(repo, &["diff", "--name-only", &range]) {
        Ok(out) => Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()),
        Err(e) if is_unknown_revision(&e) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Most recent tag by version sort, or `None` when the repo has no tags.
pub fn last_release_tag(repo: &Path) -> Option<String> {
    let out = run_git(repo, &["tag", "--sort=-version:refname"]).ok()?;
    out.lines().next().map(str::trim).filter(|t| !t.is_empty()).map(String::from)
}

// ---------------------------------------------------------------------------
// Branch → task ID extraction
// ---------------------------------------------------------------------------

static BRANCH_JIRA_RE: OnceLock<Regex> = OnceLock::new();
static BRANCH_GITHUB_RE: OnceLock<Regex> = OnceLock::new();

/// Extract a task ID from a branch name like `feature/PROJ-123-login` or
/// `fix/456-null-deref`.
pub fn extract_task_id_from_branch(branch: &str) -> Option<String> {
    let jira = BRANCH_JIRA_RE.get_or_init(|| Regex::new(r"([A-Z][A-Z0-9]+-\d+)").unwrap());
    if let Some(m) = jira.captures(branch) {
        return Some(m[1].to_string());
    }

    let github = BRANCH_GITHUB_RE.get_or_init(|| Regex::new(r"(?:^|/)(\d+)(?:-|$)").unwrap());
    if let Some(m) = github.captures(branch) {
        return Some(format!("#{}", &m[1]));
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
