use crate::error::{KnlError, Result};
use crate::git::{self, Commit};
use crate::task::Task;
use crate::types::AnalysisScope;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// DocContext
// ---------------------------------------------------------------------------

/// Context bundle for documentation analysis: everything the backend needs
/// to reason about what changed and what the docs currently say.
#[derive(Debug, Clone)]
pub struct DocContext {
    pub task_id: String,
    pub task_title: String,
    pub task_description: String,
    pub task_context: Option<String>,

    pub commits: Vec<Commit>,
    pub diff: String,
    pub changed_files: Vec<String>,

    pub scope: AnalysisScope,
    /// Git ref (or human-readable marker) the comparison starts from.
    pub since_ref: String,

    pub readme: Option<String>,
    pub changelog: Option<String>,
    /// Relative path → content for every markdown file under `docs/`.
    pub docs_files: BTreeMap<String, String>,
}

impl DocContext {
    /// Wire layout sent to the analysis backend.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "task": {
                "id": self.task_id,
                "title": self.task_title,
                "description": self.task_description,
                "context": self.task_context,
            },
            "changes": {
                "scope": self.scope,
                "since": self.since_ref,
                "commits": self.commits.iter().map(|c| serde_json::json!({
                    "hash": c.hash,
                    "author": c.author,
                    "date": c.date.to_rfc3339(),
                    "subject": c.subject,
                    "body": c.body,
                })).collect::<Vec<_>>(),
                "diff": self.diff,
                "files": self.changed_files,
            },
            "documentation": {
                "readme": self.readme,
                "changelog": self.changelog,
                "docs": self.docs_files,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Gathering
// ---------------------------------------------------------------------------

/// Gather the full analysis context for a task.
///
/// Task scope looks at commits made since the task was created; release
/// scope at commits since the last release tag, falling back to the last
/// ten commits when the repo has no tags.
pub fn gather_context(root: &Path, task_id: &str, scope: AnalysisScope) -> Result<DocContext> {
    let task = Task::load(root, task_id)?;

    let (commits, since_ref) = match scope {
        AnalysisScope::Task => {
            let created = task.metadata.created_at;
            // No git history is not fatal for task scope; analysis degrades
            // to the documentation-only checks.
            let commits = match git::commits_since_time(root, created) {
                Ok(commits) => commits,
                Err(e) => {
                    tracing::warn!("git history unavailable: {e}");
                    Vec::new()
                }
            };
            (commits, format!("created at {}", created.to_rfc3339()))
        }
        AnalysisScope::Release => match git::last_release_tag(root) {
            Some(tag) => {
                let commits = git::commits_since(root, &tag)?;
                (commits, tag)
            }
            None => {
                let commits = git::commits_since(root, "HEAD~10")?;
                (commits, "HEAD~10".to_string())
            }
        },
    };

    let (diff, changed_files) = match scope {
        AnalysisScope::Task => {
            // Diff from the parent of the task's first (oldest) commit.
            // Commits are sorted newest-first, so the oldest is last.
            match commits.last() {
                Some(first) => {
                    let base = format!("{}~1", first.hash);
                    (git::diff_since(root, &base)?, git::changed_files(root, &base)?)
                }
                None => (String::new(), Vec::new()),
            }
        }
        AnalysisScope::Release => (
            git::diff_since(root, &since_ref)?,
            git::changed_files(root, &since_ref)?,
        ),
    };

    Ok(DocContext {
        task_title: task.metadata.title.clone(),
        task_description: task.metadata.description.clone(),
        task_context: Task::context(root, task_id),
        task_id: task.metadata.task_id,
        commits,
        diff,
        changed_files,
        scope,
        since_ref,
        readme: read_optional(&root.join("README.md")),
        changelog: read_optional(&root.join("CHANGELOG.md")),
        docs_files: read_docs_directory(root),
    })
}

fn read_optional(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

/// All markdown files under `<root>/docs`, keyed by root-relative path.
/// Unreadable files are skipped.
fn read_docs_directory(root: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let docs_dir = root.join("docs");
    if !docs_dir.exists() {
        return files;
    }
    collect(&docs_dir, root, &mut files);
    files
}

fn collect(dir: &Path, root: &Path, files: &mut BTreeMap<String, String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, root, files);
        } else if path.extension().map(|e| e == "md").unwrap_or(false) {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            files.insert(relative, content);
        }
    }
}

/// Task-existence precondition for `docs update`.
pub fn require_task(root: &Path, task_id: &str) -> Result<()> {
    if Task::exists(root, task_id) {
        Ok(())
    } else {
        Err(KnlError::TaskNotFound(task_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
