use crate::error::{KnlError, Result};
use crate::paths;
use crate::types::{TaskIdKind, TaskStatus};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Task ID handling
// ---------------------------------------------------------------------------

static JIRA_RE: OnceLock<Regex> = OnceLock::new();
static GITHUB_RE: OnceLock<Regex> = OnceLock::new();

fn jira_re() -> &'static Regex {
    JIRA_RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9]+-\d+$").unwrap())
}

fn github_re() -> &'static Regex {
    GITHUB_RE.get_or_init(|| Regex::new(r"^#\d+$").unwrap())
}

/// Detect the task ID kind from its spelling.
pub fn detect_id_kind(task_id: &str) -> TaskIdKind {
    if github_re().is_match(task_id) {
        TaskIdKind::Github
    } else if jira_re().is_match(task_id) {
        TaskIdKind::Jira
    } else {
        TaskIdKind::Custom
    }
}

/// Normalize a task ID for filesystem use: `#456` becomes `gh-456`,
/// JIRA IDs are already safe.
pub fn normalize_id(task_id: &str) -> String {
    if let Some(num) = task_id.strip_prefix('#') {
        format!("gh-{num}")
    } else {
        task_id.to_string()
    }
}

pub fn validate_id(task_id: &str) -> Result<()> {
    match detect_id_kind(task_id) {
        TaskIdKind::Jira | TaskIdKind::Github => Ok(()),
        TaskIdKind::Custom => Err(KnlError::InvalidTaskId(task_id.to_string())),
    }
}

// ---------------------------------------------------------------------------
// TaskMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub task_id: String,
    pub kind: TaskIdKind,
    pub normalized_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl TaskMetadata {
    pub fn new(task_id: impl Into<String>, title: impl Into<String>) -> Result<Self> {
        let task_id = task_id.into();
        validate_id(&task_id)?;
        let now = Utc::now();
        Ok(Self {
            kind: detect_id_kind(&task_id),
            normalized_id: normalize_id(&task_id),
            task_id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            created_at: now,
            updated_at: now,
            completed_at: None,
            external_url: None,
            branch_name: None,
            tags: Vec::new(),
            labels: Vec::new(),
        })
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        if status == TaskStatus::Done && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        self.updated_at = Utc::now();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Task (metadata + directory)
// ---------------------------------------------------------------------------

/// A task is a directory under `.knowledge/tasks/<normalized-id>/` holding
/// `metadata.json`, a `context.md` working document, and `tests/` and
/// `artifacts/` subdirectories.
#[derive(Debug, Clone)]
pub struct Task {
    pub metadata: TaskMetadata,
    pub dir: PathBuf,
}

impl Task {
    /// Create the task on disk. Fails if the task directory already exists.
    pub fn create(root: &Path, task_id: &str, title: &str) -> Result<Self> {
        let metadata = TaskMetadata::new(task_id, title)?;
        let dir = paths::task_dir(root, &metadata.normalized_id);
        if dir.exists() {
            return Err(KnlError::TaskExists(task_id.to_string()));
        }

        let task = Self { metadata, dir };
        task.create_structure()?;
        task.save(root)?;
        task.write_context(root)?;
        Ok(task)
    }

    fn create_structure(&self) -> Result<()> {
        crate::io::ensure_dir(&self.dir)?;
        crate::io::ensure_dir(&self.dir.join("tests"))?;
        crate::io::ensure_dir(&self.dir.join("artifacts"))?;
        Ok(())
    }

    pub fn load(root: &Path, task_id: &str) -> Result<Self> {
        let normalized = normalize_id(task_id);
        let metadata_path = paths::task_metadata_path(root, &normalized);
        if !metadata_path.exists() {
            return Err(KnlError::TaskNotFound(task_id.to_string()));
        }
        let data = std::fs::read_to_string(&metadata_path)?;
        let metadata: TaskMetadata = serde_json::from_str(&data)?;
        Ok(Self {
            metadata,
            dir: paths::task_dir(root, &normalized),
        })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::task_metadata_path(root, &self.metadata.normalized_id);
        let data = serde_json::to_string_pretty(&self.metadata)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn delete(root: &Path, task_id: &str) -> Result<()> {
        let normalized = normalize_id(task_id);
        let dir = paths::task_dir(root, &normalized);
        if !dir.exists() {
            return Err(KnlError::TaskNotFound(task_id.to_string()));
        }
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    /// List all tasks, newest first. Directories without a readable
    /// `metadata.json` are skipped.
    pub fn list(
        root: &Path,
        status: Option<TaskStatus>,
        include_archived: bool,
    ) -> Result<Vec<TaskMetadata>> {
        let tasks_dir = paths::tasks_dir(root);
        if !tasks_dir.exists() {
            return Ok(Vec::new());
        }

        let mut tasks = Vec::new();
        for entry in std::fs::read_dir(&tasks_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let metadata_path = entry.path().join(paths::METADATA_FILE);
            let Ok(data) = std::fs::read_to_string(&metadata_path) else {
                continue;
            };
            let Ok(metadata) = serde_json::from_str::<TaskMetadata>(&data) else {
                continue;
            };

            if let Some(want) = status {
                if metadata.status != want {
                    continue;
                }
            }
            if !include_archived && metadata.status == TaskStatus::Archived {
                continue;
            }
            tasks.push(metadata);
        }

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    pub fn exists(root: &Path, task_id: &str) -> bool {
        let normalized = normalize_id(task_id);
        paths::task_metadata_path(root, &normalized).exists()
    }

    /// Read the task's `context.md`, if present.
    pub fn context(root: &Path, task_id: &str) -> Option<String> {
        let normalized = normalize_id(task_id);
        std::fs::read_to_string(paths::task_context_path(root, &normalized)).ok()
    }

    pub fn creation_time(root: &Path, task_id: &str) -> Option<DateTime<Utc>> {
        Self::load(root, task_id).ok().map(|t| t.metadata.created_at)
    }

    fn write_context(&self, root: &Path) -> Result<()> {
        let template_path = paths::context_template_path(root);
        let template = std::fs::read_to_string(&template_path)
            .unwrap_or_else(|_| DEFAULT_CONTEXT_TEMPLATE.to_string());

        let title = if self.metadata.title.is_empty() {
            "No title"
        } else {
            &self.metadata.title
        };
        let content = template
            .replace("{task_id}", &self.metadata.task_id)
            .replace("{title}", title)
            .replace("{description}", &self.metadata.description)
            .replace("{normalized_id}", &self.metadata.normalized_id);

        crate::io::write_if_missing(&self.dir.join(paths::CONTEXT_FILE), content.as_bytes())?;
        Ok(())
    }
}

pub const DEFAULT_CONTEXT_TEMPLATE: &str = "\
# {task_id}: {title}

## Description

{description}

## Context

<!-- Add relevant context about this task -->

## Approach

<!-- Describe your implementation approach -->

## Progress

<!-- Track your progress here -->

## Notes

<!-- Any additional notes or learnings -->
";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".knowledge/tasks")).unwrap();
        dir
    }

    #[test]
    fn detect_and_normalize_ids() {
        assert_eq!(detect_id_kind("PROJ-123"), TaskIdKind::Jira);
        assert_eq!(detect_id_kind("#456"), TaskIdKind::Github);
        assert_eq!(detect_id_kind("whatever"), TaskIdKind::Custom);

        assert_eq!(normalize_id("#456"), "gh-456");
        assert_eq!(normalize_id("PROJ-123"), "PROJ-123");
    }

    #[test]
    fn invalid_id_rejected() {
        assert!(validate_id("not a task").is_err());
        assert!(validate_id("proj-123").is_err());
        assert!(validate_id("PROJ-123").is_ok());
        assert!(validate_id("#7").is_ok());
    }

    #[test]
    fn create_load_round_trip() {
        let dir = init_root();
        let task = Task::create(dir.path(), "PROJ-1", "Wire up login").unwrap();
        assert_eq!(task.metadata.status, TaskStatus::Todo);
        assert!(task.dir.join("metadata.json").exists());
        assert!(task.dir.join("context.md").exists());
        assert!(task.dir.join("tests").is_dir());
        assert!(task.dir.join("artifacts").is_dir());

        let loaded = Task::load(dir.path(), "PROJ-1").unwrap();
        assert_eq!(loaded.metadata.title, "Wire up login");
    }

    #[test]
    fn github_id_uses_normalized_directory() {
        let dir = init_root();
        Task::create(dir.path(), "#42", "Fix panic").unwrap();
        assert!(dir.path().join(".knowledge/tasks/gh-42/metadata.json").exists());

        // Loadable by either the original or the normalized spelling
        assert!(Task::load(dir.path(), "#42").is_ok());
        assert!(Task::load(dir.path(), "gh-42").is_ok());
    }

    #[test]
    fn create_duplicate_fails() {
        let dir = init_root();
        Task::create(dir.path(), "PROJ-2", "First").unwrap();
        assert!(matches!(
            Task::create(dir.path(), "PROJ-2", "Again"),
            Err(KnlError::TaskExists(_))
        ));
    }

    #[test]
    fn context_template_filled() {
        let dir = init_root();
        Task::create(dir.path(), "PROJ-3", "Template test").unwrap();
        let ctx = Task::context(dir.path(), "PROJ-3").unwrap();
        assert!(ctx.starts_with("# PROJ-3: Template test"));
        assert!(!ctx.contains("{task_id}"));
    }

    #[test]
    fn done_status_stamps_completion() {
        let dir = init_root();
        let mut task = Task::create(dir.path(), "PROJ-4", "Finish me").unwrap();
        task.metadata.set_status(TaskStatus::Done);
        assert!(task.metadata.completed_at.is_some());
    }

    #[test]
    fn list_filters_status_and_archived() {
        let dir = init_root();
        Task::create(dir.path(), "PROJ-5", "Open").unwrap();
        let mut done = Task::create(dir.path(), "PROJ-6", "Done").unwrap();
        done.metadata.set_status(TaskStatus::Done);
        done.save(dir.path()).unwrap();
        let mut archived = Task::create(dir.path(), "PROJ-7", "Old").unwrap();
        archived.metadata.set_status(TaskStatus::Archived);
        archived.save(dir.path()).unwrap();

        let all = Task::list(dir.path(), None, false).unwrap();
        assert_eq!(all.len(), 2);

        let with_archived = Task::list(dir.path(), None, true).unwrap();
        assert_eq!(with_archived.len(), 3);

        let done_only = Task::list(dir.path(), Some(TaskStatus::Done), false).unwrap();
        assert_eq!(done_only.len(), 1);
        assert_eq!(done_only[0].task_id, "PROJ-6");
    }

    #[test]
    fn exists_predicate() {
        let dir = init_root();
        assert!(!Task::exists(dir.path(), "PROJ-9"));
        Task::create(dir.path(), "PROJ-9", "Here").unwrap();
        assert!(Task::exists(dir.path(), "PROJ-9"));
    }

    #[test]
    fn delete_removes_directory() {
        let dir = init_root();
        Task::create(dir.path(), "PROJ-8", "Doomed").unwrap();
        Task::delete(dir.path(), "PROJ-8").unwrap();
        assert!(!dir.path().join(".knowledge/tasks/PROJ-8").exists());
        assert!(Task::delete(dir.path(), "PROJ-8").is_err());
    }
}
