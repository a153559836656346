use crate::error::{KnlError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const KNOWLEDGE_DIR: &str = ".knowledge";
pub const TASKS_DIR: &str = ".knowledge/tasks";
pub const CACHE_DIR: &str = ".knowledge/cache";
pub const SCRIPTS_DIR: &str = ".knowledge/scripts";
pub const TEMPLATES_DIR: &str = ".knowledge/templates";
pub const STANDARDS_DIR: &str = ".knowledge/standards";

pub const CONFIG_FILE: &str = ".knowledge/config.yaml";

pub const METADATA_FILE: &str = "metadata.json";
pub const CONTEXT_FILE: &str = "context.md";

/// Crumb library locations, repo-local then user-local.
pub const LOCAL_CRUMBS_DIR: &str = ".knl/know-how/crumbs";
pub const USER_CRUMBS_DIR: &str = ".local/knl/know-how/crumbs";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn knowledge_dir(root: &Path) -> PathBuf {
    root.join(KNOWLEDGE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn tasks_dir(root: &Path) -> PathBuf {
    root.join(TASKS_DIR)
}

pub fn task_dir(root: &Path, normalized_id: &str) -> PathBuf {
    tasks_dir(root).join(normalized_id)
}

pub fn task_metadata_path(root: &Path, normalized_id: &str) -> PathBuf {
    task_dir(root, normalized_id).join(METADATA_FILE)
}

pub fn task_context_path(root: &Path, normalized_id: &str) -> PathBuf {
    task_dir(root, normalized_id).join(CONTEXT_FILE)
}

pub fn context_template_path(root: &Path) -> PathBuf {
    root.join(TEMPLATES_DIR).join("context.md")
}

/// Global config directory: `$XDG_CONFIG_HOME/knl` or `~/.config/knl`.
pub fn global_config_dir() -> Result<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("knl"));
        }
    }
    let home = home::home_dir().ok_or(KnlError::HomeNotFound)?;
    Ok(home.join(".config").join("knl"))
}

pub fn global_config_path() -> Result<PathBuf> {
    Ok(global_config_dir()?.join("config.yaml"))
}

/// User-local crumb library: `~/.local/knl/know-how/crumbs`.
pub fn user_crumbs_dir() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(KnlError::HomeNotFound)?;
    Ok(home.join(USER_CRUMBS_DIR))
}

// ---------------------------------------------------------------------------
// Upward searches
// ---------------------------------------------------------------------------

/// Find the repository root by walking upward looking for `.knowledge/`.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(KNOWLEDGE_DIR).is_dir() {
            return Some(dir);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}

pub fn is_knl_repo(path: &Path) -> bool {
    find_repo_root(path).is_some()
}

/// Find the documentation directory by walking upward looking for `docs/`.
///
/// Absence is a hard error for the callers that need it, so this returns
/// `Result` rather than `Option`.
pub fn find_docs_dir(start: &Path) -> Result<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let docs = dir.join("docs");
        if docs.is_dir() {
            return Ok(docs);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return Err(KnlError::DocsDirNotFound),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.knowledge/config.yaml")
        );
        assert_eq!(
            task_metadata_path(root, "gh-456"),
            PathBuf::from("/tmp/proj/.knowledge/tasks/gh-456/metadata.json")
        );
    }

    #[test]
    fn find_repo_root_walks_upward() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".knowledge")).unwrap();
        let nested = dir.path().join("src/deep/module");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_repo_root(&nested).unwrap();
        assert_eq!(found, dir.path());
    }

    #[test]
    fn find_repo_root_none_without_marker() {
        let dir = TempDir::new().unwrap();
        assert!(find_repo_root(dir.path()).is_none());
    }

    #[test]
    fn find_docs_dir_walks_upward() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        let nested = dir.path().join("crates/knl-core");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_docs_dir(&nested).unwrap();
        assert_eq!(found, dir.path().join("docs"));
    }

    #[test]
    fn find_docs_dir_errors_when_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            find_docs_dir(dir.path()),
            Err(KnlError::DocsDirNotFound)
        ));
    }
}
