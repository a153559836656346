use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnlError {
    #[error("not initialized: run 'knl init'")]
    NotInitialized,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already exists: {0}")]
    TaskExists(String),

    #[error("invalid task id '{0}': expected JIRA format (PROJ-123) or GitHub format (#123)")]
    InvalidTaskId(String),

    #[error("invalid task status: {0}")]
    InvalidStatus(String),

    #[error("invalid severity: {0}")]
    InvalidSeverity(String),

    #[error("invalid analysis scope '{0}': must be 'task' or 'release'")]
    InvalidScope(String),

    #[error("could not find docs/ directory")]
    DocsDirNotFound,

    #[error("configuration key not found: {0}")]
    ConfigKeyNotFound(String),

    #[error("git command failed: {0}")]
    Git(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KnlError>;
