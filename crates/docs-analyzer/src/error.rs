use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse analyzer response: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("analyzer process error: {0}")]
    Process(String),

    #[error("analyzer protocol error: {0}")]
    Protocol(String),

    #[error("analyzer did not respond within {0} seconds")]
    Timeout(u64),
}
