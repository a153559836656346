use crate::process::AnalyzerProcess;
use crate::{AnalysisBackend, AnalyzerError, Result};
use knl_core::docs::proposal::UpdateProposal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The tool the backend must expose.
const ANALYZE_TOOL: &str = "analyze_doc_gaps";

/// A proposal request: the task under analysis plus the serialized context
/// bundle (task metadata, commits, diff, changed files, current docs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub task_id: String,
    pub context: serde_json::Value,
}

// ---------------------------------------------------------------------------
// StdioBackend
// ---------------------------------------------------------------------------

/// Analysis backend reached by spawning a server process and exchanging
/// JSON-RPC 2.0 messages over its stdio, one per line.
///
/// Lifecycle per call: `initialize` → `tools/list` → `tools/call` →
/// `shutdown` notification, then the child is reaped. Every exchange is
/// bounded by `timeout`; the whole workflow has a single foreground caller,
/// so no connection is kept open between calls.
pub struct StdioBackend {
    pub command: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl StdioBackend {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: Duration::from_secs(30),
        }
    }

    async fn roundtrip(
        &self,
        proc: &mut AnalyzerProcess,
        request: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let id = request["id"].clone();
        tracing::debug!("analyzer request: {}", request["method"]);
        proc.send(&request).await?;

        loop {
            let next = tokio::time::timeout(self.timeout, proc.next_message())
                .await
                .map_err(|_| AnalyzerError::Timeout(self.timeout.as_secs()))??;

            let Some(msg) = next else {
                // EOF before a response: surface the exit error if there is one
                return Err(proc
                    .exit_error()
                    .await
                    .unwrap_or_else(|| AnalyzerError::Protocol("server closed stdout".into())));
            };

            // Skip notifications and responses to other requests
            if msg.get("id") != Some(&id) {
                continue;
            }

            if let Some(err) = msg.get("error") {
                return Err(AnalyzerError::Protocol(format!(
                    "server error: {}",
                    err.get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("unknown")
                )));
            }

            return msg
                .get("result")
                .cloned()
                .ok_or_else(|| AnalyzerError::Protocol("response has no result".into()));
        }
    }

    async fn propose_inner(&self, request: &ProposalRequest) -> Result<UpdateProposal> {
        let mut proc = AnalyzerProcess::spawn(&self.command, &self.args)?;

        let result = self.session(&mut proc, request).await;

        // Best-effort shutdown regardless of the session outcome.
        let _ = proc
            .send(&serde_json::json!({ "jsonrpc": "2.0", "method": "shutdown" }))
            .await;
        proc.kill().await;

        result
    }

    async fn session(
        &self,
        proc: &mut AnalyzerProcess,
        request: &ProposalRequest,
    ) -> Result<UpdateProposal> {
        self.roundtrip(
            proc,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "client": { "name": "knl", "version": env!("CARGO_PKG_VERSION") }
                }
            }),
        )
        .await?;

        let tools = self
            .roundtrip(
                proc,
                serde_json::json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            )
            .await?;

        let has_tool = tools["tools"]
            .as_array()
            .map(|ts| ts.iter().any(|t| t["name"] == ANALYZE_TOOL))
            .unwrap_or(false);
        if !has_tool {
            return Err(AnalyzerError::Protocol(format!(
                "server does not provide the '{ANALYZE_TOOL}' tool"
            )));
        }

        let result = self
            .roundtrip(
                proc,
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": 3,
                    "method": "tools/call",
                    "params": {
                        "name": ANALYZE_TOOL,
                        "arguments": {
                            "task_id": request.task_id,
                            "context": request.context,
                        }
                    }
                }),
            )
            .await?;

        parse_tool_result(&result)
    }
}

/// The proposal arrives as text content inside the tool result:
/// `{"content": [{"type": "text", "text": "<proposal json>"}]}`.
fn parse_tool_result(result: &serde_json::Value) -> Result<UpdateProposal> {
    let text = result["content"]
        .as_array()
        .and_then(|items| items.first())
        .and_then(|item| item["text"].as_str())
        .ok_or_else(|| AnalyzerError::Protocol("tool result has no text content".into()))?;

    serde_json::from_str(text).map_err(|e| AnalyzerError::Parse {
        line: text.to_owned(),
        source: e,
    })
}

impl AnalysisBackend for StdioBackend {
    fn propose(&self, request: &ProposalRequest) -> Result<UpdateProposal> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AnalyzerError::Io)?;
        runtime.block_on(self.propose_inner(request))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Script a fake analyzer: a shell script that answers the three
    /// requests in order, ignoring its stdin content.
    fn fake_server(dir: &tempfile::TempDir, proposal_json: &str) -> String {
        let init = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        let tools =
            r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"analyze_doc_gaps"}]}}"#;
        let call = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": { "content": [{ "type": "text", "text": proposal_json }] }
        });

        let script = dir.path().join("server.sh");
        let mut f = std::fs::File::create(&script).unwrap();
        writeln!(f, "#!/bin/sh").unwrap();
        writeln!(f, "read _line; echo '{init}'").unwrap();
        writeln!(f, "read _line; echo '{tools}'").unwrap();
        writeln!(f, "read _line; echo '{call}'").unwrap();
        drop(f);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        script.to_string_lossy().into_owned()
    }

    fn sample_request() -> ProposalRequest {
        ProposalRequest {
            task_id: "PROJ-1".to_string(),
            context: serde_json::json!({"changes": {"scope": "task"}}),
        }
    }

    #[test]
    fn full_lifecycle_returns_proposal() {
        let dir = tempfile::TempDir::new().unwrap();
        let proposal = serde_json::json!({
            "task_id": "PROJ-1",
            "scope": "task",
            "commits_analyzed": 2,
            "files_changed": 3,
            "confidence": 0.85,
            "gaps": [],
            "files": []
        })
        .to_string();
        let script = fake_server(&dir, &proposal);

        let backend = StdioBackend::new(script, vec![]);
        let result = backend.propose(&sample_request()).unwrap();
        assert_eq!(result.task_id, "PROJ-1");
        assert_eq!(result.commits_analyzed, 2);
        assert!((result.confidence - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_tool_is_protocol_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("server.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             read _l; echo '{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}'\n\
             read _l; echo '{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[]}}'\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let backend = StdioBackend::new(script.to_string_lossy().into_owned(), vec![]);
        let err = backend.propose(&sample_request()).unwrap_err();
        assert!(err.to_string().contains("analyze_doc_gaps"));
    }

    #[test]
    fn unreachable_command_is_an_error() {
        let backend = StdioBackend::new("/nonexistent/analyzer-binary", vec![]);
        assert!(backend.propose(&sample_request()).is_err());
    }

    #[test]
    fn parse_tool_result_extracts_text_content() {
        let result = serde_json::json!({
            "content": [{
                "type": "text",
                "text": "{\"task_id\":\"X-1\",\"scope\":\"release\",\"confidence\":0.5}"
            }]
        });
        let proposal = parse_tool_result(&result).unwrap();
        assert_eq!(proposal.task_id, "X-1");

        let empty = serde_json::json!({ "content": [] });
        assert!(parse_tool_result(&empty).is_err());
    }
}
