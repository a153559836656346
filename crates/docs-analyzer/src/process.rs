use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::{AnalyzerError, Result};

// ─── AnalyzerProcess ──────────────────────────────────────────────────────

/// A running analyzer subprocess speaking JSONL over stdin/stdout.
///
/// Stderr is drained by a background task and surfaced when the process
/// exits with an error.
pub(crate) struct AnalyzerProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    stderr_buf: Arc<Mutex<String>>,
}

impl AnalyzerProcess {
    pub(crate) fn spawn(command: &str, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(AnalyzerError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalyzerError::Process("stdout not captured".into()))?;

        let stdin = child.stdin.take();

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        let lines = BufReader::new(stdout).lines();
        Ok(Self {
            child,
            lines,
            stdin,
            stderr_buf,
        })
    }

    /// Write one JSON message to the subprocess stdin, newline-terminated.
    pub(crate) async fn send(&mut self, msg: &serde_json::Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AnalyzerError::Process("stdin already closed".into()))?;

        let mut buf = serde_json::to_vec(msg)
            .map_err(|e| AnalyzerError::Process(format!("failed to serialize request: {e}")))?;
        buf.push(b'\n');

        stdin.write_all(&buf).await.map_err(AnalyzerError::Io)?;
        stdin.flush().await.map_err(AnalyzerError::Io)?;

        Ok(())
    }

    /// Read the next non-empty JSONL line from stdout.
    ///
    /// Returns `Ok(None)` on EOF (process exited).
    pub(crate) async fn next_message(&mut self) -> Result<Option<serde_json::Value>> {
        loop {
            match self.lines.next_line().await {
                Err(e) => return Err(AnalyzerError::Io(e)),
                Ok(None) => return Ok(None),
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return serde_json::from_str(trimmed)
                        .map(Some)
                        .map_err(|e| AnalyzerError::Parse {
                            line: trimmed.to_owned(),
                            source: e,
                        });
                }
            }
        }
    }

    /// Surface captured stderr alongside a non-zero exit, if any.
    pub(crate) async fn exit_error(&mut self) -> Option<AnalyzerError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(AnalyzerError::Io(e)),
        };

        if status.success() {
            return None;
        }

        let stderr = self
            .stderr_buf
            .lock()
            .ok()
            .map(|b| b.clone())
            .unwrap_or_default();

        let msg = match (status.code(), stderr.is_empty()) {
            (Some(code), true) => format!("analyzer exited with code {code}"),
            (Some(code), false) => format!("analyzer exited with code {code}\nstderr: {stderr}"),
            (None, true) => "analyzer terminated by signal".to_string(),
            (None, false) => format!("analyzer terminated by signal\nstderr: {stderr}"),
        };

        Some(AnalyzerError::Process(msg))
    }

    /// Kill the subprocess (best-effort; errors are silently ignored).
    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
