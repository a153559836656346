use crate::error::Result;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// Heuristic scanner for command references in markdown documentation.
///
/// Three independent patterns per file: inline-code headings, command lines
/// at the start of a line (fenced examples), and inline-code spans. Matches
/// are truncated at the first token that looks like an argument or option
/// rather than a sub-command word. Prose fragments that happen to match are
/// expected; the coverage report treats the result as an upper bound.
pub struct DocScanner {
    patterns: Vec<Regex>,
}

impl DocScanner {
    pub fn new(root_command: &str) -> Self {
        let root = regex::escape(root_command);
        let patterns = vec![
            // ### `knl docs check` — level-3/4 headings wrapping inline code
            Regex::new(&format!(r"(?m)###?\s+`({root}[^`]+)`")).expect("heading pattern"),
            // knl task list — command examples inside fenced blocks
            Regex::new(&format!(r"(?m)^({root}\s+[a-z]+(?:\s+[a-z]+)*)")).expect("line pattern"),
            // `knl init` — inline code spans in prose
            Regex::new(&format!(r"`({root}\s+[a-z]+(?:\s+[a-z]+)*)`")).expect("inline pattern"),
        ];
        Self { patterns }
    }

    /// Scan every markdown file under `docs_root`. Files that cannot be read
    /// or decoded are silently skipped — a single bad file must not abort
    /// the scan.
    pub fn scan(&self, docs_root: &Path) -> Result<BTreeSet<String>> {
        let mut documented = BTreeSet::new();
        self.scan_dir(docs_root, &mut documented)?;
        Ok(documented)
    }

    fn scan_dir(&self, dir: &Path, documented: &mut BTreeSet<String>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.scan_dir(&path, documented)?;
            } else if path.extension().map(|e| e == "md").unwrap_or(false) {
                let Ok(content) = std::fs::read_to_string(&path) else {
                    continue;
                };
                self.scan_text(&content, documented);
            }
        }
        Ok(())
    }

    pub fn scan_text(&self, content: &str, documented: &mut BTreeSet<String>) {
        for pattern in &self.patterns {
            for caps in pattern.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    if let Some(cmd) = clean_command(m.as_str()) {
                        documented.insert(cmd);
                    }
                }
            }
        }
    }
}

/// Truncate a captured command string at the first token that signals
/// arguments rather than sub-command words: a flag (`--force`), an
/// UPPER-CASE placeholder (`TASK-ID`), a `#`-prefixed ID, or a quoted value.
fn clean_command(raw: &str) -> Option<String> {
    let mut parts = Vec::new();
    for token in raw.split_whitespace() {
        if token.starts_with('-')
            || is_upper_token(token)
            || token.starts_with('#')
            || token.starts_with('"')
        {
            break;
        }
        parts.push(token);
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// True when the token has at least one letter and every letter is
/// upper-case (placeholder style: `TASK-ID`, `PROJ-123`).
fn is_upper_token(token: &str) -> bool {
    let mut has_alpha = false;
    for c in token.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if !c.is_uppercase() {
                return false;
            }
        }
    }
    has_alpha
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
