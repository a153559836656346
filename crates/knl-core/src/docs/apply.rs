use super::proposal::{EditKind, EnrichedEdit};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ReviewDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approved,
    Rejected,
    Edited,
    Skipped,
    Quit,
}

/// One reviewed edit. Only `Approved` and `Edited` decisions are applied;
/// `edited_content` is reserved for a future inline-edit feature and is
/// currently never populated.
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    pub edit: EnrichedEdit,
    pub action: ReviewAction,
    pub edited_content: Option<String>,
}

impl ReviewDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self.action, ReviewAction::Approved | ReviewAction::Edited)
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Apply accepted decisions to files under `root`.
///
/// Returns the count of edits applied per file. A failure on one file is
/// logged and recorded as zero; the remaining files are still attempted.
pub fn apply_decisions(root: &Path, decisions: &[ReviewDecision]) -> BTreeMap<String, usize> {
    let mut by_file: BTreeMap<String, Vec<&EnrichedEdit>> = BTreeMap::new();
    for decision in decisions {
        if !decision.is_accepted() {
            continue;
        }
        by_file
            .entry(decision.edit.file_path.clone())
            .or_default()
            .push(&decision.edit);
    }

    let mut results = BTreeMap::new();
    for (path, edits) in by_file {
        let file_path = root.join(&path);
        match apply_file_edits(&file_path, &edits) {
            Ok(count) => {
                results.insert(path, count);
            }
            Err(e) => {
                tracing::warn!("failed to update {path}: {e}");
                results.insert(path, 0);
            }
        }
    }
    results
}

/// Apply a batch of edits to one file: read once, mutate in memory, write
/// once.
///
/// Edits are sorted by line number **descending** before applying, so the
/// line-count shift from a later (higher-line) edit never moves an earlier
/// one — no offset recomputation between splices. A missing file starts as
/// zero lines, which lets `append`/`insert at 1` create it.
pub fn apply_file_edits(path: &Path, edits: &[&EnrichedEdit]) -> crate::Result<usize> {
    let (mut lines, had_trailing_newline) = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let trailing = content.ends_with('\n');
        let lines: Vec<String> = content.lines().map(String::from).collect();
        (lines, trailing)
    } else {
        (Vec::new(), true)
    };

    let mut sorted: Vec<&EnrichedEdit> = edits.to_vec();
    sorted.sort_by(|a, b| {
        b.edit
            .line_number
            .unwrap_or(0)
            .cmp(&a.edit.line_number.unwrap_or(0))
    });

    let mut count = 0;
    for enriched in sorted {
        let edit = &enriched.edit;
        let new_lines: Vec<String> = edit.new.lines().map(String::from).collect();

        match edit.kind {
            EditKind::Replace => {
                let (Some(start), Some(end)) = (edit.line_start(), edit.line_end()) else {
                    continue;
                };
                // 1-indexed inclusive range → 0-indexed exclusive splice
                let start = start.saturating_sub(1).min(lines.len());
                let end = end.min(lines.len()).max(start);
                lines.splice(start..end, new_lines);
                count += 1;
            }
            EditKind::Insert => {
                let Some(start) = edit.line_start() else {
                    continue;
                };
                let at = start.saturating_sub(1).min(lines.len());
                lines.splice(at..at, new_lines);
                count += 1;
            }
            EditKind::Append => {
                lines.extend(new_lines);
                count += 1;
            }
        }
    }

    let mut content = lines.join("\n");
    if had_trailing_newline && !content.is_empty() {
        content.push('\n');
    }
    crate::io::atomic_write(path, content.as_bytes())?;

    Ok(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
