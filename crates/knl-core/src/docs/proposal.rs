use crate::types::{AnalysisScope, Severity};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Replace,
    Insert,
    Append,
}

/// One textual change to a documentation file.
///
/// Invariants: `replace` carries both `old` and `line_number`; `insert`
/// carries `line_number`; `append` ignores any line number. Edits are never
/// mutated — review state lives on [`super::apply::ReviewDecision`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    #[serde(rename = "type")]
    pub kind: EditKind,
    #[serde(default)]
    pub old: Option<String>,
    pub new: String,
    pub reason: String,
    pub severity: Severity,
    /// 1-indexed.
    #[serde(default)]
    pub line_number: Option<usize>,
}

impl Edit {
    pub fn line_start(&self) -> Option<usize> {
        self.line_number
    }

    /// For a replace, the last line covered by `old`; derived, not stored.
    pub fn line_end(&self) -> Option<usize> {
        match (&self.old, self.line_number) {
            (Some(old), Some(start)) => Some(start + old.lines().count().max(1) - 1),
            _ => self.line_number,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentationGap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentationGap {
    pub gap_type: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub affected_files: Vec<String>,
    #[serde(default)]
    pub code_reference: Option<String>,
    #[serde(default)]
    pub suggested_action: String,
}

// ---------------------------------------------------------------------------
// FileUpdate / UpdateProposal
// ---------------------------------------------------------------------------

/// All proposed edits for one target file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpdate {
    pub path: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub section: Option<String>,
    pub updates: Vec<Edit>,
}

/// The unit exchanged with the analysis backend and consumed by the
/// approval workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProposal {
    pub task_id: String,
    pub scope: AnalysisScope,
    #[serde(default)]
    pub commits_analyzed: usize,
    #[serde(default)]
    pub files_changed: usize,
    /// Confidence in [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub gaps: Vec<DocumentationGap>,
    #[serde(default)]
    pub files: Vec<FileUpdate>,
}

impl UpdateProposal {
    pub fn total_edits(&self) -> usize {
        self.files.iter().map(|f| f.updates.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// An [`Edit`] enriched with its owning file path and, when resolvable, the
/// description of the gap that motivated it.
#[derive(Debug, Clone)]
pub struct EnrichedEdit {
    pub edit: Edit,
    pub file_path: String,
    pub gap_description: Option<String>,
}

/// Flatten every edit in every file, in file order then in-file order.
///
/// The gap description comes from the first gap whose affected-files list
/// contains the edit's file — first match wins, not best match.
pub fn flatten(proposal: &UpdateProposal) -> Vec<EnrichedEdit> {
    let mut enriched = Vec::new();
    for file_update in &proposal.files {
        let gap_description = proposal
            .gaps
            .iter()
            .find(|gap| gap.affected_files.iter().any(|f| f == &file_update.path))
            .map(|gap| gap.description.clone());

        for edit in &file_update.updates {
            enriched.push(EnrichedEdit {
                edit: edit.clone(),
                file_path: file_update.path.clone(),
                gap_description: gap_description.clone(),
            });
        }
    }
    enriched
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
