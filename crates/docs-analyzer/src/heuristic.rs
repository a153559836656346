use crate::{AnalysisBackend, ProposalRequest, Result};
use knl_core::docs::proposal::{DocumentationGap, UpdateProposal};
use knl_core::types::{AnalysisScope, Severity};

/// Confidence reported for heuristic-only analysis.
const HEURISTIC_CONFIDENCE: f64 = 0.5;

/// Fallback backend used when the analysis server is unavailable.
///
/// Runs simple counting and string-containment checks over the context
/// bundle and reports gaps only — no file-level edits, fixed low
/// confidence. Never fails.
#[derive(Debug, Default)]
pub struct HeuristicBackend;

impl AnalysisBackend for HeuristicBackend {
    fn propose(&self, request: &ProposalRequest) -> Result<UpdateProposal> {
        let ctx = &request.context;
        let changes = &ctx["changes"];
        let documentation = &ctx["documentation"];

        let commits = changes["commits"].as_array().cloned().unwrap_or_default();
        let files: Vec<String> = changes["files"]
            .as_array()
            .map(|fs| {
                fs.iter()
                    .filter_map(|f| f.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let scope = changes["scope"]
            .as_str()
            .and_then(|s| s.parse::<AnalysisScope>().ok())
            .unwrap_or(AnalysisScope::Task);

        let mut gaps = Vec::new();

        let non_test_files = files.iter().filter(|f| !f.starts_with("tests/")).count();
        if non_test_files > 0 {
            gaps.push(gap(
                "new_files",
                format!("New files added: {non_test_files} files. May need documentation."),
                Severity::Medium,
                vec![],
            ));
        }

        let cli_files = files
            .iter()
            .filter(|f| f.contains("cmd") && f.ends_with(".rs"))
            .count();
        if cli_files > 0 {
            gaps.push(gap(
                "cli_reference",
                format!(
                    "CLI commands modified: {cli_files} files. CLI reference may need update."
                ),
                Severity::High,
                vec![],
            ));
        }

        if documentation["readme"].is_null() {
            gaps.push(gap(
                "missing_readme",
                "README.md not found. Consider creating one.".to_string(),
                Severity::High,
                vec!["README.md".to_string()],
            ));
        }

        if documentation["changelog"].is_null() {
            gaps.push(gap(
                "missing_changelog",
                "CHANGELOG.md not found. Consider creating one.".to_string(),
                Severity::Medium,
                vec!["CHANGELOG.md".to_string()],
            ));
        } else if !commits.is_empty() {
            // Does the changelog mention any of the five most recent subjects?
            let changelog = documentation["changelog"]
                .as_str()
                .unwrap_or_default()
                .to_lowercase();
            let mentioned = commits
                .iter()
                .take(5)
                .filter_map(|c| c["subject"].as_str())
                .filter(|s| changelog.contains(&s.to_lowercase()))
                .count();
            if mentioned == 0 {
                gaps.push(gap(
                    "missing_changelog_entries",
                    format!(
                        "CHANGELOG.md may be missing entries for {} recent commits.",
                        commits.len()
                    ),
                    Severity::Medium,
                    vec!["CHANGELOG.md".to_string()],
                ));
            }
        }

        Ok(UpdateProposal {
            task_id: request.task_id.clone(),
            scope,
            commits_analyzed: commits.len(),
            files_changed: files.len(),
            confidence: HEURISTIC_CONFIDENCE,
            gaps,
            files: Vec::new(),
        })
    }
}

fn gap(
    gap_type: &str,
    description: String,
    severity: Severity,
    affected_files: Vec<String>,
) -> DocumentationGap {
    DocumentationGap {
        gap_type: gap_type.to_string(),
        description,
        severity,
        affected_files,
        code_reference: None,
        suggested_action: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
