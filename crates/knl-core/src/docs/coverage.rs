use serde::Serialize;
use std::collections::BTreeSet;

/// Result of reconciling the declared CLI surface against the commands
/// referenced in documentation.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub total_commands: usize,
    pub documented_commands: usize,
    pub coverage_percentage: f64,
    /// Declared commands never mentioned in the docs.
    pub undocumented: Vec<String>,
    /// Documented strings with no matching command. A heuristic upper bound:
    /// the scanner also captures prose fragments, so false positives are
    /// expected and acceptable.
    pub potentially_stale: Vec<String>,
}

/// Pure set reconciliation; no side effects.
pub fn reconcile(cli_paths: &BTreeSet<String>, doc_paths: &BTreeSet<String>) -> CoverageReport {
    let undocumented: Vec<String> = cli_paths.difference(doc_paths).cloned().collect();
    let potentially_stale: Vec<String> = doc_paths.difference(cli_paths).cloned().collect();

    let total_commands = cli_paths.len();
    let documented_commands = cli_paths.intersection(doc_paths).count();
    let coverage_percentage = if total_commands == 0 {
        0.0
    } else {
        let pct = documented_commands as f64 / total_commands as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    };

    CoverageReport {
        total_commands,
        documented_commands,
        coverage_percentage,
        undocumented,
        potentially_stale,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
