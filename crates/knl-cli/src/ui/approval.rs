use knl_core::docs::apply::{ReviewAction, ReviewDecision};
use knl_core::docs::proposal::{flatten, EnrichedEdit, UpdateProposal};
use knl_core::types::Severity;
use std::io::{BufRead, Write};

/// Rendered diff lines are capped; beyond this a truncation notice is shown.
const MAX_DIFF_LINES: usize = 20;

/// Interactive per-edit review of a documentation update proposal.
///
/// Walks the flattened, gap-annotated edit list one edit at a time and
/// collects accept/reject/skip/quit decisions. Generic over input/output so
/// tests can drive a whole session from a string.
pub struct ApprovalSession<R, W> {
    input: R,
    output: W,
}

impl ApprovalSession<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self {
            input: std::io::BufReader::new(std::io::stdin()),
            output: std::io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> ApprovalSession<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Review a proposal and return the ordered list of decisions.
    ///
    /// With `auto_approve` every edit is approved without interaction (the
    /// bulk/CI path). Otherwise the session shows a summary, asks for a
    /// go/no-go, then reviews each edit; `quit` truncates the list, and
    /// skipped edits produce no decision at all.
    pub fn review(&mut self, proposal: &UpdateProposal, auto_approve: bool) -> Vec<ReviewDecision> {
        let edits = flatten(proposal);

        if auto_approve {
            self.say("Auto-approving all updates...");
            let reviews: Vec<ReviewDecision> = edits
                .into_iter()
                .map(|edit| ReviewDecision {
                    edit,
                    action: ReviewAction::Approved,
                    edited_content: None,
                })
                .collect();
            self.say(&format!("✓ Auto-approved {} updates\n", reviews.len()));
            return reviews;
        }

        self.show_summary(proposal, &edits);

        if !self.confirm_start() {
            return Vec::new();
        }

        let total = edits.len();
        let mut reviews = Vec::new();
        for (i, edit) in edits.into_iter().enumerate() {
            self.show_edit(&edit, i + 1, total);
            match self.prompt_action() {
                ReviewAction::Quit => break,
                ReviewAction::Skipped => continue,
                action => reviews.push(ReviewDecision {
                    edit,
                    action,
                    // Inline editing is not implemented; the prompt re-asks
                    // instead, so nothing ever lands here.
                    edited_content: None,
                }),
            }
        }

        self.show_completion(&reviews);
        reviews
    }

    // -----------------------------------------------------------------------
    // Summary
    // -----------------------------------------------------------------------

    fn show_summary(&mut self, proposal: &UpdateProposal, edits: &[EnrichedEdit]) {
        self.say("");
        self.say("=== Documentation Update Approval ===");
        self.say(&format!("Task: {}", proposal.task_id));
        self.say("");

        let count = |s: Severity| edits.iter().filter(|e| e.edit.severity == s).count();
        self.say("Analysis summary:");
        self.say(&format!("  Scope: {}", proposal.scope));
        self.say(&format!(
            "  Gaps found: {} ({} critical, {} high, {} medium, {} low)",
            proposal.gaps.len(),
            count(Severity::Critical),
            count(Severity::High),
            count(Severity::Medium),
            count(Severity::Low),
        ));
        self.say(&format!("  Files to update: {}", proposal.files.len()));
        self.say(&format!("  Total updates: {}", edits.len()));
        self.say(&format!(
            "  Confidence: {}%",
            (proposal.confidence * 100.0).round() as i64
        ));
        self.say("");

        if !proposal.files.is_empty() {
            self.say("Files to update:");
            for (i, file) in proposal.files.iter().enumerate() {
                self.say(&format!(
                    "  {}. {} ({} updates)",
                    i + 1,
                    file.path,
                    file.updates.len()
                ));
            }
            self.say("");
        }
    }

    fn confirm_start(&mut self) -> bool {
        self.say("Press Enter to start review, q to quit");
        match self.read_line() {
            Some(line) => !line.trim().eq_ignore_ascii_case("q"),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Per-edit rendering
    // -----------------------------------------------------------------------

    fn show_edit(&mut self, edit: &EnrichedEdit, number: usize, total: usize) {
        self.say("");
        self.say(&format!(
            "─── Update {number}/{total} │ {} │ {} ───",
            edit.file_path,
            edit.edit.severity.as_str().to_uppercase()
        ));
        self.say("");
        self.say(&format!("Reason: {}", edit.edit.reason));
        if let Some(gap) = &edit.gap_description {
            self.say(&format!("Gap: {gap}"));
        }

        let start = edit.edit.line_start().unwrap_or(1);

        if let Some(old) = &edit.edit.old {
            self.say("");
            self.say(&format!(
                "Current text (lines {}-{}):",
                start,
                edit.edit.line_end().unwrap_or(start)
            ));
            for line in numbered(old, start) {
                self.say(&line);
            }
        }

        self.say("");
        self.say("Proposed change:");
        for line in numbered(&edit.edit.new, start) {
            self.say(&line);
        }

        if let Some(old) = &edit.edit.old {
            self.say("");
            self.say("Diff:");
            let diff = positional_diff(old, &edit.edit.new, start);
            for line in diff.iter().take(MAX_DIFF_LINES) {
                self.say(line);
            }
            if diff.len() > MAX_DIFF_LINES {
                self.say(&format!("  ... {} more lines", diff.len() - MAX_DIFF_LINES));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Action prompt
    // -----------------------------------------------------------------------

    fn prompt_action(&mut self) -> ReviewAction {
        loop {
            self.say("");
            self.say("[a] Accept  [r] Reject  [e] Edit  [s] Skip  [q] Quit");
            let Some(line) = self.read_line() else {
                // Input exhausted — treat as quit.
                return ReviewAction::Quit;
            };

            match line.trim().to_lowercase().as_str() {
                "a" => {
                    self.say("✓ Accepted");
                    return ReviewAction::Approved;
                }
                "r" => {
                    self.say("✗ Rejected");
                    return ReviewAction::Rejected;
                }
                "e" => {
                    self.say("Note: edit mode not yet implemented");
                }
                "s" => {
                    self.say("⊘ Skipped");
                    return ReviewAction::Skipped;
                }
                "q" => {
                    self.say("Quit review? Progress will be saved [y/N]");
                    match self.read_line() {
                        Some(confirm) if confirm.trim().eq_ignore_ascii_case("y") => {
                            return ReviewAction::Quit;
                        }
                        Some(_) => {}
                        None => return ReviewAction::Quit,
                    }
                }
                _ => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Completion summary
    // -----------------------------------------------------------------------

    fn show_completion(&mut self, reviews: &[ReviewDecision]) {
        let accepted = reviews
            .iter()
            .filter(|r| r.action == ReviewAction::Approved)
            .count();
        let rejected = reviews
            .iter()
            .filter(|r| r.action == ReviewAction::Rejected)
            .count();

        self.say("");
        self.say("=== Review Complete ===");
        self.say(&format!("  Reviewed: {} updates", reviews.len()));
        self.say(&format!("  Accepted: {accepted}"));
        if rejected > 0 {
            self.say(&format!("  Rejected: {rejected}"));
        }

        if accepted > 0 {
            self.say("");
            self.say("Next steps:");
            self.say("  • Run 'knl docs check' to verify docs are in sync");
            self.say("  • Review and commit the changes");
        }
        self.say("");
    }

    // -----------------------------------------------------------------------
    // I/O plumbing
    // -----------------------------------------------------------------------

    fn say(&mut self, line: &str) {
        let _ = writeln!(self.output, "{line}");
    }

    fn read_line(&mut self) -> Option<String> {
        let mut buf = String::new();
        match self.input.read_line(&mut buf) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(buf),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

fn numbered(text: &str, start: usize) -> Vec<String> {
    text.lines()
        .enumerate()
        .map(|(i, line)| format!("  {:3} │ {line}", start + i))
        .collect()
}

/// Positional line diff: old and new lines are zipped by index, with a tail
/// branch for length differences. A review aid, not a minimal-edit diff.
fn positional_diff(old: &str, new: &str, start: usize) -> Vec<String> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let mut diff = Vec::new();
    for (i, (o, n)) in old_lines.iter().zip(new_lines.iter()).enumerate() {
        let num = start + i;
        if o == n {
            diff.push(format!("  {num:3} │  {o}"));
        } else {
            diff.push(format!("  {num:3} │ -{o}"));
            diff.push(format!("  {num:3} │ +{n}"));
        }
    }

    let common = old_lines.len().min(new_lines.len());
    for (i, o) in old_lines.iter().enumerate().skip(common) {
        diff.push(format!("  {:3} │ -{o}", start + i));
    }
    for (i, n) in new_lines.iter().enumerate().skip(common) {
        diff.push(format!("  {:3} │ +{n}", start + i));
    }

    diff
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
