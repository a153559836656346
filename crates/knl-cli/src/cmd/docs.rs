use crate::output::{print_json, print_table};
use crate::ui::approval::ApprovalSession;
use anyhow::Context;
use clap::Subcommand;
use docs_analyzer::{AnalysisBackend, HeuristicBackend, ProposalRequest, StdioBackend};
use knl_core::config;
use knl_core::docs::{analyzer, apply, coverage, reference, scan, tree::CommandNode};
use knl_core::paths;
use knl_core::types::AnalysisScope;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The root command name; paths in the coverage report are spelled with it.
const ROOT_COMMAND: &str = "knl";

#[derive(Subcommand)]
pub enum DocsSubcommand {
    /// Check documentation coverage for CLI commands
    Check {
        /// Show a per-command status table
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Dump the CLI command tree as JSON
    Dump {
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Generate the CLI reference documentation
    Sync {
        /// Output file (default: docs/cli/commands.md)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Verify only: report drift without writing, exit non-zero on drift
        #[arg(long)]
        check: bool,
    },
    /// Analyze recent changes and update documentation
    Update {
        /// Task ID to analyze
        task_id: String,
        /// Analysis scope: task or release
        #[arg(long, default_value = "task")]
        scope: String,
        /// Apply every proposed update without interactive review
        #[arg(long)]
        auto_approve: bool,
        /// Show the proposal without applying anything
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(
    root: &Path,
    cli_tree: &CommandNode,
    subcmd: DocsSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        DocsSubcommand::Check { verbose } => check(root, cli_tree, verbose, json),
        DocsSubcommand::Dump { output } => dump(cli_tree, output.as_deref()),
        DocsSubcommand::Sync { output, check } => sync(root, cli_tree, output.as_deref(), check),
        DocsSubcommand::Update {
            task_id,
            scope,
            auto_approve,
            dry_run,
        } => update(root, &task_id, &scope, auto_approve, dry_run, json),
    }
}

// ---------------------------------------------------------------------------
// docs check
// ---------------------------------------------------------------------------

fn check(root: &Path, cli_tree: &CommandNode, verbose: bool, json: bool) -> anyhow::Result<()> {
    let docs_dir = paths::find_docs_dir(root)?;

    let cli_paths: BTreeSet<String> = knl_core::docs::tree::all_command_paths(cli_tree)
        .into_iter()
        .collect();
    let doc_paths = scan::DocScanner::new(ROOT_COMMAND)
        .scan(&docs_dir)
        .context("failed to scan documentation")?;

    let report = coverage::reconcile(&cli_paths, &doc_paths);

    if json {
        print_json(&report)?;
        return Ok(());
    }

    println!("\nDocumentation Coverage Report\n");
    println!("Documentation directory: {}", docs_dir.display());
    println!(
        "Coverage: {}/{} commands ({:.1}%)\n",
        report.documented_commands, report.total_commands, report.coverage_percentage
    );

    if !report.undocumented.is_empty() {
        println!("Undocumented commands ({}):", report.undocumented.len());
        for cmd in &report.undocumented {
            println!("  - {cmd}");
        }
        println!();
    }

    if !report.potentially_stale.is_empty() {
        println!(
            "Potentially stale documentation ({}):",
            report.potentially_stale.len()
        );
        for cmd in &report.potentially_stale {
            println!("  - {cmd}");
        }
        println!();
    }

    if verbose {
        let all: BTreeSet<&String> = cli_paths.iter().chain(doc_paths.iter()).collect();
        let rows: Vec<Vec<String>> = all
            .into_iter()
            .map(|cmd| {
                let status = if cli_paths.contains(cmd) && doc_paths.contains(cmd) {
                    "documented"
                } else if cli_paths.contains(cmd) {
                    "missing docs"
                } else {
                    "potentially stale"
                };
                vec![cmd.clone(), status.to_string()]
            })
            .collect();
        print_table(&["COMMAND", "STATUS"], rows);
        println!();
    }

    let threshold = config::effective_docs_config(root)?.coverage_threshold * 100.0;
    if report.coverage_percentage < threshold {
        anyhow::bail!(
            "documentation coverage {:.1}% is below the {:.0}% threshold",
            report.coverage_percentage,
            threshold
        );
    }

    println!("✓ Documentation coverage looks good.\n");
    Ok(())
}

// ---------------------------------------------------------------------------
// docs dump
// ---------------------------------------------------------------------------

fn dump(cli_tree: &CommandNode, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(cli_tree)?;

    match output {
        Some(path) => {
            knl_core::io::atomic_write(path, json.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Wrote CLI help to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// docs sync
// ---------------------------------------------------------------------------

fn sync(
    root: &Path,
    cli_tree: &CommandNode,
    output: Option<&Path>,
    check_only: bool,
) -> anyhow::Result<()> {
    let docs_cfg = config::effective_docs_config(root)?;
    let path = match output {
        Some(p) => p.to_path_buf(),
        None => root.join(&docs_cfg.reference_dir).join("commands.md"),
    };

    let content = reference::generate(cli_tree);

    if check_only {
        if reference::is_stale(&path, &content) {
            anyhow::bail!(
                "CLI reference is out of date: {} (run 'knl docs sync')",
                path.display()
            );
        }
        println!("✓ CLI reference is up to date.");
        return Ok(());
    }

    if reference::write_if_changed(&path, &content)? {
        println!("✓ Updated {}", path.display());
    } else {
        println!("✓ {} is up to date.", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// docs update
// ---------------------------------------------------------------------------

fn update(
    root: &Path,
    task_id: &str,
    scope: &str,
    auto_approve: bool,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    crate::cmd::require_repo(root)?;
    analyzer::require_task(root, task_id)?;
    let scope: AnalysisScope = scope.parse()?;

    println!("Gathering context for {task_id} (scope: {scope})...");
    let ctx = analyzer::gather_context(root, task_id, scope)?;
    let request = ProposalRequest {
        task_id: ctx.task_id.clone(),
        context: ctx.to_value(),
    };

    let docs_cfg = config::effective_docs_config(root)?;
    let backend = StdioBackend::new(&docs_cfg.analyzer_command, docs_cfg.analyzer_args.clone());
    let proposal = match backend.propose(&request) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("analysis backend unavailable, using heuristics only: {e}");
            println!("Analysis backend unavailable — falling back to heuristic checks.");
            HeuristicBackend
                .propose(&request)
                .context("heuristic analysis failed")?
        }
    };

    if dry_run {
        if json {
            print_json(&proposal)?;
        } else {
            println!("\nProposal for {}:", proposal.task_id);
            println!(
                "  {} gaps, {} files, {} edits (confidence {:.0}%)",
                proposal.gaps.len(),
                proposal.files.len(),
                proposal.total_edits(),
                proposal.confidence * 100.0
            );
            for gap in &proposal.gaps {
                println!("  [{}] {}", gap.severity, gap.description);
            }
        }
        return Ok(());
    }

    let auto = auto_approve || docs_cfg.auto_approve;
    let decisions = ApprovalSession::stdio().review(&proposal, auto);

    if decisions.iter().filter(|d| d.is_accepted()).count() == 0 {
        println!("No updates applied.");
        return Ok(());
    }

    let results = apply::apply_decisions(root, &decisions);
    for (path, count) in &results {
        if *count > 0 {
            println!("✓ Updated {path} ({count} changes)");
        } else {
            println!("✗ Failed to update {path}");
        }
    }
    Ok(())
}
