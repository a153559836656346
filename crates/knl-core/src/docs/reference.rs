use super::tree::{CommandNode, CommandOption, OptionKind};
use crate::error::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Logical grouping of top-level commands for the generated reference.
/// Order is fixed; commands missing from the tree are simply skipped.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Getting Started", &["init"]),
    ("Task Management", &["create", "list", "show", "delete", "task"]),
    ("Knowledge Crumbs", &["crumb"]),
    ("Configuration", &["config"]),
    ("Documentation", &["docs"]),
];

/// Options clap adds on its own; they would only add noise to the reference.
const HIDDEN_OPTIONS: &[&str] = &["--help", "-h", "--version", "-V"];

/// Render the canonical CLI reference for a command tree.
///
/// Pure function of the tree: recursion over sub-commands follows the
/// `BTreeMap` order (lexicographic by name), so regeneration is stable
/// byte-for-byte while the tree is unchanged.
pub fn generate(tree: &CommandNode) -> String {
    let mut out = String::new();

    out.push_str("# CLI Command Reference\n\n");
    out.push_str("> **Auto-generated** by `knl docs sync` — do not edit manually.\n");
    out.push_str("> Changes made here will be overwritten on the next sync.\n\n");

    if !tree.help.is_empty() {
        out.push_str("## Overview\n\n");
        out.push_str(&tree.help);
        out.push_str("\n\n");
    }

    let _ = writeln!(out, "## The `{}` Command\n", tree.name);
    let global_options = visible_options(&tree.options);
    if global_options.is_empty() {
        out.push_str("No global options.\n\n");
    } else {
        out.push_str("Global options:\n\n");
        for opt in global_options {
            render_option(&mut out, opt);
        }
        out.push('\n');
    }

    for (category, members) in CATEGORIES {
        let present: Vec<&CommandNode> = members
            .iter()
            .filter_map(|name| tree.subcommands.get(*name))
            .collect();
        if present.is_empty() {
            continue;
        }

        let _ = writeln!(out, "## {category}\n");
        for node in present {
            render_command(&mut out, node, &tree.name);
        }
    }

    out
}

fn render_command(out: &mut String, node: &CommandNode, prefix: &str) {
    let path = format!("{prefix} {}", node.name);

    if node.is_group {
        let _ = writeln!(out, "### `{path}` (Command Group)\n");
        if !node.help.is_empty() {
            let _ = writeln!(out, "{}\n", node.help);
        }
        let _ = writeln!(out, "Subcommands:\n");
        for sub in node.subcommands.keys() {
            let _ = writeln!(out, "- [`{path} {sub}`](#{})", anchor(&path, sub));
        }
        out.push('\n');
        for sub in node.subcommands.values() {
            render_command(out, sub, &path);
        }
        return;
    }

    let _ = writeln!(out, "### `{path}`\n");
    if !node.help.is_empty() {
        let _ = writeln!(out, "{}\n", node.help);
    }

    out.push_str("```text\n");
    let _ = writeln!(out, "{path}{}", usage_suffix(node));
    out.push_str("```\n\n");

    let options = visible_options(&node.options);
    if !options.is_empty() {
        out.push_str("Options:\n\n");
        for opt in options {
            render_option(out, opt);
        }
        out.push('\n');
    }
}

fn render_option(out: &mut String, opt: &CommandOption) {
    let mut line = format!("- `{}`", opt.name);
    if opt.kind == OptionKind::Option {
        let _ = write!(line, " `<{}>`", opt.value_type);
    }
    if !opt.help.is_empty() {
        let _ = write!(line, " — {}", opt.help);
    }
    if let Some(default) = &opt.default {
        if !opt.required {
            let _ = write!(line, " (default: `{default}`)");
        }
    }
    let _ = writeln!(out, "{line}");
}

fn usage_suffix(node: &CommandNode) -> String {
    let mut suffix = String::new();
    for opt in &node.options {
        if opt.kind == OptionKind::Argument {
            if opt.required {
                let _ = write!(suffix, " <{}>", opt.name);
            } else {
                let _ = write!(suffix, " [{}]", opt.name);
            }
        }
    }
    if node
        .options
        .iter()
        .any(|o| o.kind != OptionKind::Argument && !HIDDEN_OPTIONS.contains(&o.name.as_str()))
    {
        suffix.push_str(" [OPTIONS]");
    }
    suffix
}

fn visible_options(options: &[CommandOption]) -> Vec<&CommandOption> {
    options
        .iter()
        .filter(|o| !HIDDEN_OPTIONS.contains(&o.name.as_str()))
        .collect()
}

fn anchor(path: &str, sub: &str) -> String {
    format!("{path}-{sub}").replace(' ', "-")
}

/// Write `content` to `path` only when it differs from what is on disk.
/// Returns whether the file changed — the caller's verify-only mode reports
/// drift from the same comparison without writing.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        if existing == content {
            return Ok(false);
        }
    }
    crate::io::atomic_write(path, content.as_bytes())?;
    Ok(true)
}

/// True when the on-disk reference differs from `content` (or is missing).
pub fn is_stale(path: &Path, content: &str) -> bool {
    match std::fs::read_to_string(path) {
        Ok(existing) => existing != content,
        Err(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree() -> CommandNode {
        let mut root = CommandNode::new("knl", "Knowledge Retention Library");
        root.options.push(CommandOption {
            name: "--json".into(),
            kind: OptionKind::Flag,
            value_type: "bool".into(),
            required: false,
            default: None,
            help: "Output as JSON".into(),
        });
        root.options.push(CommandOption {
            name: "--help".into(),
            kind: OptionKind::Flag,
            value_type: "bool".into(),
            required: false,
            default: None,
            help: "Print help".into(),
        });

        let mut init = CommandNode::new("init", "Initialize knl in a repository");
        init.options.push(CommandOption {
            name: "--format".into(),
            kind: OptionKind::Option,
            value_type: "string".into(),
            required: false,
            default: Some("jira".into()),
            help: "Task ID format".into(),
        });
        root.add_subcommand(init);

        let mut task = CommandNode::new("task", "Manage development tasks");
        let mut create = CommandNode::new("create", "Create a new task");
        create.options.push(CommandOption {
            name: "TASK_ID".into(),
            kind: OptionKind::Argument,
            value_type: "string".into(),
            required: true,
            default: None,
            help: "Task ID (e.g. PROJ-123)".into(),
        });
        task.add_subcommand(create);
        task.add_subcommand(CommandNode::new("list", "List all tasks"));
        root.add_subcommand(task);

        root
    }

    #[test]
    fn generation_is_deterministic() {
        let tree = sample_tree();
        assert_eq!(generate(&tree), generate(&tree));
    }

    #[test]
    fn preamble_and_overview() {
        let text = generate(&sample_tree());
        assert!(text.starts_with("# CLI Command Reference\n"));
        assert!(text.contains("Auto-generated"));
        assert!(text.contains("do not edit manually"));
        assert!(text.contains("Knowledge Retention Library"));
    }

    #[test]
    fn groups_and_leaves_rendered() {
        let text = generate(&sample_tree());
        assert!(text.contains("### `knl task` (Command Group)"));
        assert!(text.contains("### `knl task create`"));
        assert!(text.contains("knl task create <TASK_ID>"));
        assert!(text.contains("- `--format` `<string>` — Task ID format (default: `jira`)"));
    }

    #[test]
    fn help_option_excluded() {
        let text = generate(&sample_tree());
        assert!(!text.contains("`--help`"));
        assert!(text.contains("`--json`"));
    }

    #[test]
    fn category_order_fixed() {
        let text = generate(&sample_tree());
        let start = text.find("## Getting Started").unwrap();
        let tasks = text.find("## Task Management").unwrap();
        assert!(start < tasks);
        // Categories with no present members are skipped entirely
        assert!(!text.contains("## Knowledge Crumbs"));
    }

    #[test]
    fn write_if_changed_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs/cli/commands.md");
        let text = generate(&sample_tree());

        assert!(write_if_changed(&path, &text).unwrap());
        assert!(!write_if_changed(&path, &text).unwrap());
        assert!(!is_stale(&path, &text));

        std::fs::write(&path, "stale").unwrap();
        assert!(is_stale(&path, &text));
        assert!(write_if_changed(&path, &text).unwrap());
    }
}
