use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// OptionKind / CommandOption
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    /// Positional parameter with no flag spelling.
    Argument,
    /// Named, value-bearing parameter.
    Option,
    /// Boolean on/off switch.
    Flag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOption {
    /// Flag spelling (`--title`) or positional name (`TASK_ID`).
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub value_type: String,
    pub required: bool,
    /// Only captured for non-required parameters.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub help: String,
}

// ---------------------------------------------------------------------------
// CommandNode
// ---------------------------------------------------------------------------

/// One node of the resolved CLI command tree.
///
/// This is plain data: whatever declares the CLI (clap, a generator, a test
/// fixture) builds the tree once per invocation, and everything downstream —
/// coverage, the reference generator, `docs dump` — operates on this shape
/// without knowing about the declaration mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandNode {
    pub name: String,
    #[serde(default)]
    pub help: String,
    pub is_group: bool,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Keyed by sub-command name; `BTreeMap` keeps traversal deterministic.
    #[serde(default)]
    pub subcommands: BTreeMap<String, CommandNode>,
}

impl CommandNode {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            is_group: false,
            options: Vec::new(),
            subcommands: BTreeMap::new(),
        }
    }

    pub fn add_subcommand(&mut self, node: CommandNode) {
        self.subcommands.insert(node.name.clone(), node);
        self.is_group = true;
    }

    /// Total number of nodes in the tree, this node included.
    pub fn node_count(&self) -> usize {
        1 + self
            .subcommands
            .values()
            .map(CommandNode::node_count)
            .sum::<usize>()
    }
}

/// Pre-order traversal emitting one space-joined path per node, root
/// included (e.g. `["knl", "knl docs", "knl docs check"]`).
pub fn all_command_paths(node: &CommandNode) -> Vec<String> {
    fn walk(node: &CommandNode, prefix: &str, out: &mut Vec<String>) {
        let path = format!("{prefix} {}", node.name).trim().to_string();
        out.push(path.clone());
        for sub in node.subcommands.values() {
            walk(sub, &path, out);
        }
    }

    let mut paths = Vec::new();
    walk(node, "", &mut paths);
    paths
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_tree() -> CommandNode {
        let mut root = CommandNode::new("knl", "Knowledge Retention Library");
        root.add_subcommand(CommandNode::new("init", "Initialize knl"));

        let mut task = CommandNode::new("task", "Manage tasks");
        task.add_subcommand(CommandNode::new("create", "Create a task"));
        task.add_subcommand(CommandNode::new("list", "List tasks"));
        root.add_subcommand(task);

        root
    }

    #[test]
    fn paths_cover_every_node() {
        let tree = sample_tree();
        let paths = all_command_paths(&tree);
        assert_eq!(paths.len(), tree.node_count());
        assert_eq!(
            paths,
            vec![
                "knl",
                "knl init",
                "knl task",
                "knl task create",
                "knl task list",
            ]
        );
    }

    #[test]
    fn path_depth_matches_token_count() {
        fn check(node: &CommandNode, depth: usize, paths: &[String]) {
            let expected_tokens = depth + 1;
            assert!(paths
                .iter()
                .any(|p| p.split_whitespace().count() == expected_tokens
                    && p.ends_with(&node.name)));
            for sub in node.subcommands.values() {
                check(sub, depth + 1, paths);
            }
        }

        let tree = sample_tree();
        let paths = all_command_paths(&tree);
        check(&tree, 0, &paths);
    }

    #[test]
    fn group_flag_tracks_subcommands() {
        let mut node = CommandNode::new("docs", "Docs");
        assert!(!node.is_group);
        node.add_subcommand(CommandNode::new("check", "Check"));
        assert!(node.is_group);
    }

    #[test]
    fn dump_wire_format() {
        let mut node = CommandNode::new("knl", "help text");
        node.options.push(CommandOption {
            name: "--verbose".into(),
            kind: OptionKind::Flag,
            value_type: "bool".into(),
            required: false,
            default: Some("false".into()),
            help: "Show detail".into(),
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["name"], "knl");
        assert_eq!(json["is_group"], false);
        assert_eq!(json["options"][0]["type"], "flag");
        assert_eq!(json["options"][0]["value_type"], "bool");
    }
}
