use clap::ArgAction;
use knl_core::docs::tree::{CommandNode, CommandOption, OptionKind};

/// Extract the resolved command tree from a clap `Command`.
///
/// This is the only place that knows the CLI is declared with clap; the
/// rest of the docs pipeline operates on [`CommandNode`] alone. Recurses
/// through every declared sub-command group to arbitrary depth.
pub fn extract(cmd: &clap::Command, name: &str) -> CommandNode {
    // Explicit about() wins; fall back to the long description.
    let help = cmd
        .get_about()
        .map(|s| s.to_string())
        .or_else(|| cmd.get_long_about().map(|s| s.to_string()))
        .unwrap_or_default();

    let mut node = CommandNode::new(name, help);
    node.options = cmd.get_arguments().map(extract_option).collect();

    for sub in cmd.get_subcommands() {
        let sub_name = sub.get_name();
        if sub_name == "help" {
            continue;
        }
        node.add_subcommand(extract(sub, sub_name));
    }

    node
}

fn extract_option(arg: &clap::Arg) -> CommandOption {
    let kind = if arg.is_positional() {
        OptionKind::Argument
    } else if matches!(
        arg.get_action(),
        ArgAction::SetTrue | ArgAction::SetFalse | ArgAction::Count
    ) {
        OptionKind::Flag
    } else {
        OptionKind::Option
    };

    let name = match kind {
        OptionKind::Argument => arg.get_id().as_str().to_uppercase(),
        _ => arg
            .get_long()
            .map(|l| format!("--{l}"))
            .or_else(|| arg.get_short().map(|s| format!("-{s}")))
            .unwrap_or_else(|| arg.get_id().to_string()),
    };

    let value_type = match kind {
        OptionKind::Flag => "bool".to_string(),
        _ => arg
            .get_value_names()
            .and_then(|names| names.first())
            .map(|n| n.to_string().to_lowercase())
            .unwrap_or_else(|| "string".to_string()),
    };

    let required = arg.is_required_set();
    // Defaults only matter for parameters the user may omit.
    let default = if required {
        None
    } else {
        arg.get_default_values()
            .first()
            .map(|v| v.to_string_lossy().into_owned())
    };

    CommandOption {
        name,
        kind,
        value_type,
        required,
        default,
        help: arg.get_help().map(|h| h.to_string()).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command};
    use knl_core::docs::tree::all_command_paths;

    fn sample_cli() -> Command {
        Command::new("knl")
            .about("Knowledge Retention Library")
            .arg(
                Arg::new("json")
                    .long("json")
                    .short('j')
                    .action(ArgAction::SetTrue)
                    .help("Output as JSON"),
            )
            .subcommand(Command::new("init").about("Initialize knl").arg(
                Arg::new("format").long("format").default_value("jira").help("Task ID format"),
            ))
            .subcommand(
                Command::new("task")
                    .about("Manage tasks")
                    .subcommand(
                        Command::new("create").about("Create a task").arg(
                            Arg::new("task_id").required(true).help("Task ID"),
                        ),
                    )
                    .subcommand(Command::new("list").about("List tasks")),
            )
    }

    #[test]
    fn tree_shape_matches_cli() {
        let tree = extract(&sample_cli(), "knl");
        assert_eq!(tree.name, "knl");
        assert!(tree.is_group);
        assert_eq!(tree.help, "Knowledge Retention Library");

        let task = &tree.subcommands["task"];
        assert!(task.is_group);
        assert!(!task.subcommands["create"].is_group);

        let paths = all_command_paths(&tree);
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
    fn option_classification() {
        let tree = extract(&sample_cli(), "knl");

        let json = &tree.options[0];
        assert_eq!(json.name, "--json");
        assert_eq!(json.kind, OptionKind::Flag);
        assert_eq!(json.value_type, "bool");
        assert!(!json.required);

        let format = &tree.subcommands["init"].options[0];
        assert_eq!(format.name, "--format");
        assert_eq!(format.kind, OptionKind::Option);
        assert_eq!(format.default.as_deref(), Some("jira"));

        let task_id = &tree.subcommands["task"].subcommands["create"].options[0];
        assert_eq!(task_id.name, "TASK_ID");
        assert_eq!(task_id.kind, OptionKind::Argument);
        assert!(task_id.required);
        assert!(task_id.default.is_none());
    }
}
