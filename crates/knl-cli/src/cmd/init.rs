use anyhow::Context;
use knl_core::config::{LocalConfig, TaskConfig};
use knl_core::types::TaskIdKind;
use knl_core::{io, paths, task};
use std::path::Path;

pub fn run(root: &Path, force: bool, format: &str, project: Option<&str>) -> anyhow::Result<()> {
    if paths::knowledge_dir(root).is_dir() && !force {
        anyhow::bail!("knl already initialized in this repository (use --force to reinitialize)");
    }

    let id_format = match format {
        "jira" => TaskIdKind::Jira,
        "github" => TaskIdKind::Github,
        other => anyhow::bail!("unknown task ID format '{other}'; supported: jira, github"),
    };

    println!("Initializing knl in: {}", root.display());

    // 1. Create the .knowledge directory tree
    let dirs = [
        paths::KNOWLEDGE_DIR,
        paths::TASKS_DIR,
        paths::CACHE_DIR,
        paths::SCRIPTS_DIR,
        paths::TEMPLATES_DIR,
        paths::STANDARDS_DIR,
    ];
    for dir in dirs {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    // 2. Keep the knowledge base out of version control
    let created = io::write_if_missing(
        &root.join(paths::KNOWLEDGE_DIR).join(".gitignore"),
        KNOWLEDGE_GITIGNORE.as_bytes(),
    )?;
    if created {
        println!("  created: .knowledge/.gitignore");
    }
    io::ensure_gitignore_entry(root, ".knowledge/")?;

    // 3. Write local configuration
    let config = LocalConfig {
        task: TaskConfig {
            id_format,
            jira_project: match (id_format, project) {
                (TaskIdKind::Jira, Some(p)) => p.to_string(),
                _ => String::new(),
            },
            github_repo: match (id_format, project) {
                (TaskIdKind::Github, Some(p)) => p.to_string(),
                _ => String::new(),
            },
            ..TaskConfig::default()
        },
        docs: None,
    };
    config.save(root).context("failed to write config.yaml")?;
    println!("  created: .knowledge/config.yaml");

    // 4. Seed templates and standards
    if io::write_if_missing(
        &paths::context_template_path(root),
        task::DEFAULT_CONTEXT_TEMPLATE.as_bytes(),
    )? {
        println!("  created: .knowledge/templates/context.md");
    } else {
        println!("  exists:  .knowledge/templates/context.md");
    }

    let standards = standards_md(id_format);
    if io::write_if_missing(
        &root.join(paths::STANDARDS_DIR).join("development.md"),
        standards.as_bytes(),
    )? {
        println!("  created: .knowledge/standards/development.md");
    } else {
        println!("  exists:  .knowledge/standards/development.md");
    }

    println!("\nknl initialized successfully.");
    println!("  Task format: {id_format}");
    if let Some(p) = project {
        println!("  Project: {p}");
    }
    println!("\nNext steps:");
    println!("  • Create a task: knl create <TASK-ID>");
    println!("  • List tasks:    knl list");

    Ok(())
}

const KNOWLEDGE_GITIGNORE: &str = "\
# Ignore everything in .knowledge by default
*
!.gitignore

# Optionally include specific items:
# !templates/
# !standards/
";

fn standards_md(id_format: TaskIdKind) -> String {
    format!(
        "\
# Development Standards

## Task Management

- Task ID format: **{id_format}**
- All development work should be tracked in tasks
- Keep task context updated as work progresses

## Documentation

- Update relevant documentation with every change
- Run `knl docs check` before release
- Regenerate the CLI reference with `knl docs sync`

## Git Workflow

- One task per branch
- Reference the task ID in commits
- Review code before merging

---

*This document will evolve as the project develops patterns and practices.*
"
    )
}
