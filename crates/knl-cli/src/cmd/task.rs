use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use knl_core::task::Task;
use knl_core::types::TaskStatus;
use std::io::BufRead;
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Create a new task
    Create {
        /// Task ID (e.g. PROJ-123 or '#456')
        task_id: String,
        /// Task title
        #[arg(long, short = 't', default_value = "")]
        title: String,
    },
    /// List all tasks
    List {
        /// Filter by status
        #[arg(long, short = 's')]
        status: Option<String>,
        /// Include archived tasks
        #[arg(long, short = 'a')]
        all: bool,
    },
    /// Show task details
    Show {
        /// Task ID to show
        task_id: String,
    },
    /// Update task metadata
    Update {
        /// Task ID to update
        task_id: String,
        /// New status
        #[arg(long, short = 's')]
        status: Option<String>,
        /// New title
        #[arg(long, short = 't')]
        title: Option<String>,
    },
    /// Delete a task
    Delete {
        /// Task ID to delete
        task_id: String,
        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    crate::cmd::require_repo(root)?;

    match subcmd {
        TaskSubcommand::Create { task_id, title } => create(root, &task_id, &title, json),
        TaskSubcommand::List { status, all } => list(root, status.as_deref(), all, json),
        TaskSubcommand::Show { task_id } => show(root, &task_id, json),
        TaskSubcommand::Update {
            task_id,
            status,
            title,
        } => update(root, &task_id, status.as_deref(), title.as_deref(), json),
        TaskSubcommand::Delete { task_id, force } => delete(root, &task_id, force, json),
    }
}

pub fn create(root: &Path, task_id: &str, title: &str, json: bool) -> anyhow::Result<()> {
    let task = Task::create(root, task_id, title)
        .with_context(|| format!("failed to create task '{task_id}'"))?;

    if json {
        print_json(&task.metadata)?;
    } else {
        println!("✓ Task created: {task_id}");
        println!(
            "  Location: .knowledge/tasks/{}",
            task.metadata.normalized_id
        );
        println!(
            "  Context:  .knowledge/tasks/{}/context.md",
            task.metadata.normalized_id
        );
    }
    Ok(())
}

pub fn list(root: &Path, status: Option<&str>, all: bool, json: bool) -> anyhow::Result<()> {
    let status = status
        .map(|s| s.parse::<TaskStatus>())
        .transpose()
        .context("invalid status filter")?;

    let tasks = Task::list(root, status, all).context("failed to list tasks")?;

    if json {
        print_json(&tasks)?;
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        println!("Create a task with: knl create <TASK-ID>");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|t| {
            vec![
                t.task_id.clone(),
                if t.title.is_empty() {
                    "(no title)".to_string()
                } else {
                    t.title.clone()
                },
                t.status.to_string(),
                t.created_at.format("%Y-%m-%d").to_string(),
                t.updated_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_table(&["TASK ID", "TITLE", "STATUS", "CREATED", "UPDATED"], rows);
    println!("\nTotal: {} task(s)", tasks.len());
    Ok(())
}

pub fn show(root: &Path, task_id: &str, json: bool) -> anyhow::Result<()> {
    let task =
        Task::load(root, task_id).with_context(|| format!("task '{task_id}' not found"))?;
    let meta = &task.metadata;

    if json {
        print_json(meta)?;
        return Ok(());
    }

    println!("\n{}: {}\n", meta.task_id, meta.title);
    if !meta.description.is_empty() {
        println!("Description:\n{}\n", meta.description);
    }
    println!("Status:  {}", meta.status);
    println!("Type:    {}", meta.kind);
    println!("Created: {}", meta.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", meta.updated_at.format("%Y-%m-%d %H:%M"));
    if let Some(completed) = meta.completed_at {
        println!("Completed: {}", completed.format("%Y-%m-%d %H:%M"));
    }
    if let Some(url) = &meta.external_url {
        println!("URL:     {url}");
    }
    if let Some(branch) = &meta.branch_name {
        println!("Branch:  {branch}");
    }
    if !meta.tags.is_empty() {
        println!("Tags:    {}", meta.tags.join(", "));
    }
    println!("\nLocation: .knowledge/tasks/{}", meta.normalized_id);
    Ok(())
}

pub fn update(
    root: &Path,
    task_id: &str,
    status: Option<&str>,
    title: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let mut task =
        Task::load(root, task_id).with_context(|| format!("task '{task_id}' not found"))?;

    if let Some(s) = status {
        let parsed = s
            .parse::<TaskStatus>()
            .with_context(|| format!("invalid status '{s}'"))?;
        task.metadata.set_status(parsed);
    }
    if let Some(t) = title {
        task.metadata.set_title(t);
    }

    task.save(root).context("failed to save task")?;

    if json {
        print_json(&task.metadata)?;
    } else {
        println!("✓ Task {task_id} updated.");
    }
    Ok(())
}

pub fn delete(root: &Path, task_id: &str, force: bool, json: bool) -> anyhow::Result<()> {
    if !Task::exists(root, task_id) {
        anyhow::bail!("task '{task_id}' not found");
    }

    if !force {
        println!("Delete task {task_id} and all its data? [y/N]");
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        if !line.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    Task::delete(root, task_id).with_context(|| format!("failed to delete '{task_id}'"))?;

    if json {
        print_json(&serde_json::json!({ "task_id": task_id, "deleted": true }))?;
    } else {
        println!("✓ Task {task_id} deleted.");
    }
    Ok(())
}
