use crate::output::{print_json, print_table};
use clap::Subcommand;
use knl_core::crumb::{CrumbStore, Difficulty, SearchField};
use std::path::Path;

#[derive(Subcommand)]
pub enum CrumbSubcommand {
    /// List knowledge crumbs
    List {
        /// Filter by category
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// Filter by tag (repeatable, any match)
        #[arg(long, short = 't')]
        tag: Vec<String>,
        /// Filter by difficulty (beginner, intermediate, advanced)
        #[arg(long, short = 'd')]
        difficulty: Option<String>,
    },
    /// Show a crumb's content
    Show {
        /// Crumb path (e.g. devops/github-pages-setup)
        path: String,
    },
    /// Search crumbs by text
    Find {
        /// Search query
        query: String,
        /// Restrict the search to one field (title, description, tags, content)
        #[arg(long = "in")]
        field: Option<String>,
    },
    /// List categories with crumb counts
    Categories,
    /// List tags with usage counts
    Tags,
}

pub fn run(root: &Path, subcmd: CrumbSubcommand, json: bool) -> anyhow::Result<()> {
    let store = CrumbStore::open(root);

    match subcmd {
        CrumbSubcommand::List {
            category,
            tag,
            difficulty,
        } => list(&store, category.as_deref(), &tag, difficulty.as_deref(), json),
        CrumbSubcommand::Show { path } => show(&store, &path, json),
        CrumbSubcommand::Find { query, field } => find(&store, &query, field.as_deref(), json),
        CrumbSubcommand::Categories => categories(&store, json),
        CrumbSubcommand::Tags => tags(&store, json),
    }
}

fn parse_difficulty(s: &str) -> anyhow::Result<Difficulty> {
    match s {
        "beginner" => Ok(Difficulty::Beginner),
        "intermediate" => Ok(Difficulty::Intermediate),
        "advanced" => Ok(Difficulty::Advanced),
        other => anyhow::bail!(
            "invalid difficulty '{other}'; expected beginner, intermediate, or advanced"
        ),
    }
}

fn list(
    store: &CrumbStore,
    category: Option<&str>,
    tags: &[String],
    difficulty: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let difficulty = difficulty.map(parse_difficulty).transpose()?;
    let crumbs = store.list(category, tags, difficulty)?;

    if json {
        let items: Vec<serde_json::Value> = crumbs
            .iter()
            .map(|c| {
                serde_json::json!({
                    "slug": c.slug(),
                    "title": c.metadata.title,
                    "category": c.metadata.category,
                    "difficulty": c.metadata.difficulty.as_str(),
                    "tags": c.metadata.tags,
                })
            })
            .collect();
        print_json(&items)?;
        return Ok(());
    }

    if crumbs.is_empty() {
        println!("No crumbs found.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = crumbs
        .iter()
        .map(|c| {
            vec![
                c.slug(),
                c.metadata.title.clone(),
                c.metadata.category.clone(),
                c.metadata.difficulty.to_string(),
            ]
        })
        .collect();
    print_table(&["CRUMB", "TITLE", "CATEGORY", "DIFFICULTY"], rows);
    println!("\nTotal: {} crumb(s)", crumbs.len());
    Ok(())
}

fn show(store: &CrumbStore, path: &str, json: bool) -> anyhow::Result<()> {
    let Some(crumb) = store.get(path)? else {
        anyhow::bail!("crumb '{path}' not found");
    };

    if json {
        print_json(&serde_json::json!({
            "slug": crumb.slug(),
            "metadata": serde_yaml::to_value(&crumb.metadata)?,
            "content": crumb.content,
        }))?;
        return Ok(());
    }

    println!("\n# {}\n", crumb.metadata.title);
    println!("{}\n", crumb.metadata.description);
    println!(
        "Category: {}  │  Difficulty: {}  │  Updated: {}",
        crumb.metadata.category, crumb.metadata.difficulty, crumb.metadata.updated
    );
    if !crumb.metadata.tags.is_empty() {
        println!("Tags: {}", crumb.metadata.tags.join(", "));
    }
    println!("\n{}", crumb.content);
    Ok(())
}

fn find(store: &CrumbStore, query: &str, field: Option<&str>, json: bool) -> anyhow::Result<()> {
    let field = match field {
        None => None,
        Some("title") => Some(SearchField::Title),
        Some("description") => Some(SearchField::Description),
        Some("tags") => Some(SearchField::Tags),
        Some("content") => Some(SearchField::Content),
        Some(other) => anyhow::bail!(
            "invalid field '{other}'; expected title, description, tags, or content"
        ),
    };

    let matches = store.find(query, field)?;

    if json {
        let items: Vec<String> = matches.iter().map(|c| c.slug()).collect();
        print_json(&items)?;
        return Ok(());
    }

    if matches.is_empty() {
        println!("No crumbs matching '{query}'.");
        return Ok(());
    }

    for crumb in &matches {
        println!("{}  —  {}", crumb.slug(), crumb.metadata.description);
    }
    println!("\n{} match(es)", matches.len());
    Ok(())
}

fn categories(store: &CrumbStore, json: bool) -> anyhow::Result<()> {
    let counts = store.categories()?;

    if json {
        print_json(&counts)?;
        return Ok(());
    }

    if counts.is_empty() {
        println!("No crumbs installed.");
        return Ok(());
    }
    for (category, count) in counts {
        println!("{category}  ({count})");
    }
    Ok(())
}

fn tags(store: &CrumbStore, json: bool) -> anyhow::Result<()> {
    let counts = store.tags()?;

    if json {
        print_json(&counts)?;
        return Ok(());
    }

    if counts.is_empty() {
        println!("No crumbs installed.");
        return Ok(());
    }
    for (tag, count) in counts {
        println!("{tag}  ({count})");
    }
    Ok(())
}
