use crate::error::Result;
use crate::paths;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CrumbMetadata
// ---------------------------------------------------------------------------

/// YAML frontmatter of a knowledge crumb.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrumbMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub created: NaiveDate,
    pub updated: NaiveDate,
    pub author: String,
    #[serde(default)]
    pub related: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub applies_to: Vec<String>,
}

// ---------------------------------------------------------------------------
// Crumb
// ---------------------------------------------------------------------------

/// A knowledge crumb: a markdown file with frontmatter, addressed by its
/// path relative to the crumb library (e.g. `devops/github-pages-setup.md`).
#[derive(Debug, Clone)]
pub struct Crumb {
    pub path: PathBuf,
    pub metadata: CrumbMetadata,
    pub content: String,
    pub file_path: PathBuf,
}

impl Crumb {
    /// Crumb slug: relative path without the `.md` extension.
    pub fn slug(&self) -> String {
        self.path.with_extension("").to_string_lossy().into_owned()
    }

    pub fn matches_category(&self, category: &str) -> bool {
        self.metadata.category.eq_ignore_ascii_case(category)
    }

    pub fn matches_tag(&self, tag: &str) -> bool {
        self.metadata
            .tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.metadata.title.to_lowercase().contains(&query)
            || self.metadata.description.to_lowercase().contains(&query)
            || self.content.to_lowercase().contains(&query)
            || self
                .metadata
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&query))
    }
}

/// Parse a crumb file: `---` fenced YAML frontmatter followed by markdown.
/// Returns `None` for files without valid frontmatter — invalid crumbs are
/// skipped, not errors.
pub fn parse_crumb(file_path: &Path, base: &Path) -> Option<Crumb> {
    let content = std::fs::read_to_string(file_path).ok()?;
    let rest = content.strip_prefix("---\n")?;
    let (frontmatter, body) = rest.split_once("\n---\n")?;

    let metadata: CrumbMetadata = serde_yaml::from_str(frontmatter).ok()?;
    let path = file_path
        .strip_prefix(base)
        .unwrap_or(file_path)
        .to_path_buf();

    Some(Crumb {
        path,
        metadata,
        content: body.trim().to_string(),
        file_path: file_path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// CrumbStore
// ---------------------------------------------------------------------------

/// Locator and index over the crumb library.
///
/// Checks the repo-local library first (`.knl/know-how/crumbs/`), then the
/// user-local one (`~/.local/knl/know-how/crumbs/`).
pub struct CrumbStore {
    pub crumbs_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Description,
    Tags,
    Content,
}

impl CrumbStore {
    pub fn open(root: &Path) -> Self {
        let repo_local = root.join(paths::LOCAL_CRUMBS_DIR);
        if repo_local.exists() {
            return Self {
                crumbs_dir: Some(repo_local),
            };
        }
        if let Ok(user_local) = paths::user_crumbs_dir() {
            if user_local.exists() {
                return Self {
                    crumbs_dir: Some(user_local),
                };
            }
        }
        Self { crumbs_dir: None }
    }

    pub fn at(dir: PathBuf) -> Self {
        Self {
            crumbs_dir: Some(dir),
        }
    }

    /// List all crumbs, optionally filtered. README files and files that
    /// fail to parse are skipped.
    pub fn list(
        &self,
        category: Option<&str>,
        tags: &[String],
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Crumb>> {
        let Some(base) = &self.crumbs_dir else {
            return Ok(Vec::new());
        };
        if !base.exists() {
            return Ok(Vec::new());
        }

        let mut crumbs = Vec::new();
        collect_markdown(base, &mut |file| {
            if file
                .file_name()
                .map(|n| n.eq_ignore_ascii_case("readme.md"))
                .unwrap_or(false)
            {
                return;
            }
            let Some(crumb) = parse_crumb(file, base) else {
                return;
            };
            if let Some(cat) = category {
                if !crumb.matches_category(cat) {
                    return;
                }
            }
            if !tags.is_empty() && !tags.iter().any(|t| crumb.matches_tag(t)) {
                return;
            }
            if let Some(d) = difficulty {
                if crumb.metadata.difficulty != d {
                    return;
                }
            }
            crumbs.push(crumb);
        })?;

        crumbs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(crumbs)
    }

    /// Get a crumb by its slug or relative path; the `.md` extension is
    /// optional.
    pub fn get(&self, crumb_path: &str) -> Result<Option<Crumb>> {
        let Some(base) = &self.crumbs_dir else {
            return Ok(None);
        };
        let mut file_path = base.join(crumb_path);
        if file_path.extension().is_none() {
            file_path.set_extension("md");
        }
        if !file_path.exists() {
            return Ok(None);
        }
        Ok(parse_crumb(&file_path, base))
    }

    pub fn find(&self, query: &str, field: Option<SearchField>) -> Result<Vec<Crumb>> {
        let all = self.list(None, &[], None)?;
        let query_lower = query.to_lowercase();

        Ok(all
            .into_iter()
            .filter(|crumb| match field {
                None => crumb.matches_query(query),
                Some(SearchField::Title) => {
                    crumb.metadata.title.to_lowercase().contains(&query_lower)
                }
                Some(SearchField::Description) => crumb
                    .metadata
                    .description
                    .to_lowercase()
                    .contains(&query_lower),
                Some(SearchField::Tags) => crumb
                    .metadata
                    .tags
                    .iter()
                    .any(|t| t.to_lowercase().contains(&query_lower)),
                Some(SearchField::Content) => {
                    crumb.content.to_lowercase().contains(&query_lower)
                }
            })
            .collect())
    }

    /// All categories with crumb counts, sorted by name.
    pub fn categories(&self) -> Result<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for crumb in self.list(None, &[], None)? {
            *counts.entry(crumb.metadata.category).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// All tags with usage counts, sorted by name.
    pub fn tags(&self) -> Result<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for crumb in self.list(None, &[], None)? {
            for tag in crumb.metadata.tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

fn collect_markdown(dir: &Path, visit: &mut impl FnMut(&Path)) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_markdown(&path, visit)?;
        } else if path.extension().map(|e| e == "md").unwrap_or(false) {
            visit(&path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CRUMB: &str = "\
---
title: GitHub Pages Setup
description: Publish docs with GitHub Pages
category: devops
tags:
  - github
  - ci
difficulty: beginner
created: 2025-11-02
updated: 2026-01-15
author: aka
---

## Steps

Enable Pages in repository settings.
";

    fn library() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("devops")).unwrap();
        std::fs::write(dir.path().join("devops/github-pages-setup.md"), CRUMB).unwrap();
        std::fs::write(
            dir.path().join("devops/README.md"),
            "# index — not a crumb\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.md"), "no frontmatter here\n").unwrap();
        dir
    }

    #[test]
    fn parse_crumb_frontmatter_and_body() {
        let dir = library();
        let crumb = parse_crumb(
            &dir.path().join("devops/github-pages-setup.md"),
            dir.path(),
        )
        .unwrap();
        assert_eq!(crumb.metadata.title, "GitHub Pages Setup");
        assert_eq!(crumb.metadata.difficulty, Difficulty::Beginner);
        assert_eq!(crumb.metadata.tags, vec!["github", "ci"]);
        assert!(crumb.content.starts_with("## Steps"));
        assert_eq!(crumb.slug(), "devops/github-pages-setup");
    }

    #[test]
    fn parse_crumb_rejects_missing_frontmatter() {
        let dir = library();
        assert!(parse_crumb(&dir.path().join("broken.md"), dir.path()).is_none());
    }

    #[test]
    fn list_skips_readme_and_broken_files() {
        let dir = library();
        let store = CrumbStore::at(dir.path().to_path_buf());
        let crumbs = store.list(None, &[], None).unwrap();
        assert_eq!(crumbs.len(), 1);
    }

    #[test]
    fn list_filters() {
        let dir = library();
        let store = CrumbStore::at(dir.path().to_path_buf());

        assert_eq!(store.list(Some("devops"), &[], None).unwrap().len(), 1);
        assert_eq!(store.list(Some("frontend"), &[], None).unwrap().len(), 0);
        assert_eq!(
            store
                .list(None, &["github".to_string()], None)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store
                .list(None, &[], Some(Difficulty::Advanced))
                .unwrap()
                .len(),
            0
        );
    }

    #[test]
    fn get_by_slug_without_extension() {
        let dir = library();
        let store = CrumbStore::at(dir.path().to_path_buf());
        let crumb = store.get("devops/github-pages-setup").unwrap().unwrap();
        assert_eq!(crumb.metadata.category, "devops");
        assert!(store.get("devops/nope").unwrap().is_none());
    }

    #[test]
    fn find_in_fields() {
        let dir = library();
        let store = CrumbStore::at(dir.path().to_path_buf());

        assert_eq!(store.find("pages", None).unwrap().len(), 1);
        assert_eq!(
            store.find("pages", Some(SearchField::Title)).unwrap().len(),
            1
        );
        assert_eq!(
            store.find("ci", Some(SearchField::Tags)).unwrap().len(),
            1
        );
        assert_eq!(
            store
                .find("settings", Some(SearchField::Content))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.find("kubernetes", None).unwrap().len(), 0);
    }

    #[test]
    fn categories_and_tags_counts() {
        let dir = library();
        let store = CrumbStore::at(dir.path().to_path_buf());
        let cats = store.categories().unwrap();
        assert_eq!(cats.get("devops"), Some(&1));
        let tags = store.tags().unwrap();
        assert_eq!(tags.get("github"), Some(&1));
        assert_eq!(tags.get("ci"), Some(&1));
    }

    #[test]
    fn missing_library_is_empty() {
        let store = CrumbStore { crumbs_dir: None };
        assert!(store.list(None, &[], None).unwrap().is_empty());
        assert!(store.get("anything").unwrap().is_none());
    }
}
