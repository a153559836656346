use crate::error::{KnlError, Result};
use crate::paths;
use crate::types::TaskIdKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// TaskConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_id_format")]
    pub id_format: TaskIdKind,
    #[serde(default)]
    pub jira_project: String,
    #[serde(default)]
    pub github_repo: String,
    #[serde(default = "default_true")]
    pub auto_detect_from_branch: bool,
}

fn default_id_format() -> TaskIdKind {
    TaskIdKind::Jira
}

fn default_true() -> bool {
    true
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            id_format: default_id_format(),
            jira_project: String::new(),
            github_repo: String::new(),
            auto_detect_from_branch: true,
        }
    }
}

// ---------------------------------------------------------------------------
// DocsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Command that starts the analysis backend (stdio transport).
    #[serde(default = "default_analyzer_command")]
    pub analyzer_command: String,
    #[serde(default)]
    pub analyzer_args: Vec<String>,
    /// Apply documentation updates without interactive review.
    #[serde(default)]
    pub auto_approve: bool,
    /// Directory for the generated CLI reference, relative to the repo root.
    #[serde(default = "default_reference_dir")]
    pub reference_dir: PathBuf,
    /// Minimum documentation coverage (0.0–1.0) before `docs check` fails.
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,
}

fn default_analyzer_command() -> String {
    "knl-docs-analyzer".to_string()
}

fn default_reference_dir() -> PathBuf {
    PathBuf::from("docs/cli")
}

fn default_coverage_threshold() -> f64 {
    0.8
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            analyzer_command: default_analyzer_command(),
            analyzer_args: Vec::new(),
            auto_approve: false,
            reference_dir: default_reference_dir(),
            coverage_threshold: default_coverage_threshold(),
        }
    }
}

// ---------------------------------------------------------------------------
// GlobalConfig / LocalConfig
// ---------------------------------------------------------------------------

/// Global configuration stored in `~/.config/knl/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_editor")]
    pub editor: String,
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default = "default_true")]
    pub color_output: bool,
    #[serde(default)]
    pub verbose: bool,
}

fn default_editor() -> String {
    "vim".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            editor: default_editor(),
            task: TaskConfig::default(),
            docs: DocsConfig::default(),
            color_output: true,
            verbose: false,
        }
    }
}

/// Local configuration stored in `<repo>/.knowledge/config.yaml`.
/// Fields present here override the global config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<DocsConfig>,
}

impl GlobalConfig {
    /// Load the global config, writing the defaults on first use.
    pub fn load() -> Result<Self> {
        let path = paths::global_config_path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save()?;
            return Ok(cfg);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = paths::global_config_path()?;
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

impl LocalConfig {
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&data)?))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

/// The effective docs configuration for a repo: local override, else global.
pub fn effective_docs_config(root: &Path) -> Result<DocsConfig> {
    if let Some(local) = LocalConfig::load(root)? {
        if let Some(docs) = local.docs {
            return Ok(docs);
        }
    }
    Ok(GlobalConfig::load()?.docs)
}

// ---------------------------------------------------------------------------
// Dotted-key access
// ---------------------------------------------------------------------------

fn lookup<'a>(value: &'a serde_yaml::Value, key: &str) -> Option<&'a serde_yaml::Value> {
    let mut current = value;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn render_scalar(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

/// Get a configuration value by dotted key (e.g. `task.id_format`),
/// preferring the local config over the global one.
pub fn get_value(root: Option<&Path>, key: &str) -> Result<String> {
    if let Some(root) = root {
        if let Some(local) = LocalConfig::load(root)? {
            let value = serde_yaml::to_value(&local)?;
            if let Some(found) = lookup(&value, key) {
                if !found.is_null() {
                    return Ok(render_scalar(found));
                }
            }
        }
    }

    let global = serde_yaml::to_value(GlobalConfig::load()?)?;
    match lookup(&global, key) {
        Some(found) if !found.is_null() => Ok(render_scalar(found)),
        _ => Err(KnlError::ConfigKeyNotFound(key.to_string())),
    }
}

fn insert(value: &mut serde_yaml::Value, key: &str, new: serde_yaml::Value) {
    use serde_yaml::{Mapping, Value};

    let parts: Vec<&str> = key.split('.').collect();
    let mut current = value;
    for part in &parts[..parts.len() - 1] {
        if !current.is_mapping() {
            *current = Value::Mapping(Mapping::new());
        }
        let Some(map) = current.as_mapping_mut() else {
            return;
        };
        let map_key = Value::String(part.to_string());
        if !map.contains_key(&map_key) {
            map.insert(map_key.clone(), Value::Mapping(Mapping::new()));
        }
        let Some(next) = map.get_mut(&map_key) else {
            return;
        };
        current = next;
    }
    if !current.is_mapping() {
        *current = Value::Mapping(Mapping::new());
    }
    if let Some(map) = current.as_mapping_mut() {
        map.insert(Value::String(parts[parts.len() - 1].to_string()), new);
    }
}

fn parse_scalar(raw: &str) -> serde_yaml::Value {
    // Booleans and numbers get their natural type; everything else is a string.
    serde_yaml::from_str::<serde_yaml::Value>(raw)
        .ok()
        .filter(|v| v.is_bool() || v.is_number())
        .unwrap_or_else(|| serde_yaml::Value::String(raw.to_string()))
}

/// Set a configuration value by dotted key in the local or global config.
/// The updated document must still deserialize into the typed config, so
/// typos in enum values fail here instead of at the next load.
pub fn set_value(root: Option<&Path>, key: &str, raw: &str, local: bool) -> Result<()> {
    let new = parse_scalar(raw);

    if local {
        let root = root.ok_or(KnlError::NotInitialized)?;
        let config = LocalConfig::load(root)?.unwrap_or_default();
        let mut value = serde_yaml::to_value(&config)?;
        insert(&mut value, key, new);
        let updated: LocalConfig = serde_yaml::from_value(value)?;
        updated.save(root)
    } else {
        let config = GlobalConfig::load()?;
        let mut value = serde_yaml::to_value(&config)?;
        insert(&mut value, key, new);
        let updated: GlobalConfig = serde_yaml::from_value(value)?;
        updated.save()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
