use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use knl_core::config::{self, GlobalConfig, LocalConfig};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Get a configuration value (local overrides global)
    Get {
        /// Configuration key in dot notation (e.g. 'task.id_format')
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key in dot notation
        key: String,
        /// Value to set
        value: String,
        /// Set in the repository-local config instead of the global one
        #[arg(long, short = 'l')]
        local: bool,
    },
    /// List all configuration values
    List {
        /// Show local config only
        #[arg(long, short = 'l')]
        local: bool,
        /// Show global config only
        #[arg(long, short = 'g')]
        global: bool,
    },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Get { key } => get(root, &key, json),
        ConfigSubcommand::Set { key, value, local } => set(root, &key, &value, local),
        ConfigSubcommand::List { local, global } => list(root, local, global, json),
    }
}

fn get(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let value = config::get_value(Some(root), key)
        .with_context(|| format!("configuration key '{key}' not found"))?;

    if json {
        print_json(&serde_json::json!({ "key": key, "value": value }))?;
    } else {
        println!("{key} = {value}");
    }
    Ok(())
}

fn set(root: &Path, key: &str, value: &str, local: bool) -> anyhow::Result<()> {
    if local {
        crate::cmd::require_repo(root)?;
    }
    config::set_value(Some(root), key, value, local)
        .with_context(|| format!("failed to set '{key}'"))?;

    let scope = if local { "local" } else { "global" };
    println!("✓ Set {scope} config: {key} = {value}");
    Ok(())
}

fn list(root: &Path, local_only: bool, global_only: bool, json: bool) -> anyhow::Result<()> {
    if !global_only {
        if let Some(local) = LocalConfig::load(root).context("failed to load local config")? {
            let value = serde_yaml::to_value(&local)?;
            if json {
                print_json(&serde_json::json!({ "local": value }))?;
            } else {
                println!("\nLocal configuration (.knowledge/config.yaml)\n");
                print_dotted(&value, "");
            }
        }
    }

    if !local_only {
        let global = GlobalConfig::load().context("failed to load global config")?;
        let value = serde_yaml::to_value(&global)?;
        if json {
            print_json(&serde_json::json!({ "global": value }))?;
        } else {
            println!("\nGlobal configuration (~/.config/knl/config.yaml)\n");
            print_dotted(&value, "");
        }
    }

    Ok(())
}

fn print_dotted(value: &serde_yaml::Value, prefix: &str) {
    let Some(map) = value.as_mapping() else {
        return;
    };
    for (k, v) in map {
        let key = k.as_str().unwrap_or_default();
        let full = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        if v.is_mapping() {
            print_dotted(v, &full);
        } else {
            let rendered = match v {
                serde_yaml::Value::String(s) => s.clone(),
                other => serde_yaml::to_string(other)
                    .unwrap_or_default()
                    .trim_end()
                    .to_string(),
            };
            println!("  {full} = {rendered}");
        }
    }
}
