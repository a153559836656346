pub mod config;
pub mod crumb;
pub mod docs;
pub mod init;
pub mod task;

use std::path::Path;

/// Commands that store anything require an initialized repository.
pub fn require_repo(root: &Path) -> anyhow::Result<()> {
    if knl_core::paths::knowledge_dir(root).is_dir() {
        Ok(())
    } else {
        anyhow::bail!("not a knl repository (run 'knl init' first)")
    }
}
