//! Configuration and shared handles for every command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use ucload_pm::{Config, DownloadManager, ImportLedger, ModRegistry, Organization};

/// Where an installed mod lands relative to the chrome directory
#[derive(Args, Debug, Clone, Default)]
pub struct PlacementArgs {
    /// Copy files directly into the chrome directory
    #[arg(long, conflicts_with = "subfolder")]
    pub flat: bool,

    /// Copy files into a folder named after the mod
    #[arg(long)]
    pub subfolder: bool,
}

impl PlacementArgs {
    pub fn organization(&self, fallback: Organization) -> Organization {
        if self.flat {
            Organization::Flat
        } else if self.subfolder {
            Organization::Subfolder
        } else {
            fallback
        }
    }
}

pub struct CliContext {
    pub config: Config,
    pub interactive: bool,
}

impl CliContext {
    pub fn new(chrome_dir: Option<&Path>, interactive: bool) -> Result<Self> {
        let mut config = Config::build(true).context("Failed to load configuration")?;

        if let Some(dir) = chrome_dir {
            let dir = absolute(dir)?;
            config
                .set("chrome-dir", serde_json::json!(dir))
                .context("Invalid --chrome-dir")?;
        } else if let Some(dir) = config.chrome_dir.take() {
            config.chrome_dir = Some(absolute(&dir)?);
        }

        Ok(Self {
            config,
            interactive: interactive && console::user_attended(),
        })
    }

    pub fn chrome_dir(&self) -> Result<PathBuf> {
        Ok(self.config.get_chrome_dir()?)
    }

    pub fn ledger(&self) -> Result<ImportLedger> {
        Ok(ImportLedger::new(self.chrome_dir()?))
    }

    pub async fn registry(&self) -> Result<ModRegistry> {
        let path = self.config.get_registry_file();
        ModRegistry::open(&path)
            .await
            .with_context(|| format!("Failed to open mod registry {}", path.display()))
    }

    pub fn download_manager(&self) -> Result<DownloadManager> {
        DownloadManager::from_config(&self.config).context("Failed to create HTTP client")
    }
}

/// Resolve `path` against the working directory; records require absolute install paths
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    Ok(cwd.join(path))
}

/// Convert a 1-based index typed by the user into a ledger index
pub fn zero_based(index: usize) -> Result<usize> {
    index
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("Import numbers start at 1"))
}
