use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::record::ModRecord;
use crate::error::{ModError, Result};

/// On-disk layout of the registry file
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    mods: IndexMap<String, ModRecord>,
}

/// Persisted map of source URL to [`ModRecord`] (mods.json)
pub struct ModRegistry {
    path: PathBuf,
    records: RwLock<IndexMap<String, ModRecord>>,
}

impl ModRegistry {
    /// Create an empty registry backed by `path`; nothing is read until [`load`](Self::load)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: RwLock::new(IndexMap::new()),
        }
    }

    /// Create a registry and load any existing records
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let registry = Self::new(path);
        registry.load().await?;
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<()> {
        let mut records = self.records.write().await;
        records.clear();

        if !self.path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ModError::from_io(e, &self.path))?;
        if content.trim().is_empty() {
            return Ok(());
        }

        let data: RegistryFile = serde_json::from_str(&content).map_err(|e| {
            ModError::Config(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        for (url, record) in data.mods {
            record.validate()?;
            records.insert(url, record);
        }

        Ok(())
    }

    /// Insert or replace the record keyed by its URL
    pub async fn save(&self, record: ModRecord) -> Result<()> {
        record.validate()?;
        let mut records = self.records.write().await;
        records.insert(record.url.clone(), record);
        self.persist(&records)
    }

    pub async fn get(&self, url: &str) -> Option<ModRecord> {
        self.records.read().await.get(url).cloned()
    }

    pub async fn list(&self) -> Vec<ModRecord> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn remove(&self, url: &str) -> Result<Option<ModRecord>> {
        let mut records = self.records.write().await;
        let removed = records.shift_remove(url);
        if removed.is_some() {
            self.persist(&records)?;
        }
        Ok(removed)
    }

    /// Find the record whose import line references `import_path`
    pub async fn find_by_import_path(&self, import_path: &str) -> Option<ModRecord> {
        let wanted = normalize_import_path(import_path);
        self.records
            .read()
            .await
            .values()
            .find(|r| r.import_path.as_deref().map(normalize_import_path).as_deref() == Some(wanted.as_str()))
            .cloned()
    }

    fn persist(&self, records: &IndexMap<String, ModRecord>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| ModError::from_io(e, &dir))?;

        let data = RegistryFile { mods: records.clone() };
        let json = serde_json::to_string_pretty(&data)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| ModError::from_io(e, &dir))?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| ModError::from_io(e.error, &self.path))?;

        log::debug!("Wrote {} mod record(s) to {}", records.len(), self.path.display());
        Ok(())
    }
}

fn normalize_import_path(path: &str) -> String {
    path.trim().trim_start_matches("./").replace('\\', "/")
}
