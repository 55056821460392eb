use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ModError, Result};
use crate::source::SourceType;

/// A mod installed from a remote source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModRecord {
    pub url: String,

    /// When the installed copy was fetched; updates are detected relative to this
    pub last_checked: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Installed entry file or folder, always inside the chrome directory
    pub install_path: PathBuf,

    pub source_type: SourceType,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,

    /// Path referenced by the mod's import line, relative to the chrome directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_path: Option<String>,
}

impl ModRecord {
    pub fn new(url: impl Into<String>, install_path: impl Into<PathBuf>, source_type: SourceType) -> Self {
        Self {
            url: url.into(),
            last_checked: Utc::now(),
            version: None,
            etag: None,
            install_path: install_path.into(),
            source_type,
            metadata: IndexMap::new(),
            import_path: None,
        }
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn with_etag(mut self, etag: Option<String>) -> Self {
        self.etag = etag;
        self
    }

    pub fn with_import_path(mut self, import_path: impl Into<String>) -> Self {
        self.import_path = Some(import_path.into());
        self
    }

    pub fn with_metadata(mut self, metadata: IndexMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Structural checks before the record is persisted
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(self.invalid("empty source URL"));
        }
        if !self.install_path.is_absolute() {
            return Err(self.invalid("install path must be absolute"));
        }
        Ok(())
    }

    /// The install path must stay inside the active chrome directory
    pub fn validate_under(&self, chrome_dir: &Path) -> Result<()> {
        self.validate()?;
        if !self.install_path.starts_with(chrome_dir) {
            return Err(self.invalid(&format!(
                "install path {} is outside {}",
                self.install_path.display(),
                chrome_dir.display()
            )));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> ModError {
        ModError::InvalidRecord {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}
