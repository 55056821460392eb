//! Post-extraction checks and stylesheet discovery.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ModError, Result};

pub const MAX_FILES: usize = 1000;
pub const MAX_TOTAL_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_STYLESHEET_SIZE: u64 = 1024 * 1024;

/// File names (compared case-insensitively) that mark a mod's main stylesheet
pub const ENTRY_STYLESHEETS: &[&str] = &["userchrome.css", "mod.css"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_files: usize,
    pub max_total_size: u64,
    pub max_stylesheet_size: u64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_total_size: MAX_TOTAL_SIZE,
            max_stylesheet_size: MAX_STYLESHEET_SIZE,
        }
    }
}

/// A stylesheet found in an extraction workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub path: PathBuf,
    /// Relative to the validated root, `/`-separated
    pub relative_path: String,
    pub is_entry_stylesheet: bool,
    pub size: u64,
}

impl ExtractedEntry {
    /// Number of directories between the root and this file
    pub fn depth(&self) -> usize {
        self.relative_path.matches('/').count()
    }

    pub fn file_name(&self) -> &str {
        self.relative_path.rsplit('/').next().unwrap_or(&self.relative_path)
    }
}

pub fn is_entry_stylesheet(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    ENTRY_STYLESHEETS.contains(&lower.as_str())
}

/// Step into the single top-level directory many archives wrap their content in.
///
/// Applied once: a directory nested inside that one is left alone.
pub fn effective_root(dir: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(dir)?;
    let first = match entries.next() {
        Some(entry) => entry?,
        None => return Ok(dir.to_path_buf()),
    };
    if entries.next().is_some() {
        return Ok(dir.to_path_buf());
    }

    if first.file_type()?.is_dir() {
        Ok(first.path())
    } else {
        Ok(dir.to_path_buf())
    }
}

pub struct ContentValidator {
    limits: ValidationLimits,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(ValidationLimits::default())
    }
}

impl ContentValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Enforce the file-count and size caps, then return the stylesheets under `root`.
    ///
    /// Checks run in order and stop at the first violation: too many files, too large,
    /// empty, no stylesheet.
    pub fn validate(&self, root: &Path) -> Result<Vec<ExtractedEntry>> {
        let mut count = 0usize;
        let mut total: u64 = 0;

        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry.map_err(|e| ModError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            count += 1;
            if count > self.limits.max_files {
                return Err(ModError::TooManyFiles {
                    count,
                    limit: self.limits.max_files,
                });
            }
            total += entry.metadata().map_err(|e| ModError::Io(e.into()))?.len();
        }

        if total > self.limits.max_total_size {
            return Err(ModError::ArchiveTooLarge {
                size: total,
                limit: self.limits.max_total_size,
            });
        }
        if count == 0 {
            return Err(ModError::EmptyArchive);
        }

        let stylesheets = self.find_stylesheets(root)?;
        if stylesheets.is_empty() {
            return Err(ModError::NoStylesheetFound {
                path: root.to_path_buf(),
            });
        }
        Ok(stylesheets)
    }

    /// Every `.css` file under `root` within the per-stylesheet size cap, sorted by path
    pub fn find_stylesheets(&self, root: &Path) -> Result<Vec<ExtractedEntry>> {
        let mut found = Vec::new();

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| ModError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let is_css = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("css"));
            if !is_css {
                continue;
            }

            let size = entry.metadata().map_err(|e| ModError::Io(e.into()))?.len();
            if size > self.limits.max_stylesheet_size {
                log::warn!(
                    "Skipping {}: {} bytes exceeds the {} byte stylesheet limit",
                    path.display(),
                    size,
                    self.limits.max_stylesheet_size
                );
                continue;
            }

            let relative_path = relative_slash_path(root, path);
            found.push(ExtractedEntry {
                path: path.to_path_buf(),
                is_entry_stylesheet: is_entry_stylesheet(&entry.file_name().to_string_lossy()),
                relative_path,
                size,
            });
        }

        found.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(found)
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
