//! Mod installer - copies acquired or local stylesheets into the chrome directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::options::{import_line_for, resolve_destination_name, ExistingFiles, InstallOptions};
use crate::config::Organization;
use crate::downloader::{is_entry_stylesheet, AcquisitionResult, ContentValidator, ExtractedEntry};
use crate::error::{ModError, Result};
use crate::util::{check_path_length, ensure_writable, join_slash_path, sanitize_filename};

/// Name an entry stylesheet is installed under
pub const INSTALLED_ENTRY_NAME: &str = "mod.css";

/// One file to copy, relative to the destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub source: PathBuf,
    pub relative_path: String,
}

/// Everything decided about an install before any file is written
#[derive(Debug, Clone)]
pub struct InstallPlan {
    /// Folder name under the chrome directory (subfolder organization only)
    pub name: String,
    pub organization: Organization,
    pub destination: PathBuf,
    pub entry_source: PathBuf,
    /// File name the entry stylesheet gets before conflict resolution
    pub entry_name: String,
    pub copies: Vec<PlannedCopy>,
    /// Destination files that already exist, compared case-insensitively
    pub conflicts: Vec<String>,
    pub entry_conflict: bool,
}

impl InstallPlan {
    pub fn has_conflicts(&self) -> bool {
        self.entry_conflict || !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Installed folder (subfolder) or entry file (flat)
    pub install_path: PathBuf,
    pub import_line: String,
    /// Path the import line references, relative to the chrome directory
    pub import_path: String,
    pub files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub struct ModInstaller {
    chrome_dir: PathBuf,
}

impl ModInstaller {
    pub fn new(chrome_dir: impl Into<PathBuf>) -> Self {
        Self {
            chrome_dir: chrome_dir.into(),
        }
    }

    pub fn chrome_dir(&self) -> &Path {
        &self.chrome_dir
    }

    /// Decide where an acquisition result goes and which files collide
    pub fn plan(&self, result: &AcquisitionResult, organization: Organization) -> Result<InstallPlan> {
        if result.is_single_file() {
            let entry = result.entries.first().ok_or_else(|| ModError::NoStylesheetFound {
                path: result.root.clone(),
            })?;
            return Ok(self.plan_single_file(&entry.path));
        }

        let entry = choose_entry(&result.entries).ok_or_else(|| ModError::NoStylesheetFound {
            path: result.root.clone(),
        })?;
        self.plan_tree(entry, &result.source.name, organization)
    }

    /// Plan a manual import of a local `.css` file or a folder of stylesheets
    pub fn plan_local(&self, path: &Path, organization: Organization) -> Result<InstallPlan> {
        if path.is_file() {
            let is_css = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("css"));
            if !is_css {
                return Err(ModError::NoStylesheetFound {
                    path: path.to_path_buf(),
                });
            }
            return Ok(self.plan_single_file(path));
        }

        if !path.is_dir() {
            return Err(ModError::NoStylesheetFound {
                path: path.to_path_buf(),
            });
        }

        let entries = ContentValidator::default().validate(path)?;
        let entry = choose_entry(&entries).ok_or_else(|| ModError::NoStylesheetFound {
            path: path.to_path_buf(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.plan_tree(entry, &name, organization)
    }

    pub async fn install(&self, result: &AcquisitionResult, options: &InstallOptions) -> Result<InstallOutcome> {
        let plan = self.plan(result, options.organization)?;
        self.execute(&plan, options)
    }

    pub async fn install_local(&self, path: &Path, options: &InstallOptions) -> Result<InstallOutcome> {
        let plan = self.plan_local(path, options.organization)?;
        self.execute(&plan, options)
    }

    /// Copy the planned files, honouring the conflict decisions in `options`
    pub fn execute(&self, plan: &InstallPlan, options: &InstallOptions) -> Result<InstallOutcome> {
        ensure_writable(&self.chrome_dir)?;
        std::fs::create_dir_all(&plan.destination).map_err(|e| ModError::from_io(e, &plan.destination))?;
        ensure_writable(&plan.destination)?;

        let mut files = Vec::new();
        let mut skipped = Vec::new();

        for copy in &plan.copies {
            let target = join_slash_path(&plan.destination, &copy.relative_path);
            if options.existing_files == ExistingFiles::Skip && target_exists(&target) {
                log::debug!("Keeping existing {}", target.display());
                skipped.push(target);
                continue;
            }
            copy_file(&copy.source, &target)?;
            files.push(target);
        }

        let entry_name = resolve_destination_name(&plan.entry_name, options.replace_entry, |name| {
            exists_case_insensitive(&plan.destination, name)
        });
        let entry_target = plan.destination.join(&entry_name);
        copy_file(&plan.entry_source, &entry_target)?;
        files.push(entry_target.clone());

        let (install_path, import_path) = match plan.organization {
            Organization::Subfolder => (plan.destination.clone(), format!("{}/{}", plan.name, entry_name)),
            Organization::Flat => (entry_target, entry_name),
        };

        log::info!(
            "Installed {} file(s) to {} ({} kept)",
            files.len(),
            plan.destination.display(),
            skipped.len()
        );

        Ok(InstallOutcome {
            install_path,
            import_line: import_line_for(&import_path),
            import_path,
            files,
            skipped,
        })
    }

    fn plan_single_file(&self, source: &Path) -> InstallPlan {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let entry_name = if is_entry_stylesheet(&file_name) {
            INSTALLED_ENTRY_NAME.to_string()
        } else {
            sanitize_filename(&file_name)
        };

        InstallPlan {
            name: String::new(),
            organization: Organization::Flat,
            destination: self.chrome_dir.clone(),
            entry_source: source.to_path_buf(),
            entry_conflict: exists_case_insensitive(&self.chrome_dir, &entry_name),
            entry_name,
            copies: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    fn plan_tree(&self, entry: &ExtractedEntry, name: &str, organization: Organization) -> Result<InstallPlan> {
        let mod_root = entry
            .path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ModError::NoStylesheetFound {
                path: entry.path.clone(),
            })?;

        let name = sanitize_filename(name);
        let destination = match organization {
            Organization::Subfolder => self.chrome_dir.join(&name),
            Organization::Flat => self.chrome_dir.clone(),
        };
        let entry_name = if entry.is_entry_stylesheet {
            INSTALLED_ENTRY_NAME.to_string()
        } else {
            entry.file_name().to_string()
        };

        let mut copies = Vec::new();
        for item in WalkDir::new(&mod_root).min_depth(1).sort_by_file_name() {
            let item = item.map_err(|e| ModError::Io(e.into()))?;
            if !item.file_type().is_file() || item.path() == entry.path {
                continue;
            }

            let relative = item.path().strip_prefix(&mod_root).unwrap_or(item.path());
            let at_root = relative.components().count() == 1;
            if at_root && is_entry_stylesheet(&item.file_name().to_string_lossy()) {
                log::debug!("Not copying secondary entry stylesheet {}", item.path().display());
                continue;
            }

            let relative_path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            check_path_length(&join_slash_path(&destination, &relative_path))?;
            copies.push(PlannedCopy {
                source: item.path().to_path_buf(),
                relative_path,
            });
        }
        check_path_length(&destination.join(&entry_name))?;

        let conflicts = copies
            .iter()
            .filter(|c| target_exists(&join_slash_path(&destination, &c.relative_path)))
            .map(|c| c.relative_path.clone())
            .collect();

        Ok(InstallPlan {
            entry_conflict: exists_case_insensitive(&destination, &entry_name),
            name,
            organization,
            destination,
            entry_source: entry.path.clone(),
            entry_name,
            copies,
            conflicts,
        })
    }
}

/// Pick the mod's main stylesheet.
///
/// The shallowest entry stylesheet wins, `userChrome.css` over `mod.css` at equal depth.
/// Without one, the shallowest CSS file is used.
pub fn choose_entry(entries: &[ExtractedEntry]) -> Option<&ExtractedEntry> {
    let preferred = entries
        .iter()
        .filter(|e| e.is_entry_stylesheet)
        .min_by_key(|e| {
            let not_userchrome = !e.file_name().eq_ignore_ascii_case("userchrome.css");
            (e.depth(), not_userchrome, e.relative_path.clone())
        });
    if preferred.is_some() {
        return preferred;
    }

    let fallback = entries
        .iter()
        .min_by_key(|e| (e.depth(), e.relative_path.clone()));
    if let Some(entry) = fallback {
        log::warn!(
            "No userChrome.css or mod.css found, using {} as the entry stylesheet",
            entry.relative_path
        );
    }
    fallback
}

/// Relative paths of files under `source_root` that already exist under `destination`.
///
/// File names are compared case-insensitively.
pub fn find_conflicts(source_root: &Path, destination: &Path) -> Result<Vec<String>> {
    let mut conflicts = Vec::new();
    for item in WalkDir::new(source_root).min_depth(1).sort_by_file_name() {
        let item = item.map_err(|e| ModError::Io(e.into()))?;
        if !item.file_type().is_file() {
            continue;
        }
        let relative = item.path().strip_prefix(source_root).unwrap_or(item.path());
        if target_exists(&destination.join(relative)) {
            conflicts.push(
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
            );
        }
    }
    Ok(conflicts)
}

/// Remove empty folders below `chrome_dir`, deepest first; the chrome directory itself stays
pub fn prune_empty_dirs(chrome_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for item in WalkDir::new(chrome_dir).min_depth(1).contents_first(true) {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                log::warn!("Cannot inspect {}: {}", chrome_dir.display(), e);
                continue;
            }
        };
        if !item.file_type().is_dir() {
            continue;
        }
        let is_empty = std::fs::read_dir(item.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            std::fs::remove_dir(item.path()).map_err(|e| ModError::from_io(e, item.path()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn target_exists(target: &Path) -> bool {
    match (target.parent(), target.file_name()) {
        (Some(dir), Some(name)) => exists_case_insensitive(dir, &name.to_string_lossy()),
        _ => false,
    }
}

fn exists_case_insensitive(dir: &Path, name: &str) -> bool {
    let wanted = name.to_lowercase();
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_name().to_string_lossy().to_lowercase() == wanted)
        })
        .unwrap_or(false)
}

fn copy_file(source: &Path, target: &Path) -> Result<()> {
    check_path_length(target)?;
    if let (Ok(a), Ok(b)) = (source.canonicalize(), target.canonicalize()) {
        if a == b {
            return Ok(());
        }
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ModError::from_io(e, parent))?;
    }
    ensure_writable(target)?;
    std::fs::copy(source, target).map_err(|e| ModError::from_io(e, target))?;
    Ok(())
}
