//! The import ledger: `userChrome.css` as a registry of enabled and disabled imports.
//!
//! Every mutation is a read-modify-write of the whole file, serialized per master path
//! and written through a temporary file that replaces the original atomically.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use super::document::StylesheetDocument;
use super::import_line::{is_import_line, normalize, normalize_reference, set_enabled, ImportLine};
use crate::error::{ModError, Result};
use crate::installer::resolve_destination_name;
use crate::util::{ensure_writable, is_within, join_slash_path};

/// File name of the master stylesheet inside the chrome directory
pub const MASTER_STYLESHEET: &str = "userChrome.css";

const BACKUP_NAME: &str = "userChrome_backup.css";

fn master_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(path.to_path_buf()).or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added { line_number: usize },
    AlreadyPresent { line_number: usize },
    /// An existing line was rewritten in place
    Replaced { line_number: usize },
}

/// What a single removal touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedImport {
    pub import: ImportLine,
    /// File or folder deleted along with the line
    pub deleted: Option<PathBuf>,
    /// Target that could not be deleted, and why; the line is gone regardless
    pub failure: Option<(PathBuf, String)>,
}

#[derive(Debug, Default)]
pub struct RemoveAllReport {
    pub removed: Vec<ImportLine>,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl RemoveAllReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ImportLedger {
    chrome_dir: PathBuf,
    master: PathBuf,
}

impl ImportLedger {
    pub fn new(chrome_dir: impl Into<PathBuf>) -> Self {
        let chrome_dir = chrome_dir.into();
        Self {
            master: chrome_dir.join(MASTER_STYLESHEET),
            chrome_dir,
        }
    }

    pub fn chrome_dir(&self) -> &Path {
        &self.chrome_dir
    }

    pub fn master_path(&self) -> &Path {
        &self.master
    }

    fn read(&self) -> Result<StylesheetDocument> {
        StylesheetDocument::read(&self.master)
    }

    fn write(&self, document: &StylesheetDocument) -> Result<()> {
        let bytes = document.encode(&self.master)?;
        std::fs::create_dir_all(&self.chrome_dir).map_err(|e| ModError::from_io(e, &self.chrome_dir))?;
        ensure_writable(&self.master)?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.chrome_dir)
            .map_err(|e| ModError::from_io(e, &self.chrome_dir))?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.master)
            .map_err(|e| ModError::from_io(e.error, &self.master))?;

        log::debug!("Wrote {} ({} bytes)", self.master.display(), bytes.len());
        Ok(())
    }

    fn collect_imports(document: &StylesheetDocument) -> Vec<ImportLine> {
        document
            .lines()
            .iter()
            .enumerate()
            .filter(|(_, line)| is_import_line(line))
            .enumerate()
            .map(|(index, (line_number, line))| ImportLine::parse(index, line_number, line))
            .collect()
    }

    fn import_at(document: &StylesheetDocument, index: usize) -> Result<ImportLine> {
        let imports = Self::collect_imports(document);
        let count = imports.len();
        imports
            .into_iter()
            .nth(index)
            .ok_or(ModError::InvalidImportIndex { index, count })
    }

    /// Every line containing `@import`, in file order
    pub fn list_imports(&self) -> Result<Vec<ImportLine>> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Self::collect_imports(&self.read()?))
    }

    /// Register `line` after the last import unless an equivalent line already exists
    pub fn add_import(&self, line: &str) -> Result<AddOutcome> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read()?;
        let outcome = Self::insert_import(&mut document, line);
        if let AddOutcome::Added { .. } = outcome {
            self.write(&document)?;
        }
        Ok(outcome)
    }

    fn insert_import(document: &mut StylesheetDocument, line: &str) -> AddOutcome {
        let line = line.trim_end_matches(['\r', '\n']);
        let imports = Self::collect_imports(document);
        let wanted = normalize(line);
        if let Some(existing) = imports.iter().find(|i| i.normalized() == wanted) {
            return AddOutcome::AlreadyPresent {
                line_number: existing.line_number,
            };
        }

        let position = imports.last().map(|i| i.line_number + 1).unwrap_or(0);
        let lines = document.lines_mut();
        lines.insert(position, line.to_string());
        if lines.get(position + 1).is_some_and(|next| !next.trim().is_empty()) {
            lines.insert(position + 1, String::new());
        }
        log::debug!("Added import at line {}: {}", position + 1, line);
        AddOutcome::Added { line_number: position }
    }

    /// Enable or disable the import at `index`; returns whether the file changed
    pub fn toggle(&self, index: usize, enable: bool) -> Result<bool> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read()?;
        let import = Self::import_at(&document, index)?;
        let Some(rewritten) = set_enabled(&import.raw, enable) else {
            return Ok(false);
        };

        document.lines_mut()[import.line_number] = rewritten;
        self.write(&document)?;
        log::info!(
            "{} import {}: {}",
            if enable { "Enabled" } else { "Disabled" },
            index + 1,
            import.display_text()
        );
        Ok(true)
    }

    /// Delete the import at `index`, then the file or folder it references.
    ///
    /// An error means the stylesheet was left untouched. A failed deletion after the
    /// rewrite is reported in [`RemovedImport::failure`].
    pub fn remove_one(&self, index: usize) -> Result<RemovedImport> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read()?;
        let import = Self::import_at(&document, index)?;
        let target = import.path.as_deref().and_then(|p| self.reference_target(p));

        let lines = document.lines_mut();
        let at = import.line_number;
        lines.remove(at);
        let leaves_gap = lines.get(at).is_some_and(|l| l.trim().is_empty())
            && (at == 0 || lines.get(at - 1).is_some_and(|l| l.trim().is_empty()));
        if leaves_gap {
            lines.remove(at);
        }
        document.trim_trailing_blank_lines();
        self.write(&document)?;

        let mut removed = RemovedImport {
            import,
            deleted: None,
            failure: None,
        };
        if let Some(target) = target {
            match delete_target(&target) {
                Ok(true) => removed.deleted = Some(target),
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Could not delete {}: {}", target.display(), e);
                    removed.failure = Some((target, e.to_string()));
                }
            }
        }

        log::info!("Removed import: {}", removed.import.display_text());
        Ok(removed)
    }

    /// Strip every import, then delete everything they referenced.
    ///
    /// The stylesheet is rewritten before any deletion starts; deletion failures are
    /// collected rather than aborting the rest.
    pub fn remove_all(&self) -> Result<RemoveAllReport> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read()?;
        let imports = Self::collect_imports(&document);
        if imports.is_empty() {
            return Ok(RemoveAllReport::default());
        }

        let mut targets: Vec<PathBuf> = Vec::new();
        for import in &imports {
            if let Some(target) = import.path.as_deref().and_then(|p| self.reference_target(p)) {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }

        let lines = document.lines();
        let mut keep = vec![true; lines.len()];
        let mut i = 0;
        while i < lines.len() {
            if !is_import_line(&lines[i]) {
                i += 1;
                continue;
            }
            let start = i;
            while i < lines.len() && is_import_line(&lines[i]) {
                keep[i] = false;
                i += 1;
            }
            if i < lines.len() && lines[i].trim().is_empty() {
                keep[i] = false;
            } else if start > 0 && keep[start - 1] && lines[start - 1].trim().is_empty() {
                keep[start - 1] = false;
            }
        }
        let remaining: Vec<String> = lines
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(line, _)| line.clone())
            .collect();
        *document.lines_mut() = remaining;
        document.trim_trailing_blank_lines();
        self.write(&document)?;

        let mut report = RemoveAllReport {
            removed: imports,
            ..RemoveAllReport::default()
        };
        for target in targets {
            match delete_target(&target) {
                Ok(true) => report.deleted.push(target),
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Could not delete {}: {}", target.display(), e);
                    report.failures.push((target, e.to_string()));
                }
            }
        }

        log::info!(
            "Removed {} import(s), deleted {} path(s)",
            report.removed.len(),
            report.deleted.len()
        );
        Ok(report)
    }

    /// Point the import that references `old_path` at `new_line`, keeping its state.
    ///
    /// Falls back to [`add_import`](Self::add_import) when no line references `old_path`.
    pub fn replace_import(&self, old_path: &str, new_line: &str) -> Result<AddOutcome> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read()?;
        let wanted = normalize_reference(old_path);
        let existing = Self::collect_imports(&document)
            .into_iter()
            .find(|i| i.path.as_deref().map(normalize_reference).as_deref() == Some(wanted.as_str()));

        let outcome = match existing {
            Some(import) => {
                let new_line = new_line.trim();
                if import.normalized() == normalize(new_line) {
                    return Ok(AddOutcome::AlreadyPresent {
                        line_number: import.line_number,
                    });
                }
                let indent_len = import.raw.len() - import.raw.trim_start().len();
                let mut replacement = format!("{}{}", &import.raw[..indent_len], new_line);
                if !import.enabled {
                    if let Some(disabled) = set_enabled(&replacement, false) {
                        replacement = disabled;
                    }
                }
                document.lines_mut()[import.line_number] = replacement;
                AddOutcome::Replaced {
                    line_number: import.line_number,
                }
            }
            None => Self::insert_import(&mut document, new_line),
        };

        if !matches!(outcome, AddOutcome::AlreadyPresent { .. }) {
            self.write(&document)?;
        }
        Ok(outcome)
    }

    /// Copy the master stylesheet to the first free `userChrome_backup[_N].css`
    pub fn backup(&self) -> Result<PathBuf> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let name = resolve_destination_name(BACKUP_NAME, false, |candidate| {
            self.chrome_dir.join(candidate).exists()
        });
        let backup = self.chrome_dir.join(name);
        std::fs::copy(&self.master, &backup).map_err(|e| ModError::from_io(e, &self.master))?;

        log::info!("Backed up {} to {}", self.master.display(), backup.display());
        Ok(backup)
    }

    /// Whether the stylesheet holds anything besides imports and blank lines
    pub fn has_foreign_content(&self) -> Result<bool> {
        let lock = master_lock(&self.master);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let document = self.read()?;
        Ok(document
            .lines()
            .iter()
            .any(|line| !line.trim().is_empty() && !is_import_line(line)))
    }

    /// The file or folder an import reference owns, if it is safe to delete.
    ///
    /// A path with a directory component owns its containing folder; a bare name owns
    /// the file itself. Nothing outside the chrome directory (or the directory itself)
    /// is ever returned.
    pub fn reference_target(&self, reference: &str) -> Option<PathBuf> {
        let reference = normalize_reference(reference);
        if reference.is_empty() || reference.starts_with('/') || reference.contains(':') {
            log::warn!("Not deleting non-relative import target {}", reference);
            return None;
        }

        let file = join_slash_path(&self.chrome_dir, &reference);
        let target = if reference.contains('/') {
            file.parent()?.to_path_buf()
        } else {
            file
        };

        if is_within(&self.chrome_dir, &target) {
            Some(target)
        } else {
            log::warn!("Not deleting {} outside {}", target.display(), self.chrome_dir.display());
            None
        }
    }
}

/// Delete a file or folder; `Ok(false)` when it was already gone
fn delete_target(target: &Path) -> Result<bool> {
    let meta = match std::fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} already removed", target.display());
            return Ok(false);
        }
        Err(e) => return Err(ModError::from_io(e, target)),
    };

    let result = if meta.is_dir() {
        std::fs::remove_dir_all(target)
    } else {
        std::fs::remove_file(target)
    };
    result.map_err(|e| ModError::from_io(e, target))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn ledger_with(content: &str) -> (ImportLedger, TempDir) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MASTER_STYLESHEET), content).unwrap();
        (ImportLedger::new(dir.path()), dir)
    }

    fn master(ledger: &ImportLedger) -> String {
        fs::read_to_string(ledger.master_path()).unwrap()
    }

    #[test]
    fn test_add_to_missing_file() {
        let dir = TempDir::new().unwrap();
        let ledger = ImportLedger::new(dir.path());

        let outcome = ledger.add_import("@import url('theme/mod.css');\n").unwrap();
        assert_eq!(outcome, AddOutcome::Added { line_number: 0 });
        assert_eq!(master(&ledger), "@import url('theme/mod.css');\n");
    }

    #[test]
    fn test_add_inserts_after_last_import_with_one_blank_line() {
        let (ledger, _dir) = ledger_with("@import url('a.css');\n#nav-bar { color: red; }\n");

        ledger.add_import("@import url('b.css');").unwrap();
        assert_eq!(
            master(&ledger),
            "@import url('a.css');\n@import url('b.css');\n\n#nav-bar { color: red; }\n"
        );
    }

    #[test]
    fn test_add_at_top_when_no_imports() {
        let (ledger, _dir) = ledger_with("#nav-bar { color: red; }\n");
        ledger.add_import("@import url('a.css');").unwrap();
        assert_eq!(master(&ledger), "@import url('a.css');\n\n#nav-bar { color: red; }\n");
    }

    #[test]
    fn test_add_is_idempotent() {
        let (ledger, _dir) = ledger_with("/* user rules */\n");
        ledger.add_import("@import url('a.css');").unwrap();
        let first = master(&ledger);

        let outcome = ledger.add_import("  @import  url('a.css');").unwrap();
        assert!(matches!(outcome, AddOutcome::AlreadyPresent { .. }));
        assert_eq!(master(&ledger), first);
    }

    #[test]
    fn test_disabled_line_counts_as_duplicate() {
        let (ledger, _dir) = ledger_with("/* @import url('a.css'); */\n");
        let outcome = ledger.add_import("@import url('a.css');").unwrap();
        assert_eq!(outcome, AddOutcome::AlreadyPresent { line_number: 0 });
    }

    #[test]
    fn test_toggle_round_trip() {
        let original = "@import url('a.css');\r\n  @import url('b.css');\r\n\r\n#x {}\r\n";
        let (ledger, _dir) = ledger_with(original);

        assert!(ledger.toggle(1, false).unwrap());
        assert_eq!(
            master(&ledger),
            "@import url('a.css');\r\n  /* @import url('b.css'); */\r\n\r\n#x {}\r\n"
        );
        assert!(!ledger.toggle(1, false).unwrap());

        assert!(ledger.toggle(1, true).unwrap());
        assert_eq!(master(&ledger), original);
    }

    #[test]
    fn test_toggle_keeps_trailing_comment_outside() {
        let original = "@import url('a.css'); /* tabs */\n";
        let (ledger, _dir) = ledger_with(original);

        assert!(ledger.toggle(0, false).unwrap());
        assert_eq!(master(&ledger), "/* @import url('a.css'); */ /* tabs */\n");
        let imports = ledger.list_imports().unwrap();
        assert!(!imports[0].enabled);
        assert_eq!(imports[0].path.as_deref(), Some("a.css"));
        assert!(!ledger.toggle(0, false).unwrap());

        assert!(ledger.toggle(0, true).unwrap());
        assert_eq!(master(&ledger), original);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let (ledger, _dir) = ledger_with("@import url('a.css');\n");
        let err = ledger.toggle(3, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidImportIndex);
    }

    #[test]
    fn test_remove_one_deletes_folder() {
        let (ledger, dir) = ledger_with("@import url('theme/mod.css');\n@import url('mod.css');\n\n#x {}\n");
        fs::create_dir_all(dir.path().join("theme")).unwrap();
        fs::write(dir.path().join("theme").join("mod.css"), "a").unwrap();
        fs::write(dir.path().join("mod.css"), "b").unwrap();

        let removed = ledger.remove_one(0).unwrap();
        assert_eq!(removed.deleted, Some(dir.path().join("theme")));
        assert!(!dir.path().join("theme").exists());
        assert!(dir.path().join("mod.css").exists());
        assert_eq!(master(&ledger), "@import url('mod.css');\n\n#x {}\n");

        let removed = ledger.remove_one(0).unwrap();
        assert_eq!(removed.deleted, Some(dir.path().join("mod.css")));
        assert_eq!(master(&ledger), "#x {}\n");
    }

    #[test]
    fn test_remove_one_never_leaves_chrome_dir() {
        let (ledger, dir) = ledger_with("@import url('../prefs/evil.css');\n@import url('./x.css');\n");

        let removed = ledger.remove_one(0).unwrap();
        assert_eq!(removed.deleted, None);
        assert_eq!(ledger.reference_target("../prefs/evil.css"), None);
        assert_eq!(ledger.reference_target("./x.css"), Some(dir.path().join("x.css")));
        assert_eq!(ledger.reference_target("sub/../x.css"), None);
    }

    #[test]
    fn test_remove_all() {
        let (ledger, dir) = ledger_with(
            "@import url('a/mod.css');\n/* @import url('b.css'); */\n\n#x {}\n\n@import url('c/mod.css');\n",
        );
        for folder in ["a", "c"] {
            fs::create_dir_all(dir.path().join(folder)).unwrap();
            fs::write(dir.path().join(folder).join("mod.css"), "x").unwrap();
        }
        fs::write(dir.path().join("b.css"), "x").unwrap();

        let report = ledger.remove_all().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.removed.len(), 3);
        assert_eq!(report.deleted.len(), 3);
        assert!(ledger.list_imports().unwrap().is_empty());
        assert_eq!(master(&ledger), "#x {}\n");
        for path in ["a", "b.css", "c"] {
            assert!(!dir.path().join(path).exists());
        }
    }

    #[test]
    fn test_replace_import_keeps_state_and_position() {
        let (ledger, _dir) = ledger_with("@import url('a.css');\n  /* @import url('old/mod.css'); */\n");

        let outcome = ledger
            .replace_import("old/mod.css", "@import url('new/mod.css');")
            .unwrap();
        assert_eq!(outcome, AddOutcome::Replaced { line_number: 1 });
        assert_eq!(
            master(&ledger),
            "@import url('a.css');\n  /* @import url('new/mod.css'); */\n"
        );

        let outcome = ledger
            .replace_import("missing.css", "@import url('z.css');")
            .unwrap();
        assert_eq!(outcome, AddOutcome::Added { line_number: 2 });
    }

    #[test]
    fn test_backup_names() {
        let (ledger, dir) = ledger_with("#x {}\n");
        assert_eq!(ledger.backup().unwrap(), dir.path().join("userChrome_backup.css"));
        assert_eq!(ledger.backup().unwrap(), dir.path().join("userChrome_backup_1.css"));
        assert_eq!(fs::read_to_string(dir.path().join("userChrome_backup_1.css")).unwrap(), "#x {}\n");
    }

    #[test]
    fn test_has_foreign_content() {
        let (ledger, _dir) = ledger_with("@import url('a.css');\n\n");
        assert!(!ledger.has_foreign_content().unwrap());

        let (ledger, _dir) = ledger_with("@import url('a.css');\n#x {}\n");
        assert!(ledger.has_foreign_content().unwrap());
    }

    #[test]
    fn test_latin1_file_stays_latin1() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MASTER_STYLESHEET);
        fs::write(&path, b"/* caf\xe9 */\n").unwrap();

        let ledger = ImportLedger::new(dir.path());
        ledger.add_import("@import url('a.css');").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"@import url('a.css');\n\n/* caf\xe9 */\n");
    }
}
