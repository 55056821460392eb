//! Filesystem helpers shared by the installer and the import ledger.

use std::path::{Component, Path, PathBuf};

use crate::error::{ModError, Result};

/// Longest path Windows accepts without the extended-length prefix
pub const WINDOWS_MAX_PATH: usize = 260;

/// Keep only characters that are safe in a file or folder name.
///
/// Alphanumerics and `.`, `-`, `_` and space survive; everything else is dropped.
/// A name that ends up empty (or only dots) becomes `mod`.
///
/// # Examples
///
/// ```
/// use ucload_pm::util::sanitize_filename;
///
/// assert_eq!(sanitize_filename("acme-theme_v2.zip"), "acme-theme_v2.zip");
/// assert_eq!(sanitize_filename("../etc/passwd"), "..etcpasswd");
/// assert_eq!(sanitize_filename("???"), "mod");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.chars().all(|c| c == '.') {
        "mod".to_string()
    } else {
        cleaned
    }
}

/// Reject paths the platform cannot address.
pub fn check_path_length(path: &Path) -> Result<()> {
    if cfg!(windows) && path.as_os_str().len() > WINDOWS_MAX_PATH {
        return Err(ModError::PathTooLong {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Fail with `PermissionDenied` when `path` exists but is read-only
pub fn ensure_writable(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.permissions().readonly() => Err(ModError::PermissionDenied {
            path: path.to_path_buf(),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ModError::from_io(e, path)),
    }
}

/// Lexically normalize a path: drop `.` and resolve `..` against earlier components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `path` resolves to somewhere strictly below `root`
pub fn is_within(root: &Path, path: &Path) -> bool {
    let root = normalize_path(root);
    let path = normalize_path(path);
    path != root && path.starts_with(&root)
}

/// Join `/`-separated segments onto a base directory
pub fn join_slash_path(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, segment| acc.join(segment))
}
