use std::path::Path;

use crate::config::Organization;

/// What to do with files that already exist at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingFiles {
    #[default]
    ReplaceAll,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    pub organization: Organization,
    /// Overwrite an existing entry stylesheet instead of installing beside it
    pub replace_entry: bool,
    pub existing_files: ExistingFiles,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            organization: Organization::default(),
            replace_entry: true,
            existing_files: ExistingFiles::default(),
        }
    }
}

impl InstallOptions {
    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organization = organization;
        self
    }

    pub fn with_replace_entry(mut self, replace: bool) -> Self {
        self.replace_entry = replace;
        self
    }

    pub fn with_existing_files(mut self, existing_files: ExistingFiles) -> Self {
        self.existing_files = existing_files;
        self
    }
}

/// Final file name for `name` given the caller's replace decision.
///
/// Replacing keeps the name. Otherwise `_1`, `_2`, ... is appended to the stem until
/// `taken` reports a free name.
///
/// # Examples
///
/// ```
/// use ucload_pm::installer::resolve_destination_name;
///
/// let taken = |n: &str| n == "mod.css" || n == "mod_1.css";
/// assert_eq!(resolve_destination_name("mod.css", true, taken), "mod.css");
/// assert_eq!(resolve_destination_name("mod.css", false, taken), "mod_2.css");
/// assert_eq!(resolve_destination_name("tabs.css", false, taken), "tabs.css");
/// ```
pub fn resolve_destination_name(name: &str, replace: bool, taken: impl Fn(&str) -> bool) -> String {
    if replace || !taken(name) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 1usize;
    loop {
        let candidate = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// The line registered in the master stylesheet for an installed mod
pub fn import_line_for(relative_path: &str) -> String {
    format!("@import url('{}');", relative_path)
}
