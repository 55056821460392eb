//! Installation of acquired mods and local stylesheets into the chrome directory.

mod installer;
mod options;

pub use installer::{
    choose_entry, find_conflicts, prune_empty_dirs, InstallOutcome, InstallPlan, ModInstaller,
    PlannedCopy, INSTALLED_ENTRY_NAME,
};
pub use options::{import_line_for, resolve_destination_name, ExistingFiles, InstallOptions};
