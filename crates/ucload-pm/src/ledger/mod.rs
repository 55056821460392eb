//! The master stylesheet's `@import` lines and the files they reference.

mod document;
mod import_line;
mod ledger;

pub use document::{LineEnding, StylesheetDocument, TextEncoding};
pub use import_line::{is_comment_wrapped, normalize, referenced_path, set_enabled, ImportLine};
pub use ledger::{AddOutcome, ImportLedger, RemoveAllReport, RemovedImport, MASTER_STYLESHEET};
