//! Registry of mods installed from remote sources.
//!
//! Each record remembers where a mod came from and when it was fetched so that
//! update checks can compare against the source's last-modified time.

mod record;
mod store;

pub use record::ModRecord;
pub use store::ModRegistry;
