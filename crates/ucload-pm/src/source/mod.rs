//! Mod sources: URL classification and per-forge update checks.

mod direct;
mod driver;
mod github;
mod gitlab;
mod resolver;

pub use direct::DirectDriver;
pub use driver::{driver_for, RemoteMeta, SourceDriver, UpdateCheck};
pub use github::GitHubDriver;
pub use gitlab::GitLabDriver;
pub use resolver::{
    classify, strip_known_extension, SourceDescriptor, SourceMode, SourceResolver, SourceType,
    ARCHIVE_EXTENSIONS,
};
