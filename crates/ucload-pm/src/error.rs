use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModError {
    // Source resolution
    #[error("Unsupported URL: {url}")]
    UnsupportedUrl { url: String },

    // Transport errors
    #[error("Network error while fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {code} for {url}")]
    Http { code: u16, url: String },

    #[error("API error for {url}: {reason}")]
    Api { url: String, reason: String },

    // Archive and content errors
    #[error("Unsupported or corrupt archive {}: {reason}", path.display())]
    UnsupportedArchive { path: PathBuf, reason: String },

    #[error("Archive contains too many files ({count}, limit {limit})")]
    TooManyFiles { count: usize, limit: usize },

    #[error("Archive content too large ({size} bytes, limit {limit})")]
    ArchiveTooLarge { size: u64, limit: u64 },

    #[error("Archive is empty")]
    EmptyArchive,

    #[error("No stylesheet found in {}", path.display())]
    NoStylesheetFound { path: PathBuf },

    // Master stylesheet errors
    #[error("Cannot decode or encode {}: {reason}", path.display())]
    Encoding { path: PathBuf, reason: String },

    #[error("Import index {index} out of range ({count} imports)")]
    InvalidImportIndex { index: usize, count: usize },

    #[error("Invalid mod record for {url}: {reason}")]
    InvalidRecord { url: String, reason: String },

    // Update checks
    #[error("Cannot determine the age of {url}")]
    UnknownAge { url: String },

    // Filesystem errors
    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Path too long: {}", path.display())]
    PathTooLong { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`ModError`], used by callers that branch on the failure
/// category rather than its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedUrl,
    Network,
    Http(u16),
    Api,
    UnsupportedArchive,
    TooManyFiles,
    ArchiveTooLarge,
    EmptyArchive,
    NoStylesheetFound,
    Encoding,
    UnknownAge,
    PermissionDenied,
    PathTooLong,
    InvalidImportIndex,
    InvalidRecord,
    Io,
    Json,
    Config,
}

impl ModError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModError::UnsupportedUrl { .. } => ErrorKind::UnsupportedUrl,
            ModError::Network { .. } => ErrorKind::Network,
            ModError::Http { code, .. } => ErrorKind::Http(*code),
            ModError::Api { .. } => ErrorKind::Api,
            ModError::UnsupportedArchive { .. } => ErrorKind::UnsupportedArchive,
            ModError::TooManyFiles { .. } => ErrorKind::TooManyFiles,
            ModError::ArchiveTooLarge { .. } => ErrorKind::ArchiveTooLarge,
            ModError::EmptyArchive => ErrorKind::EmptyArchive,
            ModError::NoStylesheetFound { .. } => ErrorKind::NoStylesheetFound,
            ModError::Encoding { .. } => ErrorKind::Encoding,
            ModError::InvalidImportIndex { .. } => ErrorKind::InvalidImportIndex,
            ModError::InvalidRecord { .. } => ErrorKind::InvalidRecord,
            ModError::UnknownAge { .. } => ErrorKind::UnknownAge,
            ModError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            ModError::PathTooLong { .. } => ErrorKind::PathTooLong,
            ModError::Io(_) => ErrorKind::Io,
            ModError::Json(_) => ErrorKind::Json,
            ModError::Config(_) => ErrorKind::Config,
        }
    }

    /// Map an IO error on `path`, keeping permission failures distinguishable.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            ModError::PermissionDenied { path: path.into() }
        } else {
            ModError::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ModError>;
