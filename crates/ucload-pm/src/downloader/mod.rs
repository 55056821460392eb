//! Downloading, extracting and validating mod content.

mod archive;
mod manager;
mod validator;

pub use archive::{
    check_entry_name, ArchiveExtractor, ArchiveType, ExtractionReport, SkipReason, SkippedEntry,
    ALLOWED_EXTENSIONS,
};
pub use manager::{
    AcquisitionResult, DownloadConfig, DownloadManager, UpdateReport, MAX_CONCURRENT_CHECKS,
};
pub use validator::{
    effective_root, is_entry_stylesheet, ContentValidator, ExtractedEntry, ValidationLimits,
    ENTRY_STYLESHEETS, MAX_FILES, MAX_STYLESHEET_SIZE, MAX_TOTAL_SIZE,
};
