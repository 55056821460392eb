pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod ledger;
pub mod registry;
pub mod source;
pub mod util;

pub use error::{ErrorKind, ModError, Result};
pub use config::{Config, Organization};
pub use downloader::{AcquisitionResult, DownloadManager, UpdateReport};
pub use installer::{ExistingFiles, InstallOptions, InstallOutcome, ModInstaller};
pub use ledger::{AddOutcome, ImportLedger, ImportLine};
pub use registry::{ModRecord, ModRegistry};
pub use source::{classify, SourceDescriptor, SourceType, UpdateCheck};
