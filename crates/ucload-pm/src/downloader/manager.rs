//! Acquisition orchestrator: resolve, download, extract, validate.

use futures_util::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_TYPE, ETAG};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::archive::{ArchiveExtractor, ArchiveType, SkippedEntry};
use super::validator::{effective_root, ContentValidator, ExtractedEntry, ValidationLimits};
use crate::config::Config;
use crate::error::{ModError, Result};
use crate::http::HttpClient;
use crate::registry::ModRecord;
use crate::source::{driver_for, SourceDescriptor, SourceMode, SourceResolver, UpdateCheck};
use crate::util::sanitize_filename;

/// Upper bound on simultaneous update checks regardless of configuration
pub const MAX_CONCURRENT_CHECKS: usize = 8;

/// A fetched, extracted and validated mod waiting to be installed.
///
/// Owns its temporary workspace; dropping the result deletes it.
#[derive(Debug)]
pub struct AcquisitionResult {
    pub source: SourceDescriptor,
    pub entries: Vec<ExtractedEntry>,
    /// Directory the entries were discovered under
    pub root: PathBuf,
    pub etag: Option<String>,
    pub skipped: Vec<SkippedEntry>,
    workspace: TempDir,
}

impl AcquisitionResult {
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    pub fn is_single_file(&self) -> bool {
        self.source.mode == SourceMode::SingleFile
    }
}

/// Outcome of one record's update check in a batch
#[derive(Debug)]
pub struct UpdateReport {
    pub record: ModRecord,
    pub result: Result<UpdateCheck>,
}

impl UpdateReport {
    pub fn has_update(&self) -> bool {
        matches!(self.result, Ok(ref check) if check.has_update)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub max_concurrent_checks: usize,
    pub limits: ValidationLimits,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_checks: 4,
            limits: ValidationLimits::default(),
        }
    }
}

pub struct DownloadManager {
    client: Arc<HttpClient>,
    resolver: SourceResolver,
    validator: ContentValidator,
    config: DownloadConfig,
}

impl DownloadManager {
    pub fn new(client: Arc<HttpClient>, resolver: SourceResolver, config: DownloadConfig) -> Self {
        Self {
            client,
            resolver,
            validator: ContentValidator::new(config.limits),
            config,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(HttpClient::from_config(config)?);
        let download_config = DownloadConfig {
            max_concurrent_checks: config.max_concurrent_checks,
            ..DownloadConfig::default()
        };
        Ok(Self::new(client, SourceResolver::from_config(config), download_config))
    }

    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    pub async fn acquire(&self, url: &str) -> Result<AcquisitionResult> {
        self.acquire_with_progress(url, None::<fn(u64, u64)>).await
    }

    /// Fetch `url` into a fresh workspace and validate its content
    pub async fn acquire_with_progress<F>(&self, url: &str, progress: Option<F>) -> Result<AcquisitionResult>
    where
        F: Fn(u64, u64) + Send + Sync,
    {
        let source = self.resolver.classify(url)?;
        log::debug!(
            "Resolved {} as {} ({:?}) -> {}",
            url,
            source.source_type,
            source.mode,
            source.download_url
        );

        let workspace = tempfile::Builder::new().prefix("ucload-").tempdir()?;
        let download_dir = workspace.path().join("download");
        let download_path = download_dir.join(sanitize_filename(&source.download_file_name()));

        let headers = self
            .client
            .fetch_to_file(&source.download_url, &download_path, progress)
            .await?;
        let etag = header_string(&headers, ETAG.as_str());

        let (root, skipped) = match source.mode {
            SourceMode::SingleFile => (download_dir, Vec::new()),
            SourceMode::Archive | SourceMode::Repository { .. } => {
                let archive_type = ArchiveType::from_path(&download_path)
                    .or_else(|| {
                        header_string(&headers, CONTENT_TYPE.as_str())
                            .and_then(|ct| ArchiveType::from_content_type(&ct))
                    })
                    .ok_or_else(|| ModError::UnsupportedArchive {
                        path: download_path.clone(),
                        reason: "unknown archive type".to_string(),
                    })?;

                let content_dir = workspace.path().join("content");
                let archive = download_path.clone();
                let dest = content_dir.clone();
                let limits = *self.validator.limits();
                let report = tokio::task::spawn_blocking(move || {
                    ArchiveExtractor::extract_with_limits(&archive, &dest, archive_type, limits)
                })
                .await
                .map_err(join_error)??;

                let mut root = effective_root(&content_dir)?;
                if let SourceMode::Repository { sub_path: Some(ref sub) } = source.mode {
                    root = scoped_root(&root, sub)?;
                }
                (root, report.skipped)
            }
        };

        let validator = ContentValidator::new(*self.validator.limits());
        let validate_root = root.clone();
        let entries = tokio::task::spawn_blocking(move || validator.validate(&validate_root))
            .await
            .map_err(join_error)??;

        log::info!(
            "Acquired {} ({} stylesheet(s), {} skipped entr{})",
            source.normalized_url,
            entries.len(),
            skipped.len(),
            if skipped.len() == 1 { "y" } else { "ies" }
        );

        Ok(AcquisitionResult {
            source,
            entries,
            root,
            etag,
            skipped,
            workspace,
        })
    }

    /// Ask the record's source whether something newer than the installed copy exists
    pub async fn check_for_update(&self, record: &ModRecord) -> Result<UpdateCheck> {
        let source = self.resolver.classify(&record.url)?;
        let driver = driver_for(source.source_type, Arc::clone(&self.client));
        driver.check(&source, record).await
    }

    /// Check many records with bounded concurrency, preserving input order.
    ///
    /// A source whose age cannot be determined reports "no update".
    pub async fn check_updates(&self, records: Vec<ModRecord>) -> Vec<UpdateReport> {
        let limit = self.config.max_concurrent_checks.clamp(1, MAX_CONCURRENT_CHECKS);

        stream::iter(records)
            .map(|record| async move {
                let result = match self.check_for_update(&record).await {
                    Err(ModError::UnknownAge { url }) => {
                        log::warn!("Cannot determine the age of {}; assuming it is current", url);
                        Ok(UpdateCheck {
                            has_update: false,
                            remote: Default::default(),
                        })
                    }
                    other => other,
                };
                UpdateReport { record, result }
            })
            .buffered(limit)
            .collect()
            .await
    }
}

fn scoped_root(root: &Path, sub_path: &str) -> Result<PathBuf> {
    let sub = Path::new(sub_path);
    let safe = sub
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    let scoped = root.join(sub);
    if !safe || !scoped.is_dir() {
        return Err(ModError::NoStylesheetFound { path: scoped });
    }
    Ok(scoped)
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn join_error(e: tokio::task::JoinError) -> ModError {
    ModError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}
