//! Direct-URL driver - HEAD the download URL and read `Last-Modified`, falling
//! back to `ETag` when the server does not send a modification time.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, ETAG, LAST_MODIFIED};
use std::sync::Arc;

use super::driver::{RemoteMeta, SourceDriver, UpdateCheck};
use super::resolver::{SourceDescriptor, SourceType};
use crate::error::{ModError, Result};
use crate::http::HttpClient;
use crate::registry::ModRecord;

pub struct DirectDriver {
    client: Arc<HttpClient>,
}

impl DirectDriver {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceDriver for DirectDriver {
    fn source_type(&self) -> SourceType {
        SourceType::Direct
    }

    async fn check(&self, source: &SourceDescriptor, record: &ModRecord) -> Result<UpdateCheck> {
        let headers = self.client.fetch_metadata_only(&source.download_url).await?;
        evaluate(&headers, record)
    }
}

/// Decide staleness from response headers
pub fn evaluate(headers: &HeaderMap, record: &ModRecord) -> Result<UpdateCheck> {
    let etag = header_str(headers, ETAG.as_str());
    let last_modified = header_str(headers, LAST_MODIFIED.as_str())
        .and_then(|value| DateTime::parse_from_rfc2822(&value).ok())
        .map(|dt| dt.timestamp());

    let remote = RemoteMeta {
        version: None,
        last_updated: last_modified,
        description: None,
        etag: etag.clone(),
    };

    if let Some(modified) = last_modified {
        return Ok(UpdateCheck::from_timestamp(remote, modified, record));
    }

    match (etag.as_deref(), record.etag.as_deref()) {
        (Some(remote_tag), Some(known)) => Ok(UpdateCheck {
            has_update: remote_tag != known,
            remote,
        }),
        _ => Err(ModError::UnknownAge { url: record.url.clone() }),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
