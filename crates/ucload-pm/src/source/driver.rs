//! Update-check strategy per source type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::resolver::{SourceDescriptor, SourceType};
use super::{direct::DirectDriver, github::GitHubDriver, gitlab::GitLabDriver};
use crate::error::{ModError, Result};
use crate::http::HttpClient;
use crate::registry::ModRecord;

/// What the remote side currently advertises
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMeta {
    pub version: Option<String>,
    /// Seconds since the Unix epoch
    pub last_updated: Option<i64>,
    pub description: Option<String>,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub has_update: bool,
    pub remote: RemoteMeta,
}

impl UpdateCheck {
    /// Compare a remote modification time against the record's fetch time.
    ///
    /// Only a strictly newer remote counts as an update.
    pub fn from_timestamp(remote: RemoteMeta, last_updated: i64, record: &ModRecord) -> Self {
        Self {
            has_update: last_updated > record.last_checked.timestamp(),
            remote,
        }
    }
}

#[async_trait]
pub trait SourceDriver: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Query the remote for its current metadata and decide whether `record` is stale
    async fn check(&self, source: &SourceDescriptor, record: &ModRecord) -> Result<UpdateCheck>;
}

/// Pick the driver for a source type
pub fn driver_for(source_type: SourceType, client: Arc<HttpClient>) -> Box<dyn SourceDriver> {
    match source_type {
        SourceType::Github => Box::new(GitHubDriver::new(client)),
        SourceType::Gitlab => Box::new(GitLabDriver::new(client)),
        SourceType::Direct => Box::new(DirectDriver::new(client)),
    }
}

/// Parse an RFC 3339 timestamp field of an API document into epoch seconds
pub(crate) fn json_timestamp(doc: &serde_json::Value, field: &str) -> Option<i64> {
    doc.get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc).timestamp())
}

pub(crate) fn json_string(doc: &serde_json::Value, field: &str) -> Option<String> {
    doc.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

pub(crate) fn api_endpoint(source: &SourceDescriptor) -> Result<&str> {
    source.api_endpoint.as_deref().ok_or_else(|| ModError::UnsupportedUrl {
        url: source.normalized_url.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record_checked_at(epoch: i64) -> ModRecord {
        let mut record = ModRecord::new("https://example.com/a.css", "/chrome/a.css", SourceType::Direct);
        record.last_checked = Utc.timestamp_opt(epoch, 0).unwrap();
        record
    }

    #[test]
    fn test_equal_timestamps_are_not_an_update() {
        let record = record_checked_at(1_700_000_000);
        let check = UpdateCheck::from_timestamp(RemoteMeta::default(), 1_700_000_000, &record);
        assert!(!check.has_update);

        let check = UpdateCheck::from_timestamp(RemoteMeta::default(), 1_700_000_001, &record);
        assert!(check.has_update);

        let check = UpdateCheck::from_timestamp(RemoteMeta::default(), 1_699_999_999, &record);
        assert!(!check.has_update);
    }

    #[test]
    fn test_json_timestamp() {
        let doc = json!({
            "pushed_at": "2024-01-02T03:04:05Z",
            "last_activity_at": "2024-01-02T03:04:05.123+00:00",
            "bogus": "yesterday"
        });
        assert_eq!(json_timestamp(&doc, "pushed_at"), Some(1_704_164_645));
        assert_eq!(json_timestamp(&doc, "last_activity_at"), Some(1_704_164_645));
        assert_eq!(json_timestamp(&doc, "bogus"), None);
        assert_eq!(json_timestamp(&doc, "missing"), None);
    }
}
