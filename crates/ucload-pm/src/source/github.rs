//! GitHub driver - compares the repository's `pushed_at` against the record.

use async_trait::async_trait;
use std::sync::Arc;

use super::driver::{api_endpoint, json_string, json_timestamp, RemoteMeta, SourceDriver, UpdateCheck};
use super::resolver::{SourceDescriptor, SourceType};
use crate::error::{ModError, Result};
use crate::http::HttpClient;
use crate::registry::ModRecord;

pub struct GitHubDriver {
    client: Arc<HttpClient>,
}

impl GitHubDriver {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceDriver for GitHubDriver {
    fn source_type(&self) -> SourceType {
        SourceType::Github
    }

    async fn check(&self, source: &SourceDescriptor, record: &ModRecord) -> Result<UpdateCheck> {
        let endpoint = api_endpoint(source)?;
        let repo = self.client.fetch_json(endpoint).await?;

        let pushed_at = json_timestamp(&repo, "pushed_at").ok_or_else(|| ModError::UnknownAge {
            url: record.url.clone(),
        })?;

        let remote = RemoteMeta {
            version: json_string(&repo, "default_branch"),
            last_updated: Some(pushed_at),
            description: json_string(&repo, "description"),
            etag: None,
        };
        log::debug!("{}: pushed_at={} last_checked={}", record.url, pushed_at, record.last_checked);

        Ok(UpdateCheck::from_timestamp(remote, pushed_at, record))
    }
}
