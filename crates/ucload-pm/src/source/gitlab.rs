//! GitLab driver - compares the project's `last_activity_at` against the record.

use async_trait::async_trait;
use std::sync::Arc;

use super::driver::{api_endpoint, json_string, json_timestamp, RemoteMeta, SourceDriver, UpdateCheck};
use super::resolver::{SourceDescriptor, SourceType};
use crate::error::{ModError, Result};
use crate::http::HttpClient;
use crate::registry::ModRecord;

pub struct GitLabDriver {
    client: Arc<HttpClient>,
}

impl GitLabDriver {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceDriver for GitLabDriver {
    fn source_type(&self) -> SourceType {
        SourceType::Gitlab
    }

    async fn check(&self, source: &SourceDescriptor, record: &ModRecord) -> Result<UpdateCheck> {
        let project = self.client.fetch_json(api_endpoint(source)?).await?;

        let last_activity = json_timestamp(&project, "last_activity_at").ok_or_else(|| {
            ModError::UnknownAge { url: record.url.clone() }
        })?;

        let remote = RemoteMeta {
            version: json_string(&project, "default_branch"),
            last_updated: Some(last_activity),
            description: json_string(&project, "description"),
            etag: None,
        };

        Ok(UpdateCheck::from_timestamp(remote, last_activity, record))
    }
}
