use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::source::ConfigLoader;
use crate::error::{ModError, Result};

/// Per-host API tokens for the forges mods are fetched from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// GitHub OAuth / personal access tokens by domain
    #[serde(rename = "github-oauth", default, skip_serializing_if = "HashMap::is_empty")]
    pub github_oauth: HashMap<String, String>,

    /// GitLab private tokens by domain
    #[serde(rename = "gitlab-token", default, skip_serializing_if = "HashMap::is_empty")]
    pub gitlab_token: HashMap<String, String>,
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ModError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ModError::Config(format!("Failed to parse auth config: {}", e)))
    }

    /// Build auth config from all sources
    ///
    /// Priority (highest to lowest):
    /// 1. `UCLOAD_GITHUB_TOKEN` / `UCLOAD_GITLAB_TOKEN`
    /// 2. `UCLOAD_AUTH` (JSON string)
    /// 3. `auth.json` in the ucload home
    pub fn build(loader: &ConfigLoader) -> Result<Self> {
        let mut config = Self::from_file(loader.get_home().join("auth.json"))?;

        if let Some(json) = loader.get_env("UCLOAD_AUTH") {
            config.merge(Self::from_json(&json)?);
        }
        if let Some(token) = loader.get_env_config("github-token") {
            config.github_oauth.insert("github.com".to_string(), token);
        }
        if let Some(token) = loader.get_env_config("gitlab-token") {
            config.gitlab_token.insert("gitlab.com".to_string(), token);
        }

        Ok(config)
    }

    /// Merge another auth config into this one (other takes precedence)
    pub fn merge(&mut self, other: AuthConfig) {
        self.github_oauth.extend(other.github_oauth);
        self.gitlab_token.extend(other.gitlab_token);
    }

    pub fn is_empty(&self) -> bool {
        self.github_oauth.is_empty() && self.gitlab_token.is_empty()
    }

    pub fn get_github_oauth(&self, domain: &str) -> Option<&str> {
        self.github_oauth.get(domain).map(String::as_str)
    }

    pub fn get_gitlab_token(&self, domain: &str) -> Option<&str> {
        self.gitlab_token.get(domain).map(String::as_str)
    }

    /// Find credentials for a URL by its host
    pub fn find_for_url(&self, url: &str) -> AuthMatch<'_> {
        let Some(domain) = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return AuthMatch::None;
        };

        if is_github_domain(&domain) {
            if let Some(token) = self
                .get_github_oauth(&domain)
                .or_else(|| self.get_github_oauth("github.com"))
            {
                return AuthMatch::GitHubOAuth(token);
            }
        }

        if domain == "gitlab.com" || domain.ends_with(".gitlab.com") || domain.contains("gitlab") {
            if let Some(token) = self
                .get_gitlab_token(&domain)
                .or_else(|| self.get_gitlab_token("gitlab.com"))
            {
                return AuthMatch::GitLabToken(token);
            }
        }

        AuthMatch::None
    }
}

/// Result of looking up authentication for a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMatch<'a> {
    None,
    /// Sent as a bearer token
    GitHubOAuth(&'a str),
    /// Sent as `PRIVATE-TOKEN`
    GitLabToken(&'a str),
}

impl AuthMatch<'_> {
    pub fn is_some(&self) -> bool {
        !matches!(self, AuthMatch::None)
    }
}

fn is_github_domain(domain: &str) -> bool {
    matches!(
        domain,
        "github.com" | "api.github.com" | "raw.githubusercontent.com" | "codeload.github.com"
    ) || domain.ends_with(".github.com")
}
