//! HTTP client used to fetch mods and query forge APIs.
//!
//! A thin wrapper around `reqwest` with:
//! - A browser-like User-Agent and Accept headers (some hosts refuse unknown agents)
//! - A capped redirect chain and a hard request timeout
//! - Per-host tokens for GitHub and GitLab
//! - Streaming downloads written to a `.part` file and renamed on success
//!
//! Failures are never retried.
//!
//! # Examples
//!
//! ```no_run
//! use ucload_pm::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> ucload_pm::Result<()> {
//! let client = HttpClient::with_config(
//!     HttpClientConfig::new().with_timeout(Duration::from_secs(60)),
//! )?;
//!
//! let (body, headers) = client.fetch("https://example.com/userChrome.css").await?;
//! let repo = client.fetch_json("https://api.github.com/repos/acme/theme").await?;
//! client
//!     .fetch_to_file(
//!         "https://example.com/theme.zip",
//!         "/tmp/theme.zip".as_ref(),
//!         Some(|done: u64, total: u64| println!("{}/{}", done, total)),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, Client, RequestBuilder, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::{AuthConfig, AuthMatch, Config, DEFAULT_USER_AGENT};
use crate::error::{ModError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_REDIRECTS: usize = 5;
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const JSON_ACCEPT: &str = "application/vnd.github+json, application/json";

pub struct HttpClient {
    client: Client,
    user_agent: String,
    auth: Option<Arc<AuthConfig>>,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| ModError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
            auth: config.auth.map(Arc::new),
        })
    }

    /// Build a client from the merged application config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(HttpClientConfig::from(config))
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let request = match &self.auth {
            Some(auth) => apply_auth(request, url, auth),
            None => request,
        };

        let response = request.send().await.map_err(|source| ModError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModError::Http {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// GET the full body along with the response headers
    pub async fn fetch(&self, url: &str) -> Result<(Vec<u8>, HeaderMap)> {
        log::debug!("GET {}", url);
        let response = self.send(self.client.get(url), url).await?;
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|source| ModError::Network {
            url: url.to_string(),
            source,
        })?;
        Ok((body.to_vec(), headers))
    }

    /// HEAD request; only the headers are returned
    pub async fn fetch_metadata_only(&self, url: &str) -> Result<HeaderMap> {
        log::debug!("HEAD {}", url);
        let response = self.send(self.client.head(url), url).await?;
        Ok(response.headers().clone())
    }

    /// GET and parse a JSON document. Any failure is reported as an API error.
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        log::debug!("GET {} (json)", url);
        let request = self.client.get(url).header(ACCEPT, JSON_ACCEPT);
        let response = self.send(request, url).await.map_err(|e| match e {
            ModError::Http { code, url } => ModError::Api {
                reason: format!("HTTP {}", code),
                url,
            },
            other => other,
        })?;

        let text = response.text().await.map_err(|source| ModError::Network {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| ModError::Api {
            url: url.to_string(),
            reason: format!("malformed JSON: {}", e),
        })
    }

    /// Stream a download to `dest`, reporting `(downloaded, total)` after each chunk.
    ///
    /// Bytes go to `dest.part` first; `dest` only appears once the transfer completed.
    pub async fn fetch_to_file<F>(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<F>,
    ) -> Result<HeaderMap>
    where
        F: Fn(u64, u64),
    {
        log::debug!("Downloading {} to {}", url, dest.display());
        let response = self.send(self.client.get(url), url).await?;
        let headers = response.headers().clone();
        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = part_path(dest);
        let result = stream_to(response, &part, url, total_size, progress).await;
        match result {
            Ok(()) => {
                tokio::fs::rename(&part, dest).await?;
                Ok(headers)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

async fn stream_to<F>(
    response: Response,
    part: &Path,
    url: &str,
    total_size: u64,
    progress: Option<F>,
) -> Result<()>
where
    F: Fn(u64, u64),
{
    let mut file = File::create(part).await?;
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| ModError::Network {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(ref cb) = progress {
            cb(downloaded, total_size);
        }
    }

    file.flush().await?;
    Ok(())
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn apply_auth(request: RequestBuilder, url: &str, auth: &AuthConfig) -> RequestBuilder {
    match auth.find_for_url(url) {
        AuthMatch::GitHubOAuth(token) => request.bearer_auth(token),
        AuthMatch::GitLabToken(token) => request.header("PRIVATE-TOKEN", token),
        AuthMatch::None => request,
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub auth: Option<AuthConfig>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth: None,
        }
    }
}

impl From<&Config> for HttpClientConfig {
    fn from(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.http_timeout);
        let auth = (!config.auth.is_empty()).then(|| config.auth.clone());
        Self {
            timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT.min(timeout),
            max_redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
            auth,
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_config_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.max_redirects, 5);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_config_from_app_config() {
        let mut app = Config::default();
        app.http_timeout = 10;
        app.auth.github_oauth.insert("github.com".to_string(), "t".to_string());

        let config = HttpClientConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.auth.is_some());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/tmp/work/theme.zip")),
            PathBuf::from("/tmp/work/theme.zip.part")
        );
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userChrome.css"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("#nav-bar { }")
                    .insert_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let (body, headers) = client
            .fetch(&format!("{}/userChrome.css", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, b"#nav-bar { }");
        assert!(headers.contains_key("last-modified"));
    }

    #[tokio::test]
    async fn test_fetch_maps_status_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client.fetch(&format!("{}/missing.css", server.uri())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http(404));
    }

    #[tokio::test]
    async fn test_fetch_json_errors_are_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client.fetch_json(&format!("{}/bad", server.uri())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);

        let err = client.fetch_json(&format!("{}/forbidden", server.uri())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[tokio::test]
    async fn test_fetch_metadata_only_uses_head() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/theme.zip"))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc\""))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let headers = client
            .fetch_metadata_only(&format!("{}/theme.zip", server.uri()))
            .await
            .unwrap();
        assert_eq!(headers.get("etag").unwrap(), "\"abc\"");
    }

    #[tokio::test]
    async fn test_fetch_to_file_renames_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/theme.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("theme.zip");
        let client = HttpClient::new().unwrap();
        client
            .fetch_to_file(
                &format!("{}/theme.zip", server.uri()),
                &dest,
                None::<fn(u64, u64)>,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap().len(), 2048);
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_fetch_to_file_leaves_nothing_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("theme.zip");
        let client = HttpClient::new().unwrap();
        let result = client
            .fetch_to_file(&format!("{}/theme.zip", server.uri()), &dest, None::<fn(u64, u64)>)
            .await;

        assert!(matches!(result, Err(ModError::Http { code: 500, .. })));
        assert!(!dest.exists());
    }

    #[test]
    fn test_apply_auth_headers() {
        let mut auth = AuthConfig::default();
        auth.github_oauth.insert("github.com".to_string(), "ghp".to_string());
        auth.gitlab_token.insert("gitlab.com".to_string(), "glpat".to_string());
        let client = Client::new();

        let url = "https://api.github.com/repos/acme/theme";
        let request = apply_auth(client.get(url), url, &auth).build().unwrap();
        assert_eq!(request.headers().get("authorization").unwrap(), "Bearer ghp");

        let url = "https://gitlab.com/api/v4/projects/acme%2Ftheme";
        let request = apply_auth(client.get(url), url, &auth).build().unwrap();
        assert_eq!(request.headers().get("private-token").unwrap(), "glpat");

        let url = "https://example.com/theme.zip";
        let request = apply_auth(client.get(url), url, &auth).build().unwrap();
        assert!(request.headers().get("authorization").is_none());
    }
}
