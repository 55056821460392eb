use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use super::auth::AuthConfig;
use super::source::{ConfigLoader, ConfigSource, RawConfig};
use crate::error::{ModError, Result};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";

/// Where an installed mod's files land inside the chrome directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Organization {
    /// Directly into the chrome directory
    Flat,
    /// Into `<chrome>/<mod name>/`
    #[default]
    Subfolder,
}

impl FromStr for Organization {
    type Err = ModError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(Organization::Flat),
            "subfolder" | "folder" => Ok(Organization::Subfolder),
            _ => Err(ModError::Config(format!(
                "Invalid organization \"{}\", expected \"flat\" or \"subfolder\"",
                s
            ))),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Browser profile chrome directory holding userChrome.css
    #[serde(rename = "chrome-dir", skip_serializing_if = "Option::is_none")]
    pub chrome_dir: Option<PathBuf>,

    #[serde(rename = "registry-file", skip_serializing_if = "Option::is_none")]
    pub registry_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[serde(rename = "http-timeout", default = "default_http_timeout")]
    pub http_timeout: u64,

    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "max-concurrent-checks", default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    #[serde(default)]
    pub organization: Organization,

    #[serde(rename = "github-api-url", default = "default_github_api_url")]
    pub github_api_url: String,

    #[serde(rename = "github-raw-url", default = "default_github_raw_url")]
    pub github_raw_url: String,

    #[serde(skip)]
    pub auth: AuthConfig,

    #[serde(skip)]
    home_dir: Option<PathBuf>,

    #[serde(skip)]
    data_dir: Option<PathBuf>,

    #[serde(skip)]
    sources: HashMap<String, ConfigSource>,
}

fn default_http_timeout() -> u64 {
    300
}

fn default_max_redirects() -> usize {
    5
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_concurrent_checks() -> usize {
    4
}

fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_github_raw_url() -> String {
    DEFAULT_GITHUB_RAW_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chrome_dir: None,
            registry_file: None,
            http_timeout: default_http_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            max_concurrent_checks: default_max_concurrent_checks(),
            organization: Organization::default(),
            github_api_url: default_github_api_url(),
            github_raw_url: default_github_raw_url(),
            auth: AuthConfig::default(),
            home_dir: None,
            data_dir: None,
            sources: HashMap::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build configuration from defaults, the global config.json and the environment
    pub fn build(use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);
        let mut config = Self::default();

        for key in Self::config_keys() {
            config.sources.insert(key.to_string(), ConfigSource::Default);
        }

        config.auth = AuthConfig::build(&loader)?;

        let global = loader.load_global_config()?;
        config.merge_raw_config(global, ConfigSource::Global)?;

        if use_environment {
            config.apply_env_overrides(&loader);
        }

        config.home_dir = Some(loader.get_home());
        config.data_dir = Some(loader.get_data_dir());

        Ok(config)
    }

    /// Set a value from the command line, overriding every other source
    pub fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        self.merge_config_value(key, value, ConfigSource::Command)
    }

    pub fn get_source(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    pub fn home_dir(&self) -> Option<&PathBuf> {
        self.home_dir.as_ref()
    }

    /// The configured chrome directory, required by every ledger operation
    pub fn get_chrome_dir(&self) -> Result<PathBuf> {
        self.chrome_dir.clone().ok_or_else(|| {
            ModError::Config(
                "No chrome directory configured (use --chrome-dir, UCLOAD_CHROME_DIR or chrome-dir in config.json)"
                    .to_string(),
            )
        })
    }

    pub fn get_registry_file(&self) -> PathBuf {
        if let Some(ref path) = self.registry_file {
            return path.clone();
        }
        match self.data_dir {
            Some(ref dir) => dir.join("mods.json"),
            None => PathBuf::from("mods.json"),
        }
    }

    fn merge_raw_config(&mut self, raw: RawConfig, source: ConfigSource) -> Result<()> {
        for (key, value) in raw.values {
            self.merge_config_value(&key, value, source.clone())?;
        }
        Ok(())
    }

    fn merge_config_value(
        &mut self,
        key: &str,
        value: serde_json::Value,
        source: ConfigSource,
    ) -> Result<()> {
        let applied = match key {
            "chrome-dir" => value.as_str().map(|s| self.chrome_dir = Some(PathBuf::from(s))),
            "registry-file" => value.as_str().map(|s| self.registry_file = Some(PathBuf::from(s))),
            "http-timeout" => value.as_u64().map(|n| self.http_timeout = n),
            "max-redirects" => value.as_u64().map(|n| self.max_redirects = n as usize),
            "user-agent" => value.as_str().map(|s| self.user_agent = s.to_string()),
            "max-concurrent-checks" => value
                .as_u64()
                .map(|n| self.max_concurrent_checks = (n as usize).max(1)),
            "organization" => {
                let org = value.as_str().ok_or_else(|| {
                    ModError::Config(format!(
                        "Invalid organization {}, expected \"flat\" or \"subfolder\"",
                        value
                    ))
                })?;
                self.organization = org.parse()?;
                Some(())
            }
            "github-api-url" => value
                .as_str()
                .map(|s| self.github_api_url = s.trim_end_matches('/').to_string()),
            "github-raw-url" => value
                .as_str()
                .map(|s| self.github_raw_url = s.trim_end_matches('/').to_string()),
            "github-oauth" | "gitlab-token" => {
                let tokens: HashMap<String, String> = serde_json::from_value(value)
                    .map_err(|e| ModError::Config(format!("Invalid {}: {}", key, e)))?;
                if key == "github-oauth" {
                    self.auth.github_oauth.extend(tokens);
                } else {
                    self.auth.gitlab_token.extend(tokens);
                }
                Some(())
            }
            _ => {
                log::debug!("Ignoring unknown config key '{}'", key);
                None
            }
        };

        if applied.is_some() {
            self.sources.insert(key.to_string(), source);
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self, loader: &ConfigLoader) {
        for key in ["chrome-dir", "registry-file"] {
            if let Some(path) = loader.get_env_path(key) {
                if key == "chrome-dir" {
                    self.chrome_dir = Some(path);
                } else {
                    self.registry_file = Some(path);
                }
                self.sources.insert(
                    key.to_string(),
                    ConfigSource::Environment(ConfigLoader::env_var_name(key)),
                );
            }
        }

        if let Some(timeout) = loader.get_env_u64("http-timeout") {
            self.http_timeout = timeout;
            self.sources.insert(
                "http-timeout".to_string(),
                ConfigSource::Environment("UCLOAD_HTTP_TIMEOUT".to_string()),
            );
        }

        if let Some(n) = loader.get_env_u64("max-concurrent-checks") {
            self.max_concurrent_checks = (n as usize).max(1);
            self.sources.insert(
                "max-concurrent-checks".to_string(),
                ConfigSource::Environment("UCLOAD_MAX_CONCURRENT_CHECKS".to_string()),
            );
        }

        if let Some(org) = loader
            .get_env_config("organization")
            .and_then(|s| s.parse::<Organization>().ok())
        {
            self.organization = org;
            self.sources.insert(
                "organization".to_string(),
                ConfigSource::Environment("UCLOAD_ORGANIZATION".to_string()),
            );
        }
    }

    fn config_keys() -> [&'static str; 9] {
        [
            "chrome-dir",
            "registry-file",
            "http-timeout",
            "max-redirects",
            "user-agent",
            "max-concurrent-checks",
            "organization",
            "github-api-url",
            "github-raw-url",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http_timeout, 300);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.max_concurrent_checks, 4);
        assert_eq!(config.organization, Organization::Subfolder);
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert!(config.chrome_dir.is_none());
    }

    #[test]
    fn test_organization_parses() {
        assert_eq!("flat".parse::<Organization>().unwrap(), Organization::Flat);
        assert_eq!(" Subfolder".parse::<Organization>().unwrap(), Organization::Subfolder);
        assert!(matches!("nested".parse::<Organization>(), Err(ModError::Config(_))));
    }

    #[test]
    fn test_missing_chrome_dir_is_config_error() {
        let config = Config::default();
        assert!(matches!(config.get_chrome_dir(), Err(ModError::Config(_))));
    }

    #[test]
    fn test_set_records_command_source() {
        let mut config = Config::default();
        config.set("chrome-dir", json!("/profile/chrome")).unwrap();

        assert_eq!(config.get_chrome_dir().unwrap(), PathBuf::from("/profile/chrome"));
        assert_eq!(config.get_source("chrome-dir"), Some(&ConfigSource::Command));
    }

    #[test]
    fn test_invalid_organization_rejected() {
        let mut config = Config::default();
        assert!(config.set("organization", json!("sideways")).is_err());
        assert!(config.set("organization", json!(3)).is_err());
        assert_eq!(config.organization, Organization::Subfolder);

        config.set("organization", json!("Flat")).unwrap();
        assert_eq!(config.organization, Organization::Flat);
    }

    #[test]
    fn test_tokens_merge_into_auth() {
        let mut config = Config::default();
        config
            .set("github-oauth", json!({"github.com": "ghp_token"}))
            .unwrap();
        assert_eq!(config.auth.get_github_oauth("github.com"), Some("ghp_token"));
    }

    #[test]
    fn test_max_concurrent_checks_at_least_one() {
        let mut config = Config::default();
        config.set("max-concurrent-checks", json!(0)).unwrap();
        assert_eq!(config.max_concurrent_checks, 1);
    }

    #[test]
    fn test_registry_file_override() {
        let mut config = Config::default();
        config.set("registry-file", json!("/data/mods.json")).unwrap();
        assert_eq!(config.get_registry_file(), PathBuf::from("/data/mods.json"));
    }
}
