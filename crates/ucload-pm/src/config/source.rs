use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ModError, Result};

const ENV_PREFIX: &str = "UCLOAD_";

/// Represents the source of a configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default built-in value
    Default,
    /// From the global config.json in the ucload home
    Global,
    /// From environment variable
    Environment(String),
    /// Set from the command line
    Command,
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Global => "global",
            ConfigSource::Environment(var) => var,
            ConfigSource::Command => "command",
        }
    }
}

/// Raw configuration as stored on disk: a flat object of kebab-case keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawConfig {
    pub values: HashMap<String, serde_json::Value>,
}

/// Loads configuration from the home directory and the environment
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Read a raw environment variable, ignoring empty values
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Directory holding config.json, auth.json and the default registry
    pub fn get_home(&self) -> PathBuf {
        if let Some(home) = self.get_env("UCLOAD_HOME") {
            return PathBuf::from(home);
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "ucload") {
            proj_dirs.config_dir().to_path_buf()
        } else if let Some(base) = directories::BaseDirs::new() {
            base.home_dir().join(".ucload")
        } else {
            PathBuf::from(".ucload")
        }
    }

    /// Directory holding the mod registry when `registry-file` is unset
    pub fn get_data_dir(&self) -> PathBuf {
        if let Some(home) = self.get_env("UCLOAD_HOME") {
            return PathBuf::from(home);
        }

        match directories::ProjectDirs::from("", "", "ucload") {
            Some(proj_dirs) => proj_dirs.data_dir().to_path_buf(),
            None => self.get_home(),
        }
    }

    /// Load configuration from a JSON file; a missing file yields an empty config
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<RawConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(RawConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ModError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| ModError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn load_global_config(&self) -> Result<RawConfig> {
        self.load_config_file(self.get_home().join("config.json"))
    }

    /// Converts "foo-bar" to "UCLOAD_FOO_BAR"
    pub fn env_var_name(key: &str) -> String {
        format!("{}{}", ENV_PREFIX, key.replace('-', "_").to_uppercase())
    }

    pub fn get_env_config(&self, key: &str) -> Option<String> {
        self.get_env(&Self::env_var_name(key))
    }

    pub fn get_env_u64(&self, key: &str) -> Option<u64> {
        self.get_env_config(key).and_then(|val| val.parse().ok())
    }

    pub fn get_env_path(&self, key: &str) -> Option<PathBuf> {
        self.get_env_config(key).map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_source_as_str() {
        assert_eq!(ConfigSource::Default.as_str(), "default");
        assert_eq!(ConfigSource::Global.as_str(), "global");
        assert_eq!(ConfigSource::Command.as_str(), "command");
        assert_eq!(
            ConfigSource::Environment("UCLOAD_CHROME_DIR".to_string()).as_str(),
            "UCLOAD_CHROME_DIR"
        );
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(ConfigLoader::env_var_name("chrome-dir"), "UCLOAD_CHROME_DIR");
        assert_eq!(ConfigLoader::env_var_name("http-timeout"), "UCLOAD_HTTP_TIMEOUT");
    }

    #[test]
    fn test_loader_without_environment_ignores_env() {
        let loader = ConfigLoader::new(false);
        assert!(loader.get_env("PATH").is_none());
    }

    #[test]
    fn test_load_missing_config_file() {
        let loader = ConfigLoader::new(false);
        let raw = loader.load_config_file("/nonexistent/config.json").unwrap();
        assert!(raw.values.is_empty());
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"chrome-dir": "/tmp/chrome", "http-timeout": 30}"#).unwrap();

        let raw = ConfigLoader::new(false).load_config_file(&path).unwrap();
        assert_eq!(raw.values.get("http-timeout").and_then(|v| v.as_u64()), Some(30));
    }

    #[test]
    fn test_load_invalid_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let result = ConfigLoader::new(false).load_config_file(&path);
        assert!(matches!(result, Err(ModError::Config(_))));
    }
}
