//! Configuration management
//!
//! Configuration is merged from several sources, highest priority first:
//!
//! 1. Command-line overrides (`Config::set`)
//! 2. Environment variables (`UCLOAD_*`)
//! 3. Global `config.json` in the ucload home
//! 4. Built-in defaults
//!
//! # Authentication
//!
//! Forge tokens are read from `auth.json` in the ucload home, the `UCLOAD_AUTH` JSON
//! string, `UCLOAD_GITHUB_TOKEN` / `UCLOAD_GITLAB_TOKEN`, and the `github-oauth` /
//! `gitlab-token` keys of `config.json`.
//!
//! # Example
//!
//! ```rust,no_run
//! use ucload_pm::config::Config;
//!
//! let config = Config::build(true).unwrap();
//! println!("Registry: {:?}", config.get_registry_file());
//! println!("Timeout: {}s", config.http_timeout);
//! ```

mod auth;
mod config;
mod source;

pub use auth::{AuthConfig, AuthMatch};
pub use config::{Config, Organization, DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_RAW_URL, DEFAULT_USER_AGENT};
pub use source::{ConfigLoader, ConfigSource, RawConfig};
