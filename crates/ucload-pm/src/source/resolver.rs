//! URL classification.
//!
//! Turns whatever the user pasted into a [`SourceDescriptor`]: which forge (if any) it
//! belongs to, whether it points at a single stylesheet, an archive or a whole repository,
//! and the concrete URLs to download from and to query for update metadata.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{Config, DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_RAW_URL};
use crate::error::{ModError, Result};

/// File extensions accepted as downloadable archives
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".rar", ".7z", ".tar", ".gz", ".tgz", ".bz2", ".xz"];

const COMPOUND_EXTENSIONS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Direct,
    Github,
    Gitlab,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Direct => "direct",
            SourceType::Github => "github",
            SourceType::Gitlab => "gitlab",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the download URL yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// A repository snapshot; `sub_path` narrows it to one folder after extraction
    Repository { sub_path: Option<String> },
    /// A single stylesheet, installed without extraction
    SingleFile,
    /// An archive file
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub source_type: SourceType,
    pub mode: SourceMode,
    pub normalized_url: String,
    pub api_endpoint: Option<String>,
    pub download_url: String,
    /// Folder-name hint for subfolder installs
    pub name: String,
    pub metadata: IndexMap<String, String>,
}

impl SourceDescriptor {
    /// File name the download is stored under inside the workspace
    pub fn download_file_name(&self) -> String {
        match self.mode {
            SourceMode::Repository { .. } => format!("{}.zip", self.name),
            SourceMode::SingleFile | SourceMode::Archive => last_segment(&self.download_url)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| self.name.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceResolver {
    github_api: String,
    github_raw: String,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self {
            github_api: DEFAULT_GITHUB_API_URL.to_string(),
            github_raw: DEFAULT_GITHUB_RAW_URL.to_string(),
        }
    }
}

impl SourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            github_api: config.github_api_url.trim_end_matches('/').to_string(),
            github_raw: config.github_raw_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn classify(&self, url: &str) -> Result<SourceDescriptor> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(unsupported(url));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let parsed = Url::parse(&with_scheme).map_err(|_| unsupported(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(unsupported(url));
        }
        let host = parsed.host_str().ok_or_else(|| unsupported(url))?.to_lowercase();

        if host.contains("github.com") {
            self.classify_github(&parsed)
        } else if host.contains("gitlab.com") {
            classify_gitlab(&parsed)
        } else {
            classify_direct(&parsed)
        }
    }

    fn classify_github(&self, parsed: &Url) -> Result<SourceDescriptor> {
        let url = parsed.as_str();
        let segments = path_segments(parsed);
        if segments.len() < 2 {
            return Err(unsupported(url));
        }

        let owner = segments[0].clone();
        let repo = segments[1].trim_end_matches(".git").to_string();
        let api = format!("{}/repos/{}/{}", self.github_api, owner, repo);

        let mut metadata = IndexMap::new();
        metadata.insert("owner".to_string(), owner.clone());
        metadata.insert("repo".to_string(), repo.clone());

        let (mode, download_url, name) = match segments.get(2).map(String::as_str) {
            Some("blob") | Some("raw") => {
                if segments.len() < 5 {
                    return Err(unsupported(url));
                }
                let branch = &segments[3];
                let file_path = segments[4..].join("/");
                metadata.insert("branch".to_string(), branch.clone());
                metadata.insert("path".to_string(), file_path.clone());
                let raw = format!("{}/{}/{}/{}/{}", self.github_raw, owner, repo, branch, file_path);
                let name = strip_known_extension(&segments[segments.len() - 1]);
                (SourceMode::SingleFile, raw, name)
            }
            Some("tree") if segments.len() >= 4 => {
                let branch = &segments[3];
                let sub_path = (segments.len() > 4).then(|| segments[4..].join("/"));
                metadata.insert("branch".to_string(), branch.clone());
                let name = match sub_path {
                    Some(_) => segments[segments.len() - 1].clone(),
                    None => repo.clone(),
                };
                if let Some(ref p) = sub_path {
                    metadata.insert("path".to_string(), p.clone());
                }
                (
                    SourceMode::Repository { sub_path },
                    format!("{}/zipball/{}", api, branch),
                    name,
                )
            }
            Some("releases") if mode_for_file(&segments[segments.len() - 1]).is_some() => {
                let file = &segments[segments.len() - 1];
                let mode = mode_for_file(file).ok_or_else(|| unsupported(url))?;
                (mode, url.to_string(), strip_known_extension(file))
            }
            _ => (
                SourceMode::Repository { sub_path: None },
                format!("{}/zipball", api),
                repo.clone(),
            ),
        };

        Ok(SourceDescriptor {
            source_type: SourceType::Github,
            mode,
            normalized_url: url.to_string(),
            api_endpoint: Some(api),
            download_url,
            name,
            metadata,
        })
    }
}

/// Classify with the public GitHub endpoints
pub fn classify(url: &str) -> Result<SourceDescriptor> {
    SourceResolver::default().classify(url)
}

fn classify_gitlab(parsed: &Url) -> Result<SourceDescriptor> {
    let url = parsed.as_str();
    let segments = path_segments(parsed);
    let dash = segments.iter().position(|s| s == "-");

    let project_segments = match dash {
        Some(pos) => &segments[..pos],
        None => &segments[..segments.len().min(2)],
    };
    if project_segments.len() < 2 {
        return Err(unsupported(url));
    }

    let project = project_segments
        .iter()
        .map(|s| s.trim_end_matches(".git"))
        .collect::<Vec<_>>()
        .join("/");
    let origin = parsed.origin().ascii_serialization();
    let api = format!("{}/api/v4/projects/{}", origin, urlencoding::encode(&project));
    let project_name = project_segments[project_segments.len() - 1]
        .trim_end_matches(".git")
        .to_string();

    let mut metadata = IndexMap::new();
    metadata.insert("project".to_string(), project.clone());

    let rest: &[String] = match dash {
        Some(pos) => &segments[pos + 1..],
        None => &[],
    };

    let (mode, download_url, name) = match rest.first().map(String::as_str) {
        Some("blob") | Some("raw") if rest.len() >= 3 => {
            let branch = &rest[1];
            let file_path = rest[2..].join("/");
            metadata.insert("branch".to_string(), branch.clone());
            metadata.insert("path".to_string(), file_path.clone());
            (
                SourceMode::SingleFile,
                format!("{}/{}/-/raw/{}/{}", origin, project, branch, file_path),
                strip_known_extension(&rest[rest.len() - 1]),
            )
        }
        Some("tree") if rest.len() >= 2 => {
            let branch = &rest[1];
            let sub_path = (rest.len() > 2).then(|| rest[2..].join("/"));
            metadata.insert("branch".to_string(), branch.clone());
            let name = match sub_path {
                Some(_) => rest[rest.len() - 1].clone(),
                None => project_name.clone(),
            };
            (
                SourceMode::Repository { sub_path },
                format!(
                    "{}/repository/archive.zip?sha={}",
                    api,
                    urlencoding::encode(branch)
                ),
                name,
            )
        }
        _ => (
            SourceMode::Repository { sub_path: None },
            format!("{}/repository/archive.zip", api),
            project_name,
        ),
    };

    Ok(SourceDescriptor {
        source_type: SourceType::Gitlab,
        mode,
        normalized_url: url.to_string(),
        api_endpoint: Some(api),
        download_url,
        name,
        metadata,
    })
}

fn classify_direct(parsed: &Url) -> Result<SourceDescriptor> {
    let url = parsed.as_str();
    let file = last_segment(url).ok_or_else(|| unsupported(url))?;
    let mode = mode_for_file(&file).ok_or_else(|| unsupported(url))?;

    Ok(SourceDescriptor {
        source_type: SourceType::Direct,
        mode,
        normalized_url: url.to_string(),
        api_endpoint: None,
        download_url: url.to_string(),
        name: strip_known_extension(&file),
        metadata: IndexMap::new(),
    })
}

fn mode_for_file(file: &str) -> Option<SourceMode> {
    let lower = file.to_lowercase();
    if lower.ends_with(".css") {
        Some(SourceMode::SingleFile)
    } else if ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Some(SourceMode::Archive)
    } else {
        None
    }
}

fn path_segments(parsed: &Url) -> Vec<String> {
    parsed
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Last non-empty path segment of a URL, percent-decoded, without query or fragment
fn last_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    path_segments(&parsed).pop()
}

/// `theme.tar.gz` -> `theme`, `userChrome.css` -> `userChrome`
pub fn strip_known_extension(file: &str) -> String {
    let lower = file.to_lowercase();
    for ext in COMPOUND_EXTENSIONS {
        if lower.ends_with(ext) {
            return file[..file.len() - ext.len()].to_string();
        }
    }
    match file.rfind('.') {
        Some(pos) if pos > 0 => file[..pos].to_string(),
        _ => file.to_string(),
    }
}

fn unsupported(url: &str) -> ModError {
    ModError::UnsupportedUrl { url: url.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_github_blob_rewritten_to_raw() {
        let source = classify("https://github.com/u/r/blob/main/a.css").unwrap();
        assert_eq!(source.source_type, SourceType::Github);
        assert_eq!(source.mode, SourceMode::SingleFile);
        assert_eq!(source.download_url, "https://raw.githubusercontent.com/u/r/main/a.css");
        assert_eq!(source.metadata.get("owner").map(String::as_str), Some("u"));
        assert_eq!(source.metadata.get("repo").map(String::as_str), Some("r"));
    }

    #[test]
    fn test_github_blob_nested_path() {
        let source = classify("https://github.com/u/r/blob/dev/css/theme/userChrome.css").unwrap();
        assert_eq!(
            source.download_url,
            "https://raw.githubusercontent.com/u/r/dev/css/theme/userChrome.css"
        );
        assert_eq!(source.download_file_name(), "userChrome.css");
    }

    #[test]
    fn test_github_repository() {
        let source = classify("https://github.com/acme/theme.git").unwrap();
        assert_eq!(source.mode, SourceMode::Repository { sub_path: None });
        assert_eq!(source.api_endpoint.as_deref(), Some("https://api.github.com/repos/acme/theme"));
        assert_eq!(source.download_url, "https://api.github.com/repos/acme/theme/zipball");
        assert_eq!(source.name, "theme");
        assert_eq!(source.download_file_name(), "theme.zip");
    }

    #[test]
    fn test_github_tree_sub_path() {
        let source = classify("https://github.com/acme/mods/tree/main/tabs/compact").unwrap();
        assert_eq!(
            source.mode,
            SourceMode::Repository { sub_path: Some("tabs/compact".to_string()) }
        );
        assert_eq!(source.download_url, "https://api.github.com/repos/acme/mods/zipball/main");
        assert_eq!(source.name, "compact");
    }

    #[test]
    fn test_github_release_asset() {
        let source = classify("https://github.com/acme/theme/releases/download/v1.0/theme.tar.gz").unwrap();
        assert_eq!(source.source_type, SourceType::Github);
        assert_eq!(source.mode, SourceMode::Archive);
        assert_eq!(source.name, "theme");
        assert_eq!(source.download_url, source.normalized_url);
    }

    #[test]
    fn test_github_without_repo_is_unsupported() {
        let err = classify("https://github.com/acme").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedUrl);
    }

    #[test]
    fn test_missing_scheme_is_prepended() {
        let source = classify("github.com/acme/theme").unwrap();
        assert_eq!(source.normalized_url, "https://github.com/acme/theme");
    }

    #[test]
    fn test_gitlab_project() {
        let source = classify("https://gitlab.com/group/project").unwrap();
        assert_eq!(source.source_type, SourceType::Gitlab);
        assert_eq!(
            source.api_endpoint.as_deref(),
            Some("https://gitlab.com/api/v4/projects/group%2Fproject")
        );
        assert_eq!(
            source.download_url,
            "https://gitlab.com/api/v4/projects/group%2Fproject/repository/archive.zip"
        );
        assert_eq!(source.metadata.get("project").map(String::as_str), Some("group/project"));
    }

    #[test]
    fn test_gitlab_blob_single_file() {
        let source = classify("https://gitlab.com/group/project/-/blob/main/userChrome.css").unwrap();
        assert_eq!(source.mode, SourceMode::SingleFile);
        assert_eq!(
            source.download_url,
            "https://gitlab.com/group/project/-/raw/main/userChrome.css"
        );
    }

    #[test]
    fn test_direct_sources() {
        let css = classify("https://example.com/mods/userChrome.css").unwrap();
        assert_eq!(css.source_type, SourceType::Direct);
        assert_eq!(css.mode, SourceMode::SingleFile);
        assert!(css.api_endpoint.is_none());

        for url in [
            "https://example.com/a.zip",
            "https://example.com/a.RAR",
            "https://example.com/a.7z",
            "https://example.com/a.tar.xz",
            "https://example.com/a.tgz",
        ] {
            assert_eq!(classify(url).unwrap().mode, SourceMode::Archive, "{}", url);
        }
    }

    #[test]
    fn test_direct_unknown_extension_is_unsupported() {
        for url in ["https://example.com/page.html", "https://example.com/", "ftp://example.com/a.zip", ""] {
            assert_eq!(classify(url).unwrap_err().kind(), ErrorKind::UnsupportedUrl, "{}", url);
        }
    }

    #[test]
    fn test_custom_github_endpoints() {
        let mut config = Config::default();
        config.github_api_url = "http://127.0.0.1:9000/".to_string();
        let resolver = SourceResolver::from_config(&config);

        let source = resolver.classify("https://github.com/acme/theme").unwrap();
        assert_eq!(source.download_url, "http://127.0.0.1:9000/repos/acme/theme/zipball");
    }

    #[test]
    fn test_strip_known_extension() {
        assert_eq!(strip_known_extension("theme.tar.gz"), "theme");
        assert_eq!(strip_known_extension("theme.zip"), "theme");
        assert_eq!(strip_known_extension(".hidden"), ".hidden");
        assert_eq!(strip_known_extension("README"), "README");
    }
}
