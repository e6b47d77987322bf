//! Pipeline configuration loaded from `docship.json`.
//!
//! Every field carries its own serde default so a partial file, or no file
//! at all, yields a working configuration for a standard `cargo doc` setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;

/// Root configuration structure for docship.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocshipConfig {
    #[serde(default)]
    pub trigger: TriggerConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub publish: PublishConfig,
}

/// Which pushes start a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerConfig {
    #[serde(default = "default_tracked_branch")]
    pub branch: String,
}

/// Tools that must answer `--version` before a build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolchainConfig {
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Shell command run once when a tool is missing, e.g. a rustup install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Cloned into the source directory when it does not exist yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    #[serde(default = "default_doc_command")]
    pub doc_command: String,

    /// Relative to the source directory. Shared by build and publish.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rustdocflags: Option<String>,

    /// Write a root index.html that redirects to the crate's docs
    #[serde(default)]
    pub redirect_index: bool,

    #[serde(default = "default_true")]
    pub nojekyll: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishConfig {
    /// `owner/name`, a git URL, or a local repository path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default = "default_publish_branch")]
    pub branch: String,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,

    #[serde(default = "default_message")]
    pub message: String,

    #[serde(default)]
    pub skip_unchanged: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            branch: default_tracked_branch(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            tools: default_tools(),
            install_command: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            clone_url: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            doc_command: default_doc_command(),
            artifact_dir: default_artifact_dir(),
            rustdocflags: None,
            redirect_index: false,
            nojekyll: true,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            repository: None,
            branch: default_publish_branch(),
            token_env: default_token_env(),
            author_name: default_author_name(),
            author_email: default_author_email(),
            message: default_message(),
            skip_unchanged: false,
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_tracked_branch() -> String {
    "main".to_string()
}

fn default_tools() -> Vec<String> {
    vec!["cargo".to_string(), "rustdoc".to_string()]
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_doc_command() -> String {
    "cargo doc --no-deps".to_string()
}

fn default_artifact_dir() -> String {
    "target/doc".to_string()
}

fn default_true() -> bool {
    true
}

fn default_publish_branch() -> String {
    "gh-pages".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_author_name() -> String {
    "docship".to_string()
}

fn default_author_email() -> String {
    "docship@users.noreply.github.com".to_string()
}

fn default_message() -> String {
    "Deploy docs for {{commit}} to {{branch}}".to_string()
}

// =============================================================================
// Loading
// =============================================================================

/// Configuration plus the file it came from, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub config: DocshipConfig,
}

/// Load configuration for a source tree.
///
/// An explicit path must exist. Without one, `<source>/docship.json` is
/// used when present and defaults otherwise.
pub fn load(source_dir: &Path, explicit: Option<&str>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(p) => {
            let path = paths::expand(p);
            if !path.is_file() {
                return Err(Error::validation_invalid_argument(
                    "config",
                    format!("Config file not found: {}", path.display()),
                    Some(p.to_string()),
                ));
            }
            Some(path)
        }
        None => Some(paths::config_file(source_dir)).filter(|p| p.is_file()),
    };

    let config = match &path {
        Some(p) => parse_file(p)?,
        None => DocshipConfig::default(),
    };

    validate(&config)?;

    Ok(LoadedConfig { path, config })
}

fn parse_file(path: &Path) -> Result<DocshipConfig> {
    let raw = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;
    parse(&raw, &path.to_string_lossy())
}

pub fn parse(raw: &str, origin: &str) -> Result<DocshipConfig> {
    serde_json::from_str(raw).map_err(|e| Error::config_invalid_json(origin, e))
}

/// Reject values that would break the build/publish contract.
pub fn validate(config: &DocshipConfig) -> Result<()> {
    let branches = [
        ("trigger.branch", &config.trigger.branch),
        ("publish.branch", &config.publish.branch),
    ];
    for (key, branch) in branches {
        if branch.trim().is_empty() || branch.contains(char::is_whitespace) {
            return Err(Error::config_invalid_value(
                key,
                Some(branch.clone()),
                "branch names must be non-empty and contain no whitespace",
            ));
        }
    }

    if config.build.doc_command.trim().is_empty() {
        return Err(Error::config_invalid_value(
            "build.doc_command",
            None,
            "doc command must not be empty",
        ));
    }

    validate_artifact_dir(&config.build.artifact_dir)?;

    if config.publish.token_env.trim().is_empty() {
        return Err(Error::config_invalid_value(
            "publish.token_env",
            None,
            "token environment variable name must not be empty",
        ));
    }

    Ok(())
}

/// The artifact directory must stay inside the source tree: the builder
/// deletes it before every run.
fn validate_artifact_dir(dir: &str) -> Result<()> {
    let path = Path::new(dir);
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            _ => {
                return Err(Error::config_invalid_value(
                    "build.artifact_dir",
                    Some(dir.to_string()),
                    "artifact directory must be a relative path inside the source tree",
                ));
            }
        }
    }

    if depth == 0 {
        return Err(Error::config_invalid_value(
            "build.artifact_dir",
            Some(dir.to_string()),
            "artifact directory must not be the source root",
        ));
    }

    Ok(())
}
