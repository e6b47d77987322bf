//! Publishing: make the artifact the entire content of the hosting branch.
//!
//! The artifact directory is used as the work tree of a throwaway git
//! directory, so the committed tree is exactly the artifact's files. The new
//! commit takes the current branch tip as its parent and is force-pushed:
//! nothing from the previous tree survives, and the last run to push wins.

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

use crate::artifact::{self, Artifact};
use crate::config::PublishConfig;
use crate::error::{Error, PublishFailedDetails, Result};
use crate::git;
use crate::paths;
use crate::utils::command::{self, CommandOutput};
use crate::utils::secret;
use crate::utils::template::{render, TemplateVars};

const GITHUB_URL: &str = "https://github.com/";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Published,
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub repository: String,
    pub branch: String,
    pub status: PublishStatus,
    /// Branch tip after the operation
    pub commit: String,
    pub tree: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub file_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Transport,
}

/// A resolved publish target plus the credential to reach it.
#[derive(Debug, Clone)]
pub struct Publisher {
    /// Repository as configured, for messages
    pub repository: String,
    /// What git fetches from and pushes to
    pub remote_url: String,
    pub branch: String,
    token: Option<String>,
    author_name: String,
    author_email: String,
    message_template: String,
    skip_unchanged: bool,
}

impl Publisher {
    pub fn new(config: &PublishConfig, repository: &str, token: Option<String>) -> Self {
        Self {
            repository: repository.to_string(),
            remote_url: remote_url(repository),
            branch: config.branch.clone(),
            token: token.filter(|t| !t.trim().is_empty()),
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
            message_template: config.message.clone(),
            skip_unchanged: config.skip_unchanged,
        }
    }

    /// Build a publisher reading the token from `config.token_env`.
    pub fn from_env(config: &PublishConfig, repository: &str) -> Self {
        Self::new(config, repository, std::env::var(&config.token_env).ok())
    }

    fn is_github(&self) -> bool {
        self.remote_url.starts_with(GITHUB_URL)
    }

    /// Git config entry carrying the token, scoped to GitHub so no other
    /// host ever receives it.
    fn credential_config(&self) -> Option<(String, String)> {
        let token = self.token.as_deref()?;
        if !self.is_github() {
            return None;
        }
        Some((
            format!("http.{}.extraheader", GITHUB_URL),
            secret::auth_header(token),
        ))
    }

    /// Replace the branch content with `artifact_dir`.
    ///
    /// `source_commit` fills `{{commit}}` in the commit message.
    pub fn publish(
        &self,
        artifact_dir: &Path,
        source_commit: Option<&str>,
    ) -> Result<PublishOutcome> {
        let artifact = artifact::inspect(artifact_dir)?;

        if self.is_github() && self.token.is_none() {
            return Err(Error::publish_auth_failed(self.failure_details(
                "credentials",
                "no token available for a GitHub repository".to_string(),
            )));
        }

        let staging = Staging::new(&artifact)?;

        log_status!("publish", "Fetching {} from {}", self.branch, self.repository);
        let parent = self.fetch_tip(&staging)?;

        staging.add_all().map_err(|e| self.internal(e))?;
        let tree = staging
            .stdout(&["write-tree"], &[])
            .map_err(|e| self.internal(e))?;

        if let Some(parent) = &parent {
            if self.skip_unchanged {
                let parent_tree = staging
                    .stdout(&["rev-parse", &format!("{}^{{tree}}", parent)], &[])
                    .map_err(|e| self.internal(e))?;
                if parent_tree == tree {
                    log_status!("publish", "Tree unchanged at {}; nothing to push", parent);
                    return Ok(self.outcome(
                        PublishStatus::Unchanged,
                        parent.clone(),
                        tree,
                        None,
                        &artifact,
                    ));
                }
            }
        }

        let message = self.commit_message(source_commit);
        let mut commit_args = vec!["commit-tree", tree.as_str(), "-m", message.as_str()];
        if let Some(parent) = &parent {
            commit_args.push("-p");
            commit_args.push(parent.as_str());
        }
        let identity = [
            ("GIT_AUTHOR_NAME", self.author_name.as_str()),
            ("GIT_AUTHOR_EMAIL", self.author_email.as_str()),
            ("GIT_COMMITTER_NAME", self.author_name.as_str()),
            ("GIT_COMMITTER_EMAIL", self.author_email.as_str()),
        ];
        let commit = staging
            .stdout(&commit_args, &identity)
            .map_err(|e| self.internal(e))?;

        log_status!("publish", "Pushing {} to {} ({})", commit, self.branch, self.repository);
        let refspec = format!("+{}:refs/heads/{}", commit, self.branch);
        let out = staging.remote(&["push", &self.remote_url, &refspec], self.credential_config());
        if !out.success {
            return Err(self.remote_failure("push", &out));
        }

        Ok(self.outcome(PublishStatus::Published, commit, tree, parent, &artifact))
    }

    /// Current branch tip, or None when the branch does not exist yet.
    fn fetch_tip(&self, staging: &Staging) -> Result<Option<String>> {
        let refspec = format!("refs/heads/{}", self.branch);
        let out = staging.remote(
            &["fetch", "--quiet", "--no-tags", "--depth", "1", &self.remote_url, &refspec],
            self.credential_config(),
        );

        if out.success {
            return staging
                .stdout(&["rev-parse", "FETCH_HEAD"], &[])
                .map(Some)
                .map_err(|e| self.internal(e));
        }

        if out.stderr.contains("couldn't find remote ref") {
            log_status!("publish", "Branch {} does not exist yet; creating it", self.branch);
            return Ok(None);
        }

        Err(self.remote_failure("fetch", &out))
    }

    fn commit_message(&self, source_commit: Option<&str>) -> String {
        let commit = source_commit.unwrap_or("local build");
        let short = source_commit.map(|c| c.get(..7).unwrap_or(c)).unwrap_or(commit);
        render(
            &self.message_template,
            &[
                (TemplateVars::COMMIT, commit),
                (TemplateVars::SHORT_COMMIT, short),
                (TemplateVars::BRANCH, &self.branch),
            ],
        )
    }

    fn outcome(
        &self,
        status: PublishStatus,
        commit: String,
        tree: String,
        parent: Option<String>,
        artifact: &Artifact,
    ) -> PublishOutcome {
        PublishOutcome {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            status,
            commit,
            tree,
            parent,
            file_count: artifact.file_count,
        }
    }

    fn failure_details(&self, operation: &str, error: String) -> PublishFailedDetails {
        PublishFailedDetails {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            operation: operation.to_string(),
            error: secret::redact(&error, self.token.as_deref()),
        }
    }

    fn remote_failure(&self, operation: &str, out: &CommandOutput) -> Error {
        let text = command::tail_lines(out.error_text(), 15);
        let details = self.failure_details(operation, text.clone());
        match classify_failure(&text) {
            FailureKind::Auth => Error::publish_auth_failed(details),
            FailureKind::Transport => Error::publish_transport_failed(details),
        }
    }

    fn internal(&self, err: Error) -> Error {
        Error::git_command_failed(secret::redact(&err.message, self.token.as_deref()))
    }
}

/// Temporary git directory whose work tree is the artifact.
struct Staging {
    git_dir: TempDir,
    work_tree: PathBuf,
}

impl Staging {
    fn new(artifact: &Artifact) -> Result<Self> {
        let git_dir = tempfile::Builder::new()
            .prefix("docship-publish")
            .tempdir()
            .map_err(|e| {
                Error::internal_io(e.to_string(), Some("create staging directory".to_string()))
            })?;

        let staging = Self {
            git_dir,
            work_tree: paths::absolute(&artifact.root),
        };
        let dir = staging.git_dir.path().to_string_lossy().to_string();
        git::git_stdout(staging.git_dir.path(), &["init", "--quiet", "--bare", &dir], "git init")?;
        Ok(staging)
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "-c".to_string(),
            "core.autocrlf=false".to_string(),
            "--git-dir".to_string(),
            self.git_dir.path().to_string_lossy().to_string(),
            "--work-tree".to_string(),
            self.work_tree.to_string_lossy().to_string(),
        ]
    }

    fn run(&self, args: &[&str], env: &[(&str, &str)]) -> CommandOutput {
        let mut all = self.base_args();
        all.extend(args.iter().map(|a| a.to_string()));
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        git::git_with_env(self.git_dir.path(), &refs, env)
    }

    fn stdout(&self, args: &[&str], env: &[(&str, &str)]) -> Result<String> {
        let out = self.run(args, env);
        if !out.success {
            return Err(Error::git_command_failed(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                out.error_text()
            )));
        }
        Ok(out.stdout.trim().to_string())
    }

    /// Stage every artifact file, ignoring any ignore rules.
    fn add_all(&self) -> Result<()> {
        self.stdout(&["add", "--all", "--force"], &[]).map(|_| ())
    }

    /// Run a network operation with prompts disabled and the credential, if
    /// any, passed as git config through the environment.
    fn remote(&self, args: &[&str], credential: Option<(String, String)>) -> CommandOutput {
        let mut env = vec![("GIT_TERMINAL_PROMPT", "0")];
        if let Some((key, value)) = &credential {
            env.push(("GIT_CONFIG_COUNT", "1"));
            env.push(("GIT_CONFIG_KEY_0", key.as_str()));
            env.push(("GIT_CONFIG_VALUE_0", value.as_str()));
        }
        self.run(args, &env)
    }
}

/// Map a configured repository to a git remote.
///
/// Existing local paths are made absolute, `owner/name` slugs become GitHub
/// HTTPS URLs, and anything URL-like is used as given.
pub fn remote_url(repository: &str) -> String {
    let local = Path::new(repository);
    if local.exists() {
        return paths::absolute(local).to_string_lossy().to_string();
    }
    if slug_pattern().is_match(repository) {
        return format!("{}{}.git", GITHUB_URL, repository);
    }
    repository.to_string()
}

/// Choose the publish repository: config, then `GITHUB_REPOSITORY`, then the
/// source checkout's remote.
pub fn resolve_repository(
    config: &PublishConfig,
    env_repository: Option<String>,
    source_dir: &Path,
    source_remote: &str,
) -> Result<String> {
    config
        .repository
        .clone()
        .or(env_repository)
        .filter(|r| !r.trim().is_empty())
        .or_else(|| git::remote_url(source_dir, source_remote))
        .ok_or_else(|| {
            Error::validation_missing_argument(vec!["publish.repository".to_string()])
                .with_hint("Set publish.repository in docship.json or pass --repository")
        })
}

pub fn classify_failure(stderr: &str) -> FailureKind {
    if auth_pattern().is_match(stderr) {
        FailureKind::Auth
    } else {
        FailureKind::Transport
    }
}

fn auth_pattern() -> &'static Regex {
    static AUTH: OnceLock<Regex> = OnceLock::new();
    AUTH.get_or_init(|| {
        Regex::new(
            r"(?i)(authentication failed|could not read (username|password)|invalid username or password|permission to \S+ denied|permission denied|bad credentials|returned error: 40[13]|403 forbidden|access denied|write access to repository not granted|terminal prompts disabled)",
        )
        .expect("auth pattern is valid")
    })
}

fn slug_pattern() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("slug pattern is valid")
    })
}
