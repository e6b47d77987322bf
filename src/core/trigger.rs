//! Push events that start a pipeline run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const HEADS_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerEvent {
    pub branch: String,
    pub commit: String,
}

/// Subset of a GitHub `push` webhook payload.
#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    after: String,
}

impl TriggerEvent {
    pub fn new(branch: &str, commit: &str) -> Result<Self> {
        let branch = normalize_branch(branch);
        let commit = commit.trim().to_string();

        if branch.is_empty() {
            return Err(Error::validation_invalid_argument(
                "branch",
                "Trigger branch is empty",
                None,
            ));
        }
        if !is_commit_id(&commit) {
            return Err(Error::validation_invalid_argument(
                "commit",
                format!("'{}' is not a commit id", commit),
                Some(commit.clone()),
            ));
        }

        Ok(Self { branch, commit })
    }

    /// Parse a push payload file (`GITHUB_EVENT_PATH`).
    pub fn from_event_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
        })?;
        Self::from_event_json(&raw)
    }

    pub fn from_event_json(raw: &str) -> Result<Self> {
        let payload: PushPayload = serde_json::from_str(raw).map_err(|e| {
            Error::validation_invalid_json(
                e,
                Some("parse push event".to_string()),
                Some(raw.chars().take(200).collect()),
            )
        })?;

        if !payload.git_ref.starts_with(HEADS_PREFIX) {
            return Err(Error::validation_invalid_argument(
                "ref",
                format!("'{}' is not a branch push", payload.git_ref),
                Some(payload.git_ref),
            ));
        }

        Self::new(&payload.git_ref, &payload.after)
    }

    /// Build from `GITHUB_REF` / `GITHUB_SHA` style variables.
    pub fn from_env_vars(git_ref: Option<String>, sha: Option<String>) -> Result<Self> {
        let mut missing = Vec::new();
        if git_ref.as_deref().is_none_or(|s| s.trim().is_empty()) {
            missing.push("GITHUB_REF".to_string());
        }
        if sha.as_deref().is_none_or(|s| s.trim().is_empty()) {
            missing.push("GITHUB_SHA".to_string());
        }
        if !missing.is_empty() {
            return Err(Error::validation_missing_argument(missing)
                .with_hint("Pass --branch and --commit, or --event <payload.json>"));
        }

        Self::new(
            git_ref.as_deref().unwrap_or_default(),
            sha.as_deref().unwrap_or_default(),
        )
    }

    pub fn from_env() -> Result<Self> {
        Self::from_env_vars(
            std::env::var("GITHUB_REF").ok(),
            std::env::var("GITHUB_SHA").ok(),
        )
    }

    /// Only pushes to the tracked branch start a run.
    pub fn matches(&self, tracked_branch: &str) -> bool {
        self.branch == normalize_branch(tracked_branch)
    }

    pub fn short_commit(&self) -> &str {
        let end = self.commit.len().min(7);
        &self.commit[..end]
    }
}

pub fn normalize_branch(branch: &str) -> String {
    let trimmed = branch.trim();
    trimmed
        .strip_prefix(HEADS_PREFIX)
        .unwrap_or(trimmed)
        .to_string()
}

/// Hex object id, abbreviated or full.
pub fn is_commit_id(value: &str) -> bool {
    (4..=64).contains(&value.len()) && value.chars().all(|c| c.is_ascii_hexdigit())
}
