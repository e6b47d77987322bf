//! Source acquisition: put the triggering commit on disk.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::git;
use crate::manifest::{self, CrateManifest};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutput {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    pub cloned: bool,
    pub checked_out: bool,
    pub manifest: CrateManifest,
}

/// Ensure `source_dir` holds `commit` (when given) and a valid manifest.
pub fn acquire(
    source_dir: &Path,
    commit: Option<&str>,
    config: &SourceConfig,
) -> Result<SourceOutput> {
    let fail = |problem: String| Error::source_failed(source_dir.to_string_lossy(), problem);

    let mut cloned = false;
    if !source_dir.exists() {
        let url = config.clone_url.as_deref().ok_or_else(|| {
            fail("source directory does not exist and no clone_url is configured".to_string())
        })?;
        log_status!("source", "Cloning {} into {}", url, source_dir.display());
        git::clone_repo(url, source_dir).map_err(|e| fail(e.message))?;
        cloned = true;
    }

    let mut checked_out = false;
    let head = if git::is_git_repo(source_dir) {
        let mut head = git::head_commit(source_dir).map_err(|e| fail(e.message))?;
        if let Some(commit) = commit {
            if !commit_matches(&head, commit) {
                log_status!("source", "Checking out {} (HEAD is {})", commit, head);
                git::fetch_and_checkout(source_dir, &config.remote, commit)
                    .map_err(|e| fail(e.message))?;
                head = git::head_commit(source_dir).map_err(|e| fail(e.message))?;
                checked_out = true;
            }
            if !commit_matches(&head, commit) {
                return Err(fail(format!(
                    "HEAD is {} but the trigger commit is {}",
                    head, commit
                )));
            }
        }
        Some(head)
    } else if let Some(commit) = commit {
        return Err(fail(format!(
            "not a git checkout, cannot verify commit {}",
            commit
        )));
    } else {
        None
    };

    let manifest = manifest::load(source_dir)?;

    Ok(SourceOutput {
        path: source_dir.to_path_buf(),
        head,
        cloned,
        checked_out,
        manifest,
    })
}

/// Full ids compare exactly, abbreviated trigger ids by prefix.
fn commit_matches(head: &str, commit: &str) -> bool {
    let commit = commit.to_ascii_lowercase();
    head.to_ascii_lowercase().starts_with(&commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::{commit_all, init_repo};
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n";

    #[test]
    fn commit_matches_prefix() {
        assert!(commit_matches("abc123def", "abc123"));
        assert!(commit_matches("abc123def", "ABC123"));
        assert!(!commit_matches("abc123def", "abd"));
    }

    #[test]
    fn plain_directory_without_commit_is_accepted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), MANIFEST).unwrap();

        let out = acquire(dir.path(), None, &SourceConfig::default()).unwrap();
        assert!(out.head.is_none());
        assert_eq!(out.manifest.crate_ident().as_deref(), Some("demo"));
    }

    #[test]
    fn plain_directory_with_commit_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), MANIFEST).unwrap();

        let err = acquire(dir.path(), Some("abc123"), &SourceConfig::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "source.failed");
    }

    #[test]
    fn missing_directory_without_clone_url_fails() {
        let dir = TempDir::new().unwrap();
        let err = acquire(&dir.path().join("absent"), None, &SourceConfig::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "source.failed");
    }

    #[test]
    fn checks_out_trigger_commit() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        fs::write(dir.path().join("Cargo.toml"), MANIFEST).unwrap();
        let first = commit_all(dir.path(), "first");
        fs::write(dir.path().join("README.md"), "later").unwrap();
        let second = commit_all(dir.path(), "second");

        let out = acquire(dir.path(), Some(&first), &SourceConfig::default()).unwrap();
        assert!(out.checked_out);
        assert_eq!(out.head.as_deref(), Some(first.as_str()));
        assert!(!dir.path().join("README.md").exists());

        let out = acquire(dir.path(), Some(&second[..7]), &SourceConfig::default()).unwrap();
        assert!(out.checked_out);
        assert_eq!(out.head.as_deref(), Some(second.as_str()));
    }

    #[test]
    fn unknown_commit_is_source_failure() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        fs::write(dir.path().join("Cargo.toml"), MANIFEST).unwrap();
        commit_all(dir.path(), "first");

        let err = acquire(dir.path(), Some("deadbeef"), &SourceConfig::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "source.failed");
    }

    #[test]
    fn clones_when_directory_is_absent() {
        let upstream = TempDir::new().unwrap();
        init_repo(upstream.path());
        fs::write(upstream.path().join("Cargo.toml"), MANIFEST).unwrap();
        let head = commit_all(upstream.path(), "first");

        let work = TempDir::new().unwrap();
        let target = work.path().join("checkout");
        let config = SourceConfig {
            clone_url: Some(upstream.path().to_string_lossy().to_string()),
            ..SourceConfig::default()
        };

        let out = acquire(&target, Some(&head), &config).unwrap();
        assert!(out.cloned);
        assert!(!out.checked_out);
        assert_eq!(out.head.as_deref(), Some(head.as_str()));
    }
}
