//! The generated documentation tree handed from the builder to the publisher.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub root: PathBuf,
    #[serde(skip)]
    pub files: Vec<String>,
    pub file_count: usize,
    pub total_bytes: u64,
    /// SHA-256 over every relative path and file content, in path order
    pub digest: String,
}

impl Artifact {
    pub fn contains(&self, relative: &str) -> bool {
        self.files.binary_search_by(|f| f.as_str().cmp(relative)).is_ok()
    }
}

/// Enumerate and fingerprint an artifact directory.
///
/// A missing or empty directory is `artifact.empty`: publishing it would
/// wipe the publishing branch.
pub fn inspect(root: &Path) -> Result<Artifact> {
    let root = paths::absolute(root);
    let root = root.as_path();
    if !root.is_dir() {
        return Err(Error::artifact_empty(root.to_string_lossy(), false));
    }

    let files = list_files(root)?;
    if files.is_empty() {
        return Err(Error::artifact_empty(root.to_string_lossy(), true));
    }

    let mut hasher = Sha256::new();
    let mut total_bytes = 0u64;
    for relative in &files {
        let content = fs::read(root.join(relative)).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read artifact file {}", relative)))
        })?;
        total_bytes += content.len() as u64;
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }

    Ok(Artifact {
        root: root.to_path_buf(),
        file_count: files.len(),
        files,
        total_bytes,
        digest: format!("{:x}", hasher.finalize()),
    })
}

/// Sorted relative paths (`/`-separated) of every regular file under `root`.
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    let root = paths::absolute(root);
    let root = root.as_path();
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&root.to_string_lossy())
    );

    let entries = glob::glob(&pattern).map_err(|e| {
        Error::internal_unexpected(format!("Invalid artifact pattern '{}': {}", pattern, e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            Error::internal_io(e.to_string(), Some("walk artifact directory".to_string()))
        })?;
        if !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root).map_err(|_| {
            Error::internal_unexpected(format!(
                "Artifact file {} is outside {}",
                path.display(),
                root.display()
            ))
        })?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        files.push(parts.join("/"));
    }

    files.sort();
    Ok(files)
}

/// Delete an artifact directory if present.
pub fn remove(root: &Path) -> Result<()> {
    if root.exists() {
        fs::remove_dir_all(root).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("remove artifact directory {}", root.display())),
            )
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_directory_is_empty_artifact() {
        let dir = TempDir::new().unwrap();
        let err = inspect(&dir.path().join("doc")).unwrap_err();
        assert_eq!(err.code.as_str(), "artifact.empty");
        assert_eq!(err.details["exists"], false);
    }

    #[test]
    fn directory_with_only_subdirectories_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("doc/static")).unwrap();
        let err = inspect(&dir.path().join("doc")).unwrap_err();
        assert_eq!(err.details["exists"], true);
    }

    #[test]
    fn lists_nested_and_hidden_files_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "demo/index.html", "<html>");
        write(dir.path(), ".nojekyll", "");
        write(dir.path(), "demo/sub/mod.html", "sub");

        let artifact = inspect(dir.path()).unwrap();
        assert_eq!(
            artifact.files,
            vec![".nojekyll", "demo/index.html", "demo/sub/mod.html"]
        );
        assert_eq!(artifact.file_count, 3);
        assert_eq!(artifact.total_bytes, 9);
        assert!(artifact.contains("demo/index.html"));
        assert!(!artifact.contains("demo"));
    }

    #[test]
    fn digest_tracks_content_and_paths() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write(a.path(), "x/index.html", "same");
        write(b.path(), "x/index.html", "same");
        assert_eq!(inspect(a.path()).unwrap().digest, inspect(b.path()).unwrap().digest);

        write(b.path(), "x/index.html", "changed");
        assert_ne!(inspect(a.path()).unwrap().digest, inspect(b.path()).unwrap().digest);

        let c = TempDir::new().unwrap();
        write(c.path(), "y/index.html", "same");
        assert_ne!(inspect(a.path()).unwrap().digest, inspect(c.path()).unwrap().digest);
    }

    #[test]
    fn relative_root_keeps_every_file() {
        let dir = tempfile::Builder::new()
            .prefix("docship-artifact")
            .tempdir_in(".")
            .unwrap();
        let relative = Path::new(".").join(dir.path().file_name().unwrap());
        write(&relative, "demo/index.html", "<html>");
        write(&relative, ".nojekyll", "");

        let artifact = inspect(&relative).unwrap();
        assert!(artifact.root.is_absolute());
        assert_eq!(artifact.files, vec![".nojekyll", "demo/index.html"]);
    }

    #[test]
    fn remove_is_noop_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        remove(&dir.path().join("absent")).unwrap();
        write(dir.path(), "doc/a.html", "a");
        remove(&dir.path().join("doc")).unwrap();
        assert!(!dir.path().join("doc").exists());
    }
}
