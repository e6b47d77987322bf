use std::path::{Path, PathBuf};

use crate::config::DocshipConfig;

pub const CONFIG_FILE: &str = "docship.json";

/// Config file looked up inside a source tree
pub fn config_file(source_dir: &Path) -> PathBuf {
    source_dir.join(CONFIG_FILE)
}

/// Where the builder writes and the publisher reads.
///
/// Both stages resolve the directory through this function only.
pub fn artifact_dir(source_dir: &Path, config: &DocshipConfig) -> PathBuf {
    source_dir.join(&config.build.artifact_dir)
}

/// Cargo manifest of the source tree
pub fn manifest(source_dir: &Path) -> PathBuf {
    source_dir.join("Cargo.toml")
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Anchor a path at the current directory, dropping `.` components.
///
/// Git and glob both rewrite relative paths, so anything handed to them
/// goes through here first.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// `expand` followed by `absolute`, for paths taken from the command line.
pub fn resolve(path: &str) -> PathBuf {
    absolute(&expand(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_dir_joins_configured_relative_path() {
        let mut config = DocshipConfig::default();
        assert_eq!(
            artifact_dir(Path::new("/src"), &config),
            PathBuf::from("/src/target/doc")
        );

        config.build.artifact_dir = "out/html".to_string();
        assert_eq!(
            artifact_dir(Path::new("/src"), &config),
            PathBuf::from("/src/out/html")
        );
    }

    #[test]
    fn absolute_anchors_relative_paths_at_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute(Path::new(".")), cwd);
        assert_eq!(absolute(Path::new("./target/doc")), cwd.join("target/doc"));
        assert_eq!(absolute(Path::new("/src/./doc")), PathBuf::from("/src/doc"));
        assert_eq!(resolve("."), cwd);
    }

    #[test]
    fn expand_leaves_plain_paths() {
        assert_eq!(expand("target/doc"), PathBuf::from("target/doc"));
    }
}
