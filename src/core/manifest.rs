//! Minimal reading of the Cargo manifest being documented.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths;

#[derive(Debug, Deserialize)]
struct RawManifest {
    package: Option<RawPackage>,
    lib: Option<RawTarget>,
    workspace: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CrateManifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_name: Option<String>,
    pub workspace: bool,
}

impl CrateManifest {
    /// Directory rustdoc uses for the crate's root module.
    pub fn crate_ident(&self) -> Option<String> {
        self.lib_name
            .clone()
            .or_else(|| self.package.clone())
            .map(|name| name.replace('-', "_"))
    }
}

pub fn load(source_dir: &Path) -> Result<CrateManifest> {
    let path = paths::manifest(source_dir);
    let raw = fs::read_to_string(&path).map_err(|e| {
        Error::source_failed(
            source_dir.to_string_lossy(),
            format!("cannot read {}: {}", path.display(), e),
        )
    })?;
    parse(&raw).map_err(|problem| Error::source_failed(source_dir.to_string_lossy(), problem))
}

fn parse(raw: &str) -> std::result::Result<CrateManifest, String> {
    let manifest: RawManifest =
        toml::from_str(raw).map_err(|e| format!("invalid Cargo.toml: {}", e))?;

    if manifest.package.is_none() && manifest.workspace.is_none() {
        return Err("Cargo.toml has neither [package] nor [workspace]".to_string());
    }

    Ok(CrateManifest {
        package: manifest.package.map(|p| p.name),
        lib_name: manifest.lib.and_then(|l| l.name),
        workspace: manifest.workspace.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn crate_ident_prefers_lib_name() {
        let manifest = parse(
            r#"
[package]
name = "my-crate"
version = "0.1.0"

[lib]
name = "mine"
"#,
        )
        .unwrap();
        assert_eq!(manifest.crate_ident().as_deref(), Some("mine"));
    }

    #[test]
    fn crate_ident_replaces_dashes() {
        let manifest = parse("[package]\nname = \"my-crate\"\nversion = \"0.1.0\"\n").unwrap();
        assert_eq!(manifest.crate_ident().as_deref(), Some("my_crate"));
        assert!(!manifest.workspace);
    }

    #[test]
    fn virtual_workspace_has_no_ident() {
        let manifest = parse("[workspace]\nmembers = [\"a\"]\n").unwrap();
        assert!(manifest.workspace);
        assert!(manifest.crate_ident().is_none());
    }

    #[test]
    fn rejects_manifest_without_package_or_workspace() {
        assert!(parse("[dependencies]\n").is_err());
        assert!(parse("not toml [").is_err());
    }

    #[test]
    fn load_reports_missing_manifest_as_source_failure() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "source.failed");
    }
}
