use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::{self, Artifact};
use crate::config::{BuildConfig, DocshipConfig};
use crate::error::{CommandFailedDetails, Error, Result};
use crate::manifest::{self, CrateManifest};
use crate::paths;
use crate::utils::command;
use crate::utils::template::{render, TemplateVars};

const OUTPUT_TAIL_LINES: usize = 15;

const REDIRECT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="0; url={{crate}}/index.html">
<link rel="canonical" href="{{crate}}/index.html">
<title>Redirecting to {{crate}}</title>
</head>
<body><a href="{{crate}}/index.html">{{crate}}</a></body>
</html>
"#;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub doc_command: String,
    pub source_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crate_ident: Option<String>,
    pub artifact: Artifact,
    pub redirect_written: bool,
    pub nojekyll_written: bool,
}

/// Build docs for a source tree using its own manifest.
pub fn run(source_dir: &Path, config: &DocshipConfig) -> Result<BuildOutput> {
    let manifest = manifest::load(source_dir)?;
    build_docs(
        source_dir,
        &manifest,
        &config.build,
        &paths::artifact_dir(source_dir, config),
    )
}

/// Run the doc generator and finalize the artifact directory.
///
/// The artifact directory is deleted before the generator runs and again on
/// any failure, so a failed build never leaves a publishable tree behind.
pub fn build_docs(
    source_dir: &Path,
    manifest: &CrateManifest,
    config: &BuildConfig,
    artifact_dir: &Path,
) -> Result<BuildOutput> {
    artifact::remove(artifact_dir)?;

    let mut env: Vec<(&str, &str)> = vec![("CARGO_TERM_COLOR", "never")];
    if let Some(flags) = config.rustdocflags.as_deref() {
        env.push(("RUSTDOCFLAGS", flags));
    }

    log_status!("build", "Running '{}' in {}", config.doc_command, source_dir.display());
    let output = command::capture_shell(&config.doc_command, Some(source_dir), &env);

    if !output.success {
        artifact::remove(artifact_dir).ok();
        let tail = command::tail_lines(output.error_text(), OUTPUT_TAIL_LINES);
        return Err(Error::build_failed(
            format_build_error(&config.doc_command, source_dir, output.exit_code, &tail),
            CommandFailedDetails {
                command: config.doc_command.clone(),
                exit_code: output.exit_code,
                output_tail: tail,
                working_dir: Some(source_dir.to_string_lossy().to_string()),
            },
        ));
    }

    match finalize(source_dir, manifest, config, artifact_dir) {
        Ok(out) => {
            log_status!(
                "build",
                "Artifact ready: {} files, {} bytes",
                out.artifact.file_count,
                out.artifact.total_bytes
            );
            Ok(out)
        }
        Err(err) => {
            artifact::remove(artifact_dir).ok();
            Err(err)
        }
    }
}

fn finalize(
    source_dir: &Path,
    manifest: &CrateManifest,
    config: &BuildConfig,
    artifact_dir: &Path,
) -> Result<BuildOutput> {
    // Cargo's build lock is not documentation
    let lock = artifact_dir.join(".lock");
    if lock.is_file() {
        fs::remove_file(&lock).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("remove {}", lock.display())))
        })?;
    }

    let crate_ident = manifest.crate_ident();
    if let Some(ident) = &crate_ident {
        let page = artifact_dir.join(ident).join("index.html");
        if !page.is_file() {
            return Err(Error::build_failed(
                format!(
                    "Doc generator succeeded but produced no page for crate '{}'",
                    ident
                ),
                CommandFailedDetails {
                    command: config.doc_command.clone(),
                    exit_code: 0,
                    output_tail: format!("expected {}", page.display()),
                    working_dir: None,
                },
            ));
        }
    }

    // Check before writing extras so marker files cannot mask an empty build
    artifact::inspect(artifact_dir)?;

    let mut redirect_written = false;
    if config.redirect_index {
        match &crate_ident {
            Some(ident) => {
                let index = artifact_dir.join("index.html");
                if !index.exists() {
                    let html = render(REDIRECT_TEMPLATE, &[(TemplateVars::CRATE, ident)]);
                    write_file(&index, &html)?;
                    redirect_written = true;
                }
            }
            None => log_status!("build", "Skipping index redirect: manifest has no package"),
        }
    }

    let mut nojekyll_written = false;
    if config.nojekyll {
        write_file(&artifact_dir.join(".nojekyll"), "")?;
        nojekyll_written = true;
    }

    Ok(BuildOutput {
        doc_command: config.doc_command.clone(),
        source_dir: source_dir.to_path_buf(),
        crate_ident,
        artifact: artifact::inspect(artifact_dir)?,
        redirect_written,
        nojekyll_written,
    })
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("write {}", path.display()))))
}

/// Format a build error message with context from the generator output.
/// Only includes universal POSIX exit code hints.
fn format_build_error(doc_command: &str, working_dir: &Path, exit_code: i32, tail: &str) -> String {
    let hint = match exit_code {
        127 => "\nHint: Command not found. Check that the toolchain is installed and in PATH.",
        126 => "\nHint: Permission denied. Check permissions on the doc command.",
        _ => "",
    };

    let mut msg = format!(
        "Documentation build failed (exit code {}).\n  Command: {}\n  Working directory: {}",
        exit_code,
        doc_command,
        working_dir.display()
    );

    if !tail.is_empty() {
        msg.push_str("\n\n--- Build output (last 15 lines) ---\n");
        msg.push_str(tail);
        msg.push_str("\n--- End of output ---");
    }

    msg.push_str(hint);
    msg
}
