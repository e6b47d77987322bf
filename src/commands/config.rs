use clap::{Args, Subcommand};
use serde::Serialize;

use docship::config::DocshipConfig;
use docship::paths;

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display the effective configuration (defaults + docship.json)
    Show {
        /// Show only built-in defaults (ignore docship.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Show the path of the config file in use
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<DocshipConfig>,
    path: String,
    exists: bool,
}

pub fn run(args: ConfigArgs, global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin, global),
        ConfigCommand::Path => path(global),
    }
}

fn show(builtin: bool, global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    if builtin {
        let file = paths::config_file(&global.source_dir);
        return Ok((
            ConfigOutput {
                command: "config.show".to_string(),
                config: Some(DocshipConfig::default()),
                exists: file.is_file(),
                path: file.to_string_lossy().to_string(),
            },
            0,
        ));
    }

    let loaded = global.load_config()?;
    let (path, exists) = match loaded.path {
        Some(p) => (p.to_string_lossy().to_string(), true),
        None => (
            paths::config_file(&global.source_dir)
                .to_string_lossy()
                .to_string(),
            false,
        ),
    };

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(loaded.config),
            path,
            exists,
        },
        0,
    ))
}

fn path(global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    let file = match global.config.as_deref() {
        Some(explicit) => paths::resolve(explicit),
        None => paths::config_file(&global.source_dir),
    };

    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            config: None,
            exists: file.is_file(),
            path: file.to_string_lossy().to_string(),
        },
        0,
    ))
}
