use clap::Args;

use docship::build::{self, BuildOutput};

use super::CmdResult;

#[derive(Args)]
pub struct BuildArgs {
    /// Override the configured doc command
    #[arg(long)]
    pub doc_command: Option<String>,
}

pub fn run(args: BuildArgs, global: &crate::commands::GlobalArgs) -> CmdResult<BuildOutput> {
    let mut config = global.load_config()?.config;
    if let Some(command) = args.doc_command {
        config.build.doc_command = command;
        docship::config::validate(&config)?;
    }

    let output = build::run(&global.source_dir, &config)?;
    Ok((output, 0))
}
