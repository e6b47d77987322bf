use clap::Args;

use docship::paths;
use docship::publish::{self, PublishOutcome, Publisher};

use super::CmdResult;

#[derive(Args)]
pub struct PublishArgs {
    /// Artifact directory to publish (defaults to build.artifact_dir)
    #[arg(long, value_name = "DIR")]
    pub artifact_dir: Option<String>,

    /// Publish repository, overriding publish.repository
    #[arg(long)]
    pub repository: Option<String>,

    /// Publishing branch, overriding publish.branch
    #[arg(long)]
    pub branch: Option<String>,

    /// Source commit recorded in the commit message
    #[arg(long)]
    pub commit: Option<String>,
}

pub fn run(args: PublishArgs, global: &crate::commands::GlobalArgs) -> CmdResult<PublishOutcome> {
    let mut config = global.load_config()?.config;
    if let Some(repository) = args.repository {
        config.publish.repository = Some(repository);
    }
    if let Some(branch) = args.branch {
        config.publish.branch = branch;
        docship::config::validate(&config)?;
    }

    let artifact_dir = match args.artifact_dir.as_deref() {
        Some(dir) => paths::resolve(dir),
        None => paths::artifact_dir(&global.source_dir, &config),
    };

    let repository = publish::resolve_repository(
        &config.publish,
        std::env::var("GITHUB_REPOSITORY").ok(),
        &global.source_dir,
        &config.source.remote,
    )?;

    let outcome = Publisher::from_env(&config.publish, &repository)
        .publish(&artifact_dir, args.commit.as_deref())?;
    Ok((outcome, 0))
}
