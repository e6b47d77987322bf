use clap::Args;
use std::path::Path;

use docship::pipeline::{self, LocalStages, PipelineRun};
use docship::trigger::TriggerEvent;

use super::CmdResult;

#[derive(Args)]
pub struct RunArgs {
    /// Branch that was pushed (e.g. main or refs/heads/main)
    #[arg(long, requires = "commit")]
    pub branch: Option<String>,

    /// Commit id the push points at
    #[arg(long, requires = "branch")]
    pub commit: Option<String>,

    /// GitHub push event payload (defaults to GITHUB_REF/GITHUB_SHA when no
    /// branch, commit or event is given)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["branch", "commit"])]
    pub event: Option<String>,

    /// Publish repository, overriding publish.repository
    #[arg(long)]
    pub repository: Option<String>,
}

pub fn run(args: RunArgs, global: &crate::commands::GlobalArgs) -> CmdResult<PipelineRun> {
    let event = trigger_event(&args)?;
    let mut config = global.load_config()?.config;
    if let Some(repository) = args.repository {
        config.publish.repository = Some(repository);
    }

    let tracked = config.trigger.branch.clone();
    let stages = LocalStages::new(global.source_dir.clone(), config);
    let run = pipeline::run(&event, &tracked, &stages).into_result()?;
    Ok((run, 0))
}

fn trigger_event(args: &RunArgs) -> docship::Result<TriggerEvent> {
    if let Some(path) = &args.event {
        return TriggerEvent::from_event_file(Path::new(path));
    }
    match (&args.branch, &args.commit) {
        (Some(branch), Some(commit)) => TriggerEvent::new(branch, commit),
        _ => TriggerEvent::from_env(),
    }
}
