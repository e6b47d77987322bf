use std::path::PathBuf;

use docship::config::LoadedConfig;

pub type CmdResult<T> = docship::Result<(T, i32)>;

/// Options shared by every command.
pub(crate) struct GlobalArgs {
    /// Source tree being documented
    pub source_dir: PathBuf,
    /// Explicit config file, overriding `<source>/docship.json`
    pub config: Option<String>,
}

impl GlobalArgs {
    pub fn load_config(&self) -> docship::Result<LoadedConfig> {
        docship::config::load(&self.source_dir, self.config.as_deref())
    }
}

pub mod build;
pub mod config;
pub mod provision;
pub mod publish;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (docship::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Build(args) => dispatch!(args, global, build),
        crate::Commands::Publish(args) => dispatch!(args, global, publish),
        crate::Commands::Provision(args) => dispatch!(args, global, provision),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
