use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{build, config, provision, publish, run};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "docship")]
#[command(version = VERSION)]
#[command(about = "Build rustdoc output on push and publish it to a hosting branch")]
struct Cli {
    /// Source tree to document
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    source: String,

    /// Config file (defaults to <source>/docship.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for a push event
    Run(run::RunArgs),
    /// Build documentation only
    Build(build::BuildArgs),
    /// Publish an existing artifact directory
    Publish(publish::PublishArgs),
    /// Check (and install) the documentation toolchain
    Provision(provision::ProvisionArgs),
    /// Inspect configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        source_dir: docship::paths::resolve(&cli.source),
        config: cli.config,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
