use clap::Args;

use docship::provision::{self, ProvisionOutput};

use super::CmdResult;

#[derive(Args)]
pub struct ProvisionArgs {
    /// Tools to check instead of toolchain.tools
    #[arg(long = "tool", value_name = "TOOL")]
    pub tools: Vec<String>,
}

pub fn run(
    args: ProvisionArgs,
    global: &crate::commands::GlobalArgs,
) -> CmdResult<ProvisionOutput> {
    let mut toolchain = global.load_config()?.config.toolchain;
    if !args.tools.is_empty() {
        toolchain.tools = args.tools;
    }

    let output = provision::ensure(&toolchain)?;
    Ok((output, 0))
}
