//! Toolchain provisioning: make sure the doc generator can run.

use serde::Serialize;

use crate::config::ToolchainConfig;
use crate::error::{Error, Result};
use crate::utils::command;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolVersion {
    pub tool: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionOutput {
    pub tools: Vec<ToolVersion>,
    pub installed: bool,
}

/// Check every configured tool, installing once if any is missing.
pub fn ensure(config: &ToolchainConfig) -> Result<ProvisionOutput> {
    if config.tools.is_empty() {
        return Ok(ProvisionOutput {
            tools: Vec::new(),
            installed: false,
        });
    }

    let missing = missing_tools(&config.tools);
    if missing.is_empty() {
        return Ok(ProvisionOutput {
            tools: detect_all(&config.tools)?,
            installed: false,
        });
    }

    let Some(install) = config.install_command.as_deref() else {
        return Err(Error::provision_failed(
            missing.join(", "),
            "not found on PATH and no install_command configured",
        ));
    };

    log_status!("provision", "Missing {}; running: {}", missing.join(", "), install);
    let out = command::capture_shell(install, None, &[]);
    if !out.success {
        return Err(Error::provision_failed(
            missing.join(", "),
            format!(
                "install command exited with {}: {}",
                out.exit_code,
                command::tail_lines(out.error_text(), 15)
            ),
        ));
    }

    Ok(ProvisionOutput {
        tools: detect_all(&config.tools)?,
        installed: true,
    })
}

fn missing_tools(tools: &[String]) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| detect(tool).is_none())
        .cloned()
        .collect()
}

fn detect_all(tools: &[String]) -> Result<Vec<ToolVersion>> {
    tools
        .iter()
        .map(|tool| {
            detect(tool).ok_or_else(|| {
                Error::provision_failed(tool.clone(), "still unavailable after install")
            })
        })
        .collect()
}

/// First line of `<tool> --version`, if the tool runs.
pub fn detect(tool: &str) -> Option<ToolVersion> {
    let version = command::run(tool, &["--version"], tool).ok()?;
    let first = version.lines().next().unwrap_or_default().trim().to_string();
    Some(ToolVersion {
        tool: tool.to_string(),
        version: first,
    })
}
