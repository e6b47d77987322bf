use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::command::{self, CommandOutput};

/// Run git in `dir`, capturing output without failing.
pub fn git(dir: &Path, args: &[&str]) -> CommandOutput {
    command::capture("git", args, Some(dir), &[])
}

/// Run git in `dir` with extra environment variables.
pub fn git_with_env(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> CommandOutput {
    command::capture("git", args, Some(dir), env)
}

/// Run git in `dir` and return trimmed stdout, or a git error.
pub fn git_stdout(dir: &Path, args: &[&str], context: &str) -> Result<String> {
    let out = git(dir, args);
    if !out.success {
        return Err(Error::git_command_failed(format!(
            "{} failed: {}",
            context,
            out.error_text()
        )));
    }
    Ok(out.stdout.trim().to_string())
}

/// Clone a git repository to a target directory.
pub fn clone_repo(url: &str, target_dir: &Path) -> Result<()> {
    let target = target_dir.to_string_lossy();
    let out = command::capture("git", &["clone", "--quiet", url, &target], None, &[]);
    if !out.success {
        return Err(Error::git_command_failed(format!(
            "git clone failed: {}",
            out.error_text()
        )));
    }
    Ok(())
}

pub fn is_git_repo(path: &Path) -> bool {
    git(path, &["rev-parse", "--git-dir"]).success
}

pub fn head_commit(path: &Path) -> Result<String> {
    git_stdout(path, &["rev-parse", "HEAD"], "git rev-parse HEAD")
}

/// URL configured for a remote, if any.
pub fn remote_url(path: &Path, remote: &str) -> Option<String> {
    command::run_in_optional(path, "git", &["remote", "get-url", remote])
}

/// Fetch a single commit from a remote and check it out detached.
pub fn fetch_and_checkout(path: &Path, remote: &str, commit: &str) -> Result<()> {
    // Commits already present locally need no fetch
    if !git(path, &["cat-file", "-e", &format!("{}^{{commit}}", commit)]).success {
        git_stdout(
            path,
            &["fetch", "--no-tags", "--depth", "1", remote, commit],
            "git fetch",
        )?;
    }
    git_stdout(
        path,
        &["checkout", "--quiet", "--detach", commit],
        "git checkout",
    )?;
    Ok(())
}
