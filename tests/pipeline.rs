#![cfg(not(windows))]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use docship::config::DocshipConfig;
use docship::git;
use docship::pipeline::{self, LocalStages, RunState, RunStatus, Stage};
use docship::trigger::TriggerEvent;
use tempfile::TempDir;

const DOC_SCRIPT: &str = "if grep -q BROKEN src/lib.rs; then echo 'error[E0308]: mismatched types' >&2; exit 101; fi; \
mkdir -p target/doc/demo_lib/shapes && cp src/lib.rs target/doc/demo_lib/index.html && \
echo '<html>shapes</html>' > target/doc/demo_lib/shapes/index.html && : > target/doc/.lock";

fn git_ok(dir: &Path, args: &[&str]) -> String {
    let out = git::git(dir, args);
    assert!(out.success, "git {:?}: {}", args, out.stderr);
    out.stdout.trim().to_string()
}

fn source_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    git_ok(dir.path(), &["init", "--quiet", "--initial-branch", "main"]);
    git_ok(dir.path(), &["config", "user.name", "Test"]);
    git_ok(dir.path(), &["config", "user.email", "test@example.com"]);
    git_ok(dir.path(), &["config", "commit.gpgsign", "false"]);

    fs::write(
        dir.path().join("Cargo.toml"),
        "[package]\nname = \"demo-lib\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    )
    .unwrap();
    fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/lib.rs"), "pub mod shapes {}\n").unwrap();
    dir
}

fn commit(dir: &Path, message: &str) -> String {
    git_ok(dir, &["add", "-A"]);
    git_ok(dir, &["commit", "--quiet", "-m", message]);
    git_ok(dir, &["rev-parse", "HEAD"])
}

fn bare_remote() -> TempDir {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_string_lossy().to_string();
    git_ok(dir.path(), &["init", "--quiet", "--bare", &path]);
    dir
}

fn config_for(remote: &Path) -> DocshipConfig {
    let mut config = DocshipConfig::default();
    config.toolchain.tools = vec!["git".to_string()];
    config.build.doc_command = DOC_SCRIPT.to_string();
    config.publish.repository = Some(remote.to_string_lossy().to_string());
    config.publish.token_env = "DOCSHIP_TEST_TOKEN_UNSET".to_string();
    config
}

fn stages(source: &Path, remote: &Path) -> LocalStages {
    LocalStages::new(source.to_path_buf(), config_for(remote))
}

fn branch_exists(remote: &Path, branch: &str) -> bool {
    git::git(remote, &["rev-parse", "--verify", &format!("refs/heads/{}", branch)]).success
}

fn branch_files(remote: &Path) -> Vec<String> {
    git_ok(remote, &["ls-tree", "-r", "--name-only", "refs/heads/gh-pages"])
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn push_to_main_publishes_artifact_as_branch_tree() {
    let source = source_repo();
    let head = commit(source.path(), "initial");
    let remote = bare_remote();

    let event = TriggerEvent::new("refs/heads/main", &head).unwrap();
    let run = pipeline::run(&event, "main", &stages(source.path(), remote.path()));

    assert_eq!(run.status, RunStatus::Success, "{:?}", run.failure);
    assert_eq!(run.state, RunState::Published);

    let artifact = run.artifact.as_ref().unwrap();
    assert!(artifact.contains("demo_lib/index.html"));
    assert!(artifact.contains("demo_lib/shapes/index.html"));
    assert!(!artifact.contains(".lock"));

    let outcome = run.publish.as_ref().unwrap();
    assert_eq!(branch_files(remote.path()), artifact.files);
    assert_eq!(
        git_ok(remote.path(), &["rev-parse", "refs/heads/gh-pages^{tree}"]),
        outcome.tree
    );
    let message = git_ok(remote.path(), &["log", "-1", "--format=%s", "gh-pages"]);
    assert!(message.contains(&head));
}

#[test]
fn compile_failure_stops_before_publish() {
    let source = source_repo();
    fs::write(source.path().join("src/lib.rs"), "pub fn f() -> u8 { \"BROKEN\" }\n").unwrap();
    let head = commit(source.path(), "broken");
    let remote = bare_remote();

    let event = TriggerEvent::new("main", &head).unwrap();
    let run = pipeline::run(&event, "main", &stages(source.path(), remote.path()));

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.failure.as_ref().unwrap().stage, Stage::Build);
    assert!(run.stages.iter().all(|s| s.stage != Stage::Publish));
    assert!(run.publish.is_none());
    assert!(!source.path().join("target/doc").exists());
    assert!(!branch_exists(remote.path(), "gh-pages"));

    let err = run.into_result().unwrap_err();
    assert_eq!(err.code.as_str(), "build.failed");
    assert!(err.details["outputTail"].as_str().unwrap().contains("E0308"));
}

#[test]
fn rejected_credentials_leave_published_content_untouched() {
    let source = source_repo();
    let first = commit(source.path(), "initial");
    let remote = bare_remote();

    let event = TriggerEvent::new("main", &first).unwrap();
    let published = pipeline::run(&event, "main", &stages(source.path(), remote.path()));
    assert_eq!(published.status, RunStatus::Success);
    let tip = git_ok(remote.path(), &["rev-parse", "refs/heads/gh-pages"]);

    let hook = remote.path().join("hooks/pre-receive");
    fs::write(
        &hook,
        "#!/bin/sh\necho 'remote: Invalid username or password.' >&2\nexit 1\n",
    )
    .unwrap();
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();

    fs::write(source.path().join("src/lib.rs"), "pub mod shapes {}\npub mod colors {}\n").unwrap();
    let second = commit(source.path(), "second");
    let event = TriggerEvent::new("main", &second).unwrap();
    let run = pipeline::run(&event, "main", &stages(source.path(), remote.path()));

    assert_eq!(run.state, RunState::Failed);
    let err = run.into_result().unwrap_err();
    assert_eq!(err.code.as_str(), "publish.auth_failed");
    assert_eq!(err.details["stage"], "publish");
    assert_eq!(git_ok(remote.path(), &["rev-parse", "refs/heads/gh-pages"]), tip);
}

#[test]
fn pushes_to_other_branches_are_ignored() {
    let source = source_repo();
    let head = commit(source.path(), "initial");
    let remote = bare_remote();

    let event = TriggerEvent::new("refs/heads/develop", &head).unwrap();
    let run = pipeline::run(&event, "main", &stages(source.path(), remote.path()));

    assert_eq!(run.status, RunStatus::Skipped);
    assert_eq!(run.history, vec![RunState::Idle]);
    assert!(run.stages.is_empty());
    assert!(!source.path().join("target/doc").exists());
    assert!(!branch_exists(remote.path(), "gh-pages"));
}

#[test]
fn unchanged_source_publishes_identical_tree() {
    let source = source_repo();
    let head = commit(source.path(), "initial");
    let remote = bare_remote();
    let event = TriggerEvent::new("main", &head).unwrap();

    let first = pipeline::run(&event, "main", &stages(source.path(), remote.path()));
    let second = pipeline::run(&event, "main", &stages(source.path(), remote.path()));

    assert_eq!(
        first.artifact.as_ref().unwrap().digest,
        second.artifact.as_ref().unwrap().digest
    );
    assert_eq!(
        first.publish.as_ref().unwrap().tree,
        second.publish.as_ref().unwrap().tree
    );
    assert_eq!(
        second.publish.as_ref().unwrap().parent.as_deref(),
        Some(first.publish.as_ref().unwrap().commit.as_str())
    );
}

#[test]
fn trigger_commit_is_checked_out_before_building() {
    let source = source_repo();
    let first = commit(source.path(), "initial");
    fs::write(source.path().join("src/lib.rs"), "pub mod shapes {}\n// later\n").unwrap();
    commit(source.path(), "later");
    let remote = bare_remote();

    let event = TriggerEvent::new("main", &first).unwrap();
    let run = pipeline::run(&event, "main", &stages(source.path(), remote.path()));
    assert_eq!(run.status, RunStatus::Success, "{:?}", run.failure);

    let page = git_ok(remote.path(), &["show", "gh-pages:demo_lib/index.html"]);
    assert!(!page.contains("later"));
}
