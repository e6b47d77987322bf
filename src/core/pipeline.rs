//! Pipeline controller: provision, acquire, build and publish, in that order.
//!
//! Each trigger gets a fresh [`RunMachine`]. The first failing stage moves the
//! machine to `Failed` and nothing after it runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::build::{self, BuildOutput};
use crate::config::DocshipConfig;
use crate::error::{Error, Result};
use crate::provision::{self, ProvisionOutput};
use crate::publish::{self, PublishOutcome, Publisher};
use crate::source::{self, SourceOutput};
use crate::trigger::TriggerEvent;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Provisioning,
    SourceReady,
    Built,
    Published,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Provisioning => "provisioning",
            RunState::SourceReady => "source_ready",
            RunState::Built => "built",
            RunState::Published => "published",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Published | RunState::Failed)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Provisioning)
                | (Provisioning, SourceReady)
                | (SourceReady, Built)
                | (Built, Published)
                | (Provisioning, Failed)
                | (SourceReady, Failed)
                | (Built, Failed)
        )
    }
}

/// Current state plus every state visited, starting at `Idle`.
#[derive(Debug, Clone)]
pub struct RunMachine {
    state: RunState,
    history: Vec<RunState>,
}

impl Default for RunMachine {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }
}

impl RunMachine {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::internal_unexpected(format!(
                "Illegal pipeline transition {} -> {}",
                self.state.as_str(),
                next.as_str()
            )));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Provision,
    Source,
    Build,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Provision => "provision",
            Stage::Source => "source",
            Stage::Build => "build",
            Stage::Publish => "publish",
        }
    }

    /// State reached when this stage succeeds.
    fn completes(&self) -> RunState {
        match self {
            Stage::Provision => RunState::Provisioning,
            Stage::Source => RunState::SourceReady,
            Stage::Build => RunState::Built,
            Stage::Publish => RunState::Published,
        }
    }
}

/// The four pipeline stages. `LocalStages` runs them for real; tests swap in
/// scripted implementations.
pub trait PipelineStages {
    fn provision(&self) -> Result<ProvisionOutput>;
    fn acquire(&self, event: &TriggerEvent) -> Result<SourceOutput>;
    fn build(&self, source: &SourceOutput) -> Result<BuildOutput>;
    fn publish(&self, artifact: &Artifact, event: &TriggerEvent) -> Result<PublishOutcome>;
}

/// Stages backed by the local toolchain, a git checkout and a git remote.
pub struct LocalStages {
    pub source_dir: PathBuf,
    pub config: DocshipConfig,
}

impl LocalStages {
    pub fn new(source_dir: PathBuf, config: DocshipConfig) -> Self {
        Self { source_dir, config }
    }
}

impl PipelineStages for LocalStages {
    fn provision(&self) -> Result<ProvisionOutput> {
        provision::ensure(&self.config.toolchain)
    }

    fn acquire(&self, event: &TriggerEvent) -> Result<SourceOutput> {
        source::acquire(&self.source_dir, Some(&event.commit), &self.config.source)
    }

    fn build(&self, source: &SourceOutput) -> Result<BuildOutput> {
        build::build_docs(
            &source.path,
            &source.manifest,
            &self.config.build,
            &crate::paths::artifact_dir(&source.path, &self.config),
        )
    }

    fn publish(&self, artifact: &Artifact, event: &TriggerEvent) -> Result<PublishOutcome> {
        let repository = publish::resolve_repository(
            &self.config.publish,
            std::env::var("GITHUB_REPOSITORY").ok(),
            &self.source_dir,
            &self.config.source.remote,
        )?;
        Publisher::from_env(&self.config.publish, &repository)
            .publish(&artifact.root, Some(&event.commit))
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub stage: Stage,
    pub status: RunStatus,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub stage: Stage,
    pub code: String,
    pub message: String,
}

/// Record of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub event: TriggerEvent,
    pub tracked_branch: String,
    pub status: RunStatus,
    pub state: RunState,
    pub history: Vec<RunState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    #[serde(skip)]
    error: Option<Error>,
}

impl PipelineRun {
    fn new(event: &TriggerEvent, tracked_branch: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            event: event.clone(),
            tracked_branch: tracked_branch.to_string(),
            status: RunStatus::Skipped,
            state: RunState::Idle,
            history: vec![RunState::Idle],
            stages: Vec::new(),
            artifact: None,
            publish: None,
            failure: None,
            error: None,
        }
    }

    /// The run itself on success or skip; the failing stage's error,
    /// annotated with where the run stopped, otherwise.
    pub fn into_result(self) -> Result<PipelineRun> {
        let Some(err) = self.error.clone() else {
            return Ok(self);
        };
        let stage = self.failure.as_ref().map(|f| f.stage.as_str()).unwrap_or_default();
        let history: Vec<&str> = self.history.iter().map(|s| s.as_str()).collect();
        Err(err
            .with_detail("stage", stage)
            .with_detail("state", self.state.as_str())
            .with_detail("history", history)
            .with_detail("runId", self.run_id.to_string())
            .with_detail("commit", self.event.commit.as_str()))
    }
}

/// Drive one trigger event through every stage.
pub fn run(event: &TriggerEvent, tracked_branch: &str, stages: &dyn PipelineStages) -> PipelineRun {
    let mut record = PipelineRun::new(event, tracked_branch);

    if !event.matches(tracked_branch) {
        log_status!(
            "pipeline",
            "Ignoring push to '{}' (tracking '{}')",
            event.branch,
            tracked_branch
        );
        return record;
    }

    log_status!(
        "pipeline",
        "Run {} for {} at {}",
        record.run_id,
        event.branch,
        event.short_commit()
    );

    let mut machine = RunMachine::default();
    let outcome = drive(&mut machine, &mut record, event, stages);
    record.state = machine.state();
    record.history = machine.history().to_vec();

    match outcome {
        Ok(()) => {
            record.status = RunStatus::Success;
            log_status!(
                "pipeline",
                "Published {} to {}",
                event.short_commit(),
                record_branch(&record)
            );
        }
        Err((stage, err)) => {
            log_status!(stage.as_str(), "failed: {}", err.message);
            record.status = RunStatus::Failed;
            record.failure = Some(RunFailure {
                stage,
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
            });
            record.error = Some(err);
        }
    }

    record
}

fn record_branch(record: &PipelineRun) -> &str {
    record.publish.as_ref().map(|p| p.branch.as_str()).unwrap_or_default()
}

fn drive(
    machine: &mut RunMachine,
    record: &mut PipelineRun,
    event: &TriggerEvent,
    stages: &dyn PipelineStages,
) -> std::result::Result<(), (Stage, Error)> {
    enter(machine, RunState::Provisioning, Stage::Provision)?;
    timed(machine, record, Stage::Provision, || stages.provision(), false)?;

    let source = timed(machine, record, Stage::Source, || stages.acquire(event), true)?;
    let built = timed(machine, record, Stage::Build, || stages.build(&source), true)?;
    record.artifact = Some(built.artifact.clone());

    let outcome = timed(
        machine,
        record,
        Stage::Publish,
        || stages.publish(&built.artifact, event),
        true,
    )?;
    record.publish = Some(outcome);
    Ok(())
}

fn enter(
    machine: &mut RunMachine,
    state: RunState,
    stage: Stage,
) -> std::result::Result<(), (Stage, Error)> {
    machine.transition(state).map_err(|e| (stage, e))
}

/// Run one stage, record its result, and advance or fail the machine.
fn timed<T: Serialize>(
    machine: &mut RunMachine,
    record: &mut PipelineRun,
    stage: Stage,
    body: impl FnOnce() -> Result<T>,
    advance: bool,
) -> std::result::Result<T, (Stage, Error)> {
    let started = Instant::now();
    let result = body();
    let duration_ms = started.elapsed().as_millis();

    match result {
        Ok(value) => {
            record.stages.push(StageResult {
                stage,
                status: RunStatus::Success,
                duration_ms,
                data: serde_json::to_value(&value).ok(),
            });
            if advance {
                enter(machine, stage.completes(), stage)?;
            }
            Ok(value)
        }
        Err(err) => {
            record.stages.push(StageResult {
                stage,
                status: RunStatus::Failed,
                duration_ms,
                data: None,
            });
            enter(machine, RunState::Failed, stage)?;
            Err((stage, err))
        }
    }
}
