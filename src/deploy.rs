//! Deployment runner and fire-and-forget dispatch

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{RelayError, Result};
use crate::webhook::PushEvent;

/// Maximum amount of script output written to the log per stream (64KB)
pub const MAX_LOGGED_OUTPUT: usize = 64 * 1024;

/// What a finished deployment produced
#[derive(Debug, Clone)]
pub struct DeploymentOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl DeploymentOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs the actual deployment. Implementations must be safe to call from
/// several tasks at once.
#[async_trait]
pub trait DeploymentRunner: Send + Sync {
    async fn run(&self, event: &PushEvent) -> Result<DeploymentOutput>;
}

/// Executes a deployment script, exposing the push context as env variables
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    script: PathBuf,
}

impl ScriptRunner {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn script(&self) -> &PathBuf {
        &self.script
    }
}

#[async_trait]
impl DeploymentRunner for ScriptRunner {
    async fn run(&self, event: &PushEvent) -> Result<DeploymentOutput> {
        info!("Running deployment script: {}", self.script.display());

        let mut command = Command::new(&self.script);
        command
            .env("DEPLOY_BRANCH", &event.branch)
            .env("DEPLOY_REPOSITORY", &event.repository)
            .env("DEPLOY_COMMIT", event.commit_sha.as_deref().unwrap_or(""));

        let output = command.output().await.map_err(|e| {
            RelayError::DeploymentSpawnFailed(format!("{}: {}", self.script.display(), e))
        })?;

        Ok(DeploymentOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A single dispatched deployment, used for log correlation
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub id: Uuid,
    pub event: PushEvent,
    pub started_at: DateTime<Utc>,
}

impl Deployment {
    pub fn new(event: PushEvent) -> Self {
        Self {
            id: Uuid::now_v7(),
            event,
            started_at: Utc::now(),
        }
    }

    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

/// How a dispatched deployment ended, as recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentOutcome {
    Succeeded,
    Failed,
    NotStarted,
}

/// Hands the deployment to a detached task. The result is only logged;
/// callers are free to drop the handle.
pub fn dispatch(
    runner: Arc<dyn DeploymentRunner>,
    event: PushEvent,
) -> JoinHandle<DeploymentOutcome> {
    let deployment = Deployment::new(event);
    info!(
        "Deployment {} queued for '{}' branch '{}'",
        deployment.id, deployment.event.repository, deployment.event.branch
    );
    match serde_json::to_string(&deployment) {
        Ok(record) => debug!("Deployment record: {}", record),
        Err(e) => debug!("Could not serialize deployment {}: {}", deployment.id, e),
    }

    tokio::spawn(async move {
        info!("Deployment {} - starting deployment process", deployment.id);
        let result = runner.run(&deployment.event).await;
        report(&deployment, result)
    })
}

fn report(deployment: &Deployment, result: Result<DeploymentOutput>) -> DeploymentOutcome {
    let elapsed_ms = deployment.elapsed_ms();
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            error!("Deployment {} error: {}", deployment.id, e);
            return DeploymentOutcome::NotStarted;
        }
    };

    if !output.stderr.is_empty() {
        warn!(
            "Deployment {} stderr:\n{}",
            deployment.id,
            truncate_output(&output.stderr)
        );
    }

    if output.success() {
        info!(
            "Deployment {} completed successfully in {}ms:\n{}",
            deployment.id,
            elapsed_ms,
            truncate_output(&output.stdout)
        );
        DeploymentOutcome::Succeeded
    } else {
        error!(
            "Deployment {} failed after {}ms with {}",
            deployment.id, elapsed_ms, output.status
        );
        DeploymentOutcome::Failed
    }
}

/// Cuts output down to MAX_LOGGED_OUTPUT bytes on a char boundary
fn truncate_output(output: &str) -> std::borrow::Cow<'_, str> {
    if output.len() <= MAX_LOGGED_OUTPUT {
        return output.into();
    }
    let mut end = MAX_LOGGED_OUTPUT;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... (output truncated)", &output[..end]).into()
}
