//! Shared helpers for router level tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use deploy_hook::deploy::{DeploymentOutput, DeploymentRunner};
use deploy_hook::error::{RelayError, Result};
use deploy_hook::signature::{WebhookSecret, sign};
use deploy_hook::webhook::{BranchFilter, PushEvent};
use deploy_hook::{AppState, RelayConfig, create_router};
use tokio::sync::mpsc;

pub const SECRET: &str = "test-webhook-secret";

/// Runner that reports every invocation on a channel instead of spawning anything.
pub struct RecordingRunner {
    calls: mpsc::UnboundedSender<PushEvent>,
}

#[async_trait]
impl DeploymentRunner for RecordingRunner {
    async fn run(&self, event: &PushEvent) -> Result<DeploymentOutput> {
        let _ = self.calls.send(event.clone());
        Ok(DeploymentOutput {
            status: exit_success(),
            stdout: "deployed".to_string(),
            stderr: String::new(),
        })
    }
}

/// How a `FailingRunner` fails
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// The deployment process cannot be started at all
    Spawn,
    /// The process runs but exits non-zero and writes to stderr
    NonZeroExit,
}

/// Runner that records invocations like `RecordingRunner` but never succeeds.
pub struct FailingRunner {
    failure: Failure,
    calls: mpsc::UnboundedSender<PushEvent>,
}

#[async_trait]
impl DeploymentRunner for FailingRunner {
    async fn run(&self, event: &PushEvent) -> Result<DeploymentOutput> {
        let _ = self.calls.send(event.clone());
        match self.failure {
            Failure::Spawn => Err(RelayError::DeploymentSpawnFailed(
                "/nonexistent/deploy.sh: No such file or directory".to_string(),
            )),
            Failure::NonZeroExit => Ok(DeploymentOutput {
                status: exit_failure(),
                stdout: String::new(),
                stderr: "rsync: connection refused".to_string(),
            }),
        }
    }
}

#[cfg(unix)]
fn exit_success() -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(0)
}

#[cfg(unix)]
fn exit_failure() -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    // wait status for exit code 1
    std::process::ExitStatus::from_raw(1 << 8)
}

#[cfg(windows)]
fn exit_success() -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(0)
}

#[cfg(windows)]
fn exit_failure() -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(1)
}

pub struct TestApp {
    pub router: Router,
    pub calls: mpsc::UnboundedReceiver<PushEvent>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_branches(BranchFilter::default())
    }

    pub fn with_branches(deploy_branches: BranchFilter) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self::build(deploy_branches, Arc::new(RecordingRunner { calls: tx }), rx)
    }

    pub fn failing(failure: Failure) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = FailingRunner { failure, calls: tx };
        Self::build(BranchFilter::default(), Arc::new(runner), rx)
    }

    fn build(
        deploy_branches: BranchFilter,
        runner: Arc<dyn DeploymentRunner>,
        calls: mpsc::UnboundedReceiver<PushEvent>,
    ) -> Self {
        let config = RelayConfig {
            bind_host: "127.0.0.1".to_string(),
            port: 0,
            webhook_secret: WebhookSecret::new(SECRET),
            deploy_script: PathBuf::from("/nonexistent/deploy.sh"),
            deploy_branches,
        };
        let state = Arc::new(AppState::new(config, runner));
        Self {
            router: create_router(state),
            calls,
        }
    }

    /// Waits for the next runner invocation
    pub async fn next_call(&mut self) -> Option<PushEvent> {
        tokio::time::timeout(Duration::from_secs(5), self.calls.recv())
            .await
            .ok()
            .flatten()
    }

    /// Gives detached tasks a chance to run, then drains recorded calls
    pub async fn settle_calls(&mut self) -> Vec<PushEvent> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut calls = Vec::new();
        while let Ok(event) = self.calls.try_recv() {
            calls.push(event);
        }
        calls
    }
}

pub fn push_payload(reference: &str) -> String {
    serde_json::json!({
        "ref": reference,
        "after": "6113728f27ae82c7b1a177c8d03f9e96e0adf246",
        "repository": { "name": "site", "full_name": "octo/site" },
        "pusher": { "name": "octocat" }
    })
    .to_string()
}

pub fn signed_request(event: &str, body: &str) -> Request<Body> {
    let signature = sign(body.as_bytes(), &WebhookSecret::new(SECRET));
    webhook_request(event, Some(&signature), body)
}

pub fn webhook_request(event: &str, signature: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("X-GitHub-Event", event);
    if let Some(signature) = signature {
        builder = builder.header("X-Hub-Signature-256", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body should be utf-8")
}
