//! Webhook related structures and event routing

use serde::Serialize;
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Event type GitHub sends for branch and tag pushes
pub const PUSH_EVENT: &str = "push";
/// Prefix stripped from `ref` to obtain the branch name
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";
/// Placeholder for missing event types and repository names
pub const UNKNOWN: &str = "unknown";

/// Data extracted from a verified webhook delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushEvent {
    pub event_type: String,
    pub branch: String,
    pub repository: String,
    pub commit_sha: Option<String>,
    pub pusher_name: Option<String>,
}

impl PushEvent {
    /// Event that carries no payload, e.g. any non-push delivery
    pub fn minimal(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            branch: String::new(),
            repository: UNKNOWN.to_string(),
            commit_sha: None,
            pusher_name: None,
        }
    }

    /// Parses a push payload. Requires a string `ref`; everything else is optional.
    pub fn from_push_payload(body: &[u8]) -> Result<Self> {
        let payload: Value = serde_json::from_slice(body)?;

        let branch_ref = payload
            .get("ref")
            .and_then(|r| r.as_str())
            .ok_or_else(|| RelayError::PayloadError("missing 'ref' field".to_string()))?;
        let branch = branch_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .unwrap_or(branch_ref);

        let repository = payload
            .get("repository")
            .and_then(|r| r.get("full_name"))
            .and_then(|n| n.as_str())
            .unwrap_or(UNKNOWN);

        Ok(Self {
            event_type: PUSH_EVENT.to_string(),
            branch: branch.to_string(),
            repository: repository.to_string(),
            commit_sha: payload
                .get("after")
                .and_then(|v| v.as_str())
                .map(String::from),
            pusher_name: payload
                .get("pusher")
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    }

    pub fn is_push(&self) -> bool {
        self.event_type == PUSH_EVENT
    }
}

/// Which branches may trigger a deployment. Empty means all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchFilter {
    branches: Vec<String>,
}

impl BranchFilter {
    pub fn new(branches: Vec<String>) -> Self {
        Self { branches }
    }

    /// Parses a comma separated list, ignoring blanks
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn allows(&self, branch: &str) -> bool {
        self.branches.is_empty() || self.branches.iter().any(|b| b == branch)
    }

    pub fn branches(&self) -> &[String] {
        &self.branches
    }
}

/// Why a delivery did not lead to a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not a push; carries the event type
    Event(String),
    /// Push to a branch outside the allow-list
    Branch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Ignore(IgnoreReason),
    Dispatch,
}

/// Decides whether an event should trigger a deployment.
pub fn route(event: &PushEvent, filter: &BranchFilter) -> Decision {
    if !event.is_push() {
        return Decision::Ignore(IgnoreReason::Event(event.event_type.clone()));
    }
    if !filter.allows(&event.branch) {
        return Decision::Ignore(IgnoreReason::Branch(event.branch.clone()));
    }
    Decision::Dispatch
}
