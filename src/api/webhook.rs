//! Webhook handler for GitHub push events

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use crate::SharedState;
use crate::deploy::dispatch;
use crate::signature::verify;
use crate::webhook::{Decision, IgnoreReason, PUSH_EVENT, PushEvent, UNKNOWN, route};

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Handles the GitHub webhook POST request.
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what was sent, before any JSON parsing.
///
/// A dispatched deployment is handed to a detached task before the `202`
/// is returned, so the script may start before the client has read the
/// response. Its outcome is only logged and cannot alter the acknowledgement.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !verify(&body, signature, &state.config.webhook_secret) {
        error!("Invalid signature or missing signature header");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN);

    let event = if event_type == PUSH_EVENT {
        match PushEvent::from_push_payload(&body) {
            Ok(event) => event,
            Err(e) => {
                warn!("Could not parse push payload: {}", e);
                return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
            }
        }
    } else {
        PushEvent::minimal(event_type)
    };

    match route(&event, &state.config.deploy_branches) {
        Decision::Ignore(IgnoreReason::Event(event_type)) => {
            info!("Received {} event, ignoring", event_type);
            (StatusCode::OK, format!("Ignoring {} event", event_type)).into_response()
        }
        Decision::Ignore(IgnoreReason::Branch(branch)) => {
            info!(
                "Push to branch '{}' of {} is not configured for deployment, ignoring",
                branch, event.repository
            );
            (StatusCode::OK, format!("Ignoring push to {}", branch)).into_response()
        }
        Decision::Dispatch => {
            info!(
                "Push event received for {} on branch {}",
                event.repository, event.branch
            );
            debug!(
                "Commit {:?} pushed by {:?}",
                event.commit_sha, event.pusher_name
            );

            // Detached; the response below does not wait for it
            let _ = dispatch(state.runner.clone(), event);

            (StatusCode::ACCEPTED, "Deployment queued").into_response()
        }
    }
}
