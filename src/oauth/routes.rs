//! Local landing endpoints for the provider redirect.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::mpsc;

use super::accounts::Candidate;
use super::callback::CallbackContext;
use super::controller::{FlowOutcome, Navigation, Notice, OAuthFlowController};
use super::state::FlowState;

/// Shared state for callback routes.
#[derive(Clone)]
pub struct CallbackRouteState {
    pub controller: Arc<OAuthFlowController>,
    /// Receives every resolved callback, e.g. so a CLI can stop waiting.
    pub events: Option<mpsc::Sender<FlowOutcome>>,
}

#[derive(Debug, Serialize)]
struct CallbackResponse {
    state: FlowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_after_secs: Option<u64>,
    candidates: Vec<Candidate>,
}

impl From<&FlowOutcome> for CallbackResponse {
    fn from(outcome: &FlowOutcome) -> Self {
        let (redirect, redirect_after_secs) = match &outcome.navigation {
            Some(Navigation::Internal { path, delay }) => (Some(path.clone()), Some(delay.as_secs())),
            Some(Navigation::External(url)) => (Some(url.to_string()), Some(0)),
            None => (None, None),
        };
        Self {
            state: outcome.snapshot.state,
            notice: outcome.notice.clone(),
            redirect,
            redirect_after_secs,
            candidates: outcome.snapshot.candidates.clone(),
        }
    }
}

/// GET /oauth/google/callback
///
/// Resolves the provider return. Answers 202 while the session is still
/// loading so the page can retry.
async fn google_callback(
    State(state): State<CallbackRouteState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let ctx = CallbackContext::from_map(&params);
    let outcome = state.controller.resolve_callback(&ctx).await;

    let status = if outcome.snapshot.state == FlowState::AwaitingCallback {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    let body = CallbackResponse::from(&outcome);

    // Only settled outcomes; a duplicate hit mid-listing reports progress.
    let settled = outcome.snapshot.state == FlowState::Selecting
        || outcome.snapshot.state.is_terminal();
    if settled
        && let Some(tx) = &state.events
        && tx.send(outcome).await.is_err()
    {
        tracing::debug!("Callback listener has no subscriber");
    }

    (status, Json(body))
}

/// GET /oauth/status
///
/// Returns the current flow snapshot.
async fn get_status(State(state): State<CallbackRouteState>) -> impl IntoResponse {
    Json(state.controller.snapshot().await)
}

/// Build the callback landing routes.
pub fn callback_routes(state: CallbackRouteState) -> Router {
    Router::new()
        .route("/oauth/google/callback", get(google_callback))
        .route("/oauth/status", get(get_status))
        .with_state(state)
}
