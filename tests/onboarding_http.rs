//! Integration tests against a mock onboarding backend.
//!
//! Each test spins up an Axum server on a random port that mimics the
//! backend's REST contract, then drives the real reqwest-backed client and
//! the flow components through it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::timeout;

use location_onboarding::api::{HttpBackend, OnboardingBackend};
use location_onboarding::auth::{StaticTokenProvider, TokenProvider};
use location_onboarding::config::ClientConfig;
use location_onboarding::connections::{ConnectionRegistry, Provider};
use location_onboarding::draft::{DraftSynchronizer, FileDraftStore, OnboardingFields};
use location_onboarding::error::{ApiError, FlowError};
use location_onboarding::oauth::{CallbackContext, FlowState, OAuthFlowController};
use location_onboarding::wizard::{Advance, WizardStateMachine, WizardStep};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN: &str = "test-token";
const LOCATION: &str = "30eec932-b6e1-4717-a6a6-ab790e3d286d";

// ── Mock backend ─────────────────────────────────────────────────────

#[derive(Default)]
struct MockState {
    caller_location: Option<String>,
    locations: HashMap<String, Value>,
    granted: HashSet<String>,
    accounts: Option<Value>,
    create_calls: usize,
    accounts_calls: usize,
    patch_calls: usize,
    patch_delay: Option<Duration>,
}

type Shared = Arc<Mutex<MockState>>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, detail: Value) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": detail })))
}

fn authorize(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(v) if v == expected => Ok(()),
        _ => Err(reject(StatusCode::UNAUTHORIZED, json!("Not authenticated"))),
    }
}

async fn create_location(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    authorize(&headers)?;
    if body.get("zipCode").and_then(Value::as_str).unwrap_or("").is_empty() {
        return Err(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!([{"loc": ["body", "zipCode"], "msg": "field required", "type": "missing"}]),
        ));
    }
    let mut s = state.lock().unwrap();
    s.create_calls += 1;
    let id = s
        .caller_location
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    s.caller_location = Some(id.clone());
    s.locations.insert(id.clone(), body);
    Ok(Json(json!({
        "success": true,
        "location_id": id,
        "message": "Draft location created"
    })))
}

async fn submit(State(state): State<Shared>, headers: HeaderMap, Json(_body): Json<Value>) -> Reply {
    authorize(&headers)?;
    let s = state.lock().unwrap();
    let Some(location_id) = s.caller_location.clone() else {
        return Err(reject(StatusCode::BAD_REQUEST, json!("No draft location")));
    };
    Ok(Json(json!({
        "success": true,
        "message": "Onboarding completed successfully!",
        "user_id": uuid::Uuid::new_v4().to_string(),
        "location_id": location_id,
        "next_steps": ["Check your email for next steps"]
    })))
}

async fn my_location(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    authorize(&headers)?;
    let s = state.lock().unwrap();
    let body = match &s.caller_location {
        Some(id) => json!({
            "id": id,
            "business_name": s.locations.get(id)
                .and_then(|l| l.get("businessName")).cloned().unwrap_or(json!(""))
        }),
        None => Value::Null,
    };
    Ok(Json(body))
}

async fn location(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    authorize(&headers)?;
    if id == "unavailable" {
        return Err(reject(StatusCode::SERVICE_UNAVAILABLE, json!("maintenance")));
    }
    let s = state.lock().unwrap();
    let Some(loc) = s.locations.get(&id) else {
        return Err(reject(StatusCode::NOT_FOUND, json!("Location not found")));
    };
    Ok(Json(json!({
        "id": id,
        "business_name": loc.get("businessName"),
        "city": loc.get("city"),
        "state": loc.get("state"),
        "gbp_location_name": loc.get("gbp_location_name"),
    })))
}

async fn save_gbp_location(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    authorize(&headers)?;
    let delay = {
        let mut s = state.lock().unwrap();
        s.patch_calls += 1;
        s.patch_delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let Some(name) = body.get("gbp_location_name").and_then(Value::as_str) else {
        return Err(reject(StatusCode::UNPROCESSABLE_ENTITY, json!("gbp_location_name required")));
    };
    let mut s = state.lock().unwrap();
    let Some(loc) = s.locations.get_mut(&id) else {
        return Err(reject(StatusCode::NOT_FOUND, json!("Location not found")));
    };
    loc["gbp_location_name"] = json!(name);
    Ok(Json(json!({
        "message": "GBP location saved successfully",
        "location_id": id,
        "gbp_location_name": name
    })))
}

async fn google_accounts(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    authorize(&headers)?;
    let mut s = state.lock().unwrap();
    s.accounts_calls += 1;
    if !s.granted.contains(&id) {
        return Err(reject(StatusCode::NOT_FOUND, json!("Google not connected for this location")));
    }
    Ok(Json(
        s.accounts
            .clone()
            .unwrap_or_else(|| json!({"accounts": [], "total_accounts": 0})),
    ))
}

async fn google_status(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    authorize(&headers)?;
    let s = state.lock().unwrap();
    let connected = s.granted.contains(&id);
    Ok(Json(json!({
        "connected": connected,
        "location_id": id,
        "email": if connected { json!("owner@tonyspizzeria.com") } else { Value::Null },
        "accounts_count": if connected { json!(1) } else { Value::Null },
    })))
}

async fn google_disconnect(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    authorize(&headers)?;
    let mut s = state.lock().unwrap();
    if !s.granted.remove(&id) {
        return Err(reject(StatusCode::NOT_FOUND, json!("No Google connection found")));
    }
    Ok(Json(json!({"message": "Google account disconnected successfully"})))
}

async fn connections_status(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    authorize(&headers)?;
    let s = state.lock().unwrap();
    let Some(id) = s.caller_location.clone() else {
        return Err(reject(StatusCode::NOT_FOUND, json!("No location found for user")));
    };
    let google = s.granted.contains(&id);
    let entry = |provider: &str, connected: bool| {
        json!({
            "provider": provider,
            "connected": connected,
            "connected_at": if connected { json!("2025-11-20T12:00:00") } else { Value::Null },
            "needs_reconnection": false
        })
    };
    Ok(Json(json!({
        "location_id": id,
        "google_business_profile": entry("google", google),
        "google_search_console": entry("google", google),
        "google_analytics": entry("google", google),
        "wordpress": entry("wordpress", false),
        "meta": entry("meta", false),
        "linkedin": entry("linkedin", false),
    })))
}

fn mock_routes(state: Shared) -> Router {
    Router::new()
        .route("/api/onboarding/create-location", post(create_location))
        .route("/api/onboarding/submit", post(submit))
        .route("/api/locations/me", get(my_location))
        .route("/api/locations/{id}", get(location))
        .route("/api/locations/{id}/gbp-location", patch(save_gbp_location))
        .route("/api/oauth/google/accounts/{id}", get(google_accounts))
        .route("/api/oauth/google/status/{id}", get(google_status))
        .route("/api/oauth/google/disconnect/{id}", post(google_disconnect))
        .route("/api/oauth/connections/status", get(connections_status))
        .with_state(state)
}

/// Start the mock backend on a random port.
async fn start_backend() -> (ClientConfig, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockState::default()));
    let app = mock_routes(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig::from_lookup(|key| match key {
        "ONBOARDING_API_URL" => Some(format!("http://127.0.0.1:{port}")),
        "ONBOARDING_HTTP_TIMEOUT_SECS" => Some("2".to_string()),
        _ => None,
    })
    .unwrap();
    (config, state)
}

fn signed_in() -> Arc<dyn TokenProvider> {
    Arc::new(StaticTokenProvider::new(Some(SecretString::from(TOKEN))))
}

fn client(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Arc<HttpBackend> {
    Arc::new(HttpBackend::new(config.clone(), tokens).unwrap())
}

/// Seed a granted location with two selectable listings.
fn seed_granted_location(state: &Shared) {
    let mut s = state.lock().unwrap();
    s.caller_location = Some(LOCATION.to_string());
    s.locations
        .insert(LOCATION.to_string(), json!({"businessName": "Tony's Pizzeria LLC"}));
    s.granted.insert(LOCATION.to_string());
    s.accounts = Some(json!({
        "accounts": [{
            "account_name": "Tony's Group",
            "account_number": "1029384756",
            "resource_name": "accounts/1029384756",
            "locations": [
                {"name": "locations/111", "title": "Tony's Pizzeria - Loop",
                 "resource_name": "locations/111", "address": "123 Main Street, Chicago, IL"},
                {"name": "locations/222", "title": "Tony's Pizzeria - River North",
                 "resource_name": "locations/222", "address": "400 N State St, Chicago, IL"}
            ]
        }],
        "total_accounts": 1
    }));
}

fn tonys(f: &mut OnboardingFields) {
    f.email = "tony@tonyspizzeria.com".into();
    f.business_name = "Tony's Pizzeria LLC".into();
    f.street_address = "123 Main Street".into();
    f.city = "Chicago".into();
    f.state = "IL".into();
    f.zip_code = "60601".into();
    f.phone = "(312) 555-1234".into();
    f.primary_category = "Pizza Restaurant".into();
}

// ── HTTP client contract ─────────────────────────────────────────────

#[tokio::test]
async fn missing_token_is_auth_error() {
    timeout(TEST_TIMEOUT, async {
        let (config, _state) = start_backend().await;
        let backend = client(&config, Arc::new(StaticTokenProvider::new(None)));

        let err = backend.my_location().await.unwrap_err();
        assert!(matches!(err, ApiError::Auth { .. }), "got {err:?}");
        assert!(!err.is_retryable());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn error_statuses_map_to_taxonomy() {
    timeout(TEST_TIMEOUT, async {
        let (config, _state) = start_backend().await;
        let backend = client(&config, signed_in());

        let err = backend.location("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { ref detail } if detail == "Location not found"));

        let err = backend.location("unavailable").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "Server error. Please try again later.");

        let mut fields = OnboardingFields::default();
        tonys(&mut fields);
        fields.zip_code.clear();
        let err = backend.create_location(&(&fields).into()).await.unwrap_err();
        assert!(
            matches!(err, ApiError::Validation { status: 422, ref detail } if detail == "zipCode: field required"),
            "got {err:?}"
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    timeout(TEST_TIMEOUT, async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let config = ClientConfig::from_lookup(|key| {
            (key == "ONBOARDING_API_URL").then(|| format!("http://127.0.0.1:{port}"))
        })
        .unwrap();
        let backend = client(&config, signed_in());

        let err = backend.my_location().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
        assert!(err.is_retryable());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn my_location_is_null_until_created() {
    timeout(TEST_TIMEOUT, async {
        let (config, _state) = start_backend().await;
        let backend = client(&config, signed_in());

        assert!(backend.my_location().await.unwrap().is_none());

        let mut fields = OnboardingFields::default();
        tonys(&mut fields);
        let created = backend.create_location(&(&fields).into()).await.unwrap();

        let me = backend.my_location().await.unwrap().unwrap();
        assert_eq!(me.id, created.location_id);
        assert_eq!(me.business_name, "Tony's Pizzeria LLC");
    })
    .await
    .expect("test timed out");
}

// ── Wizard + draft synchronizer ──────────────────────────────────────

#[tokio::test]
async fn step_one_location_survives_navigation_and_reload() {
    timeout(TEST_TIMEOUT, async {
        let (config, state) = start_backend().await;
        let backend = client(&config, signed_in());
        let dir = TempDir::new().unwrap();

        let sync = Arc::new(DraftSynchronizer::new(
            Arc::new(FileDraftStore::new(dir.path())),
            backend.clone(),
        ));
        let mut wizard = WizardStateMachine::new(sync, backend.clone());
        wizard.edit(tonys).await.unwrap();

        assert_eq!(
            wizard.advance().await.unwrap(),
            Advance::Moved(WizardStep::CONNECT_ACCOUNTS)
        );
        let location_id = wizard.location_id().await.unwrap();
        assert!(uuid::Uuid::parse_str(&location_id).is_ok());

        // Back to step 1 and forward again reuses the same location.
        wizard.retreat().await.unwrap();
        wizard.advance().await.unwrap();
        assert_eq!(wizard.location_id().await.as_deref(), Some(location_id.as_str()));
        assert_eq!(state.lock().unwrap().create_calls, 1);

        // A reload reads the snapshot from disk and keeps the id and step.
        let sync = Arc::new(DraftSynchronizer::new(
            Arc::new(FileDraftStore::new(dir.path())),
            backend.clone(),
        ));
        let mut resumed = WizardStateMachine::resume(sync, backend.clone()).await;
        assert!(resumed.restored());
        assert_eq!(resumed.step(), Some(WizardStep::CONNECT_ACCOUNTS));
        assert_eq!(resumed.fields().zip_code, "60601");
        assert_eq!(resumed.location_id().await, Some(location_id.clone()));

        // Finish the wizard; the snapshot file is removed.
        while !resumed.step().unwrap().is_review() {
            resumed.advance().await.unwrap();
        }
        let Advance::Submitted(resp) = resumed.advance().await.unwrap() else {
            panic!("expected submission");
        };
        assert_eq!(resp.location_id, location_id);
        assert!(!dir.path().join("sponte_onboarding_draft.json").exists());
        assert_eq!(state.lock().unwrap().create_calls, 1);
    })
    .await
    .expect("test timed out");
}

// ── OAuth flow ───────────────────────────────────────────────────────

#[tokio::test]
async fn callback_to_connected_with_second_listing() {
    timeout(TEST_TIMEOUT, async {
        let (config, state) = start_backend().await;
        seed_granted_location(&state);
        let tokens = signed_in();
        let backend = client(&config, tokens.clone());

        // A fresh controller, as after the full-page redirect.
        let flow = OAuthFlowController::new(backend.clone(), tokens.clone(), config.clone());
        let ctx = CallbackContext::from_query(&format!(
            "oauth_success=google&location_id={LOCATION}"
        ));
        let outcome = flow.resolve_callback(&ctx).await;

        assert_eq!(outcome.snapshot.state, FlowState::Selecting);
        assert_eq!(outcome.snapshot.candidates.len(), 2);

        let second = outcome.snapshot.candidates[1].resource_name.clone();
        flow.select(&second).await.unwrap();
        let saved = flow
            .save_selection(Some(LOCATION), Some(&second))
            .await
            .unwrap();
        assert_eq!(saved.snapshot.state, FlowState::Connected);

        let details = backend.location(LOCATION).await.unwrap();
        assert_eq!(details.gbp_location_name.as_deref(), Some("locations/222"));

        let registry = ConnectionRegistry::new(backend.clone(), tokens);
        let status = registry.get_status(LOCATION).await.unwrap();
        assert!(status.is_connected(Provider::GoogleBusinessProfile));
        let gbp = status.get(Provider::GoogleBusinessProfile).unwrap();
        assert_eq!(gbp.account_email.as_deref(), Some("owner@tonyspizzeria.com"));
        assert!(gbp.connected_at.is_some());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn access_denied_never_lists_accounts() {
    timeout(TEST_TIMEOUT, async {
        let (config, state) = start_backend().await;
        seed_granted_location(&state);
        let tokens = signed_in();
        let flow = OAuthFlowController::new(client(&config, tokens.clone()), tokens, config);

        let outcome = flow
            .resolve_callback(&CallbackContext::from_query(&format!(
                "oauth_error=access_denied&location_id={LOCATION}"
            )))
            .await;

        assert_eq!(outcome.snapshot.state, FlowState::Failed);
        assert_eq!(outcome.notice.unwrap().message, "OAuth failed: access_denied");
        assert_eq!(state.lock().unwrap().accounts_calls, 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn zero_listings_still_selecting() {
    timeout(TEST_TIMEOUT, async {
        let (config, state) = start_backend().await;
        seed_granted_location(&state);
        state.lock().unwrap().accounts = Some(json!({"accounts": [], "total_accounts": 0}));
        let tokens = signed_in();
        let flow = OAuthFlowController::new(client(&config, tokens.clone()), tokens, config);

        let outcome = flow
            .resolve_callback(&CallbackContext::from_query(&format!(
                "oauth_success=google&location_id={LOCATION}"
            )))
            .await;

        assert_eq!(outcome.snapshot.state, FlowState::Selecting);
        assert!(outcome.snapshot.candidates.is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rapid_double_save_patches_once() {
    timeout(TEST_TIMEOUT, async {
        let (config, state) = start_backend().await;
        seed_granted_location(&state);
        state.lock().unwrap().patch_delay = Some(Duration::from_millis(100));
        let tokens = signed_in();
        let flow = OAuthFlowController::new(client(&config, tokens.clone()), tokens, config);
        flow.resolve_callback(&CallbackContext::from_query(&format!(
            "oauth_success=google&location_id={LOCATION}"
        )))
        .await;

        let (a, b) = tokio::join!(
            flow.save_selection(Some(LOCATION), Some("locations/111")),
            flow.save_selection(Some(LOCATION), Some("locations/111")),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(state.lock().unwrap().patch_calls, 1);
        assert_eq!(flow.state().await, FlowState::Connected);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn connect_without_location_is_precondition() {
    timeout(TEST_TIMEOUT, async {
        let (config, _state) = start_backend().await;
        let tokens = signed_in();
        let flow = OAuthFlowController::new(client(&config, tokens.clone()), tokens, config);

        let err = flow
            .begin_connect(None, Provider::GoogleBusinessProfile)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Precondition(_)));
        assert_eq!(flow.state().await, FlowState::Idle);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn disconnect_twice_succeeds() {
    timeout(TEST_TIMEOUT, async {
        let (config, state) = start_backend().await;
        seed_granted_location(&state);
        let tokens = signed_in();
        let registry = ConnectionRegistry::new(client(&config, tokens.clone()), tokens);

        registry
            .disconnect(LOCATION, Provider::GoogleBusinessProfile)
            .await
            .unwrap();
        registry
            .disconnect(LOCATION, Provider::GoogleBusinessProfile)
            .await
            .unwrap();

        let status = registry.get_status(LOCATION).await.unwrap();
        assert!(!status.is_connected(Provider::GoogleBusinessProfile));
        assert!(!status.is_connected(Provider::GoogleAnalytics));
    })
    .await
    .expect("test timed out");
}
