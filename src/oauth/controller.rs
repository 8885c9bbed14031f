//! Drives a provider link from the consent redirect to the saved selection.
//!
//! The redirect to the provider tears the process state down, so a
//! controller handling the return trip is built fresh and works only from the
//! callback query, the token provider and the backend. Nothing set before the
//! redirect is assumed to survive it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use super::accounts::Candidate;
use super::callback::{CallbackContext, CallbackKind, LOCATION_PARAM};
use super::state::FlowState;
use crate::api::OnboardingBackend;
use crate::auth::{SessionStatus, TokenProvider, require_token};
use crate::config::ClientConfig;
use crate::connections::{OAuthGrant, Provider};
use crate::error::FlowError;

/// Wizard route the flow returns to.
pub const WIZARD_PATH: &str = "/onboarding";
/// Route of the identity provider's sign-in page.
pub const SIGN_IN_PATH: &str = "/sign-in";

const CONNECTED_MESSAGE: &str = "Google Business Profile connected successfully!";
const INVALID_CALLBACK_MESSAGE: &str = "Invalid OAuth callback";

/// Where the caller should send the user next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Leave the application entirely (provider consent page).
    External(Url),
    /// Move within the application after `delay`.
    Internal { path: String, delay: Duration },
}

impl Navigation {
    fn internal(path: &str, delay: Duration) -> Self {
        Self::Internal {
            path: path.to_string(),
            delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Everything the presentation layer needs to render the flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub location_id: Option<String>,
    pub grant: Option<OAuthGrant>,
    pub candidates: Vec<Candidate>,
    pub selected: Option<String>,
    pub last_error: Option<String>,
}

/// Result of a flow step that never fails outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub snapshot: FlowSnapshot,
    pub notice: Option<Notice>,
    pub navigation: Option<Navigation>,
}

/// Drives one location's connect flow.
pub struct OAuthFlowController {
    backend: Arc<dyn OnboardingBackend>,
    tokens: Arc<dyn TokenProvider>,
    config: ClientConfig,
    snapshot: Arc<RwLock<FlowSnapshot>>,
    /// Set while a link save is outstanding.
    saving: AtomicBool,
}

/// Clears the in-flight flag however the save ends.
struct SavingGuard<'a>(&'a AtomicBool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Puts the flow back to `restore` if a network step is dropped while the
/// state still reads `pending`.
struct Rollback {
    snapshot: Arc<RwLock<FlowSnapshot>>,
    pending: FlowState,
    restore: FlowState,
}

impl Rollback {
    fn new(snapshot: &Arc<RwLock<FlowSnapshot>>, pending: FlowState, restore: FlowState) -> Self {
        Self {
            snapshot: snapshot.clone(),
            pending,
            restore,
        }
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        let (pending, restore) = (self.pending, self.restore);
        let roll_back = move |snap: &mut FlowSnapshot| {
            if snap.state == pending {
                tracing::warn!(
                    location_id = ?snap.location_id,
                    from = %pending,
                    to = %restore,
                    "OAuth flow step abandoned, rolling back"
                );
                snap.state = restore;
            }
        };
        match self.snapshot.try_write() {
            Ok(mut snap) => roll_back(&mut snap),
            Err(_) => {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let snapshot = self.snapshot.clone();
                    handle.spawn(async move { roll_back(&mut *snapshot.write().await) });
                }
            }
        }
    }
}

fn transition(snapshot: &mut FlowSnapshot, to: FlowState) -> Result<(), FlowError> {
    let from = snapshot.state;
    if !from.can_transition_to(to) {
        return Err(FlowError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    snapshot.state = to;
    tracing::debug!(
        location_id = ?snapshot.location_id,
        from = %from,
        to = %to,
        "OAuth flow transition"
    );
    Ok(())
}

impl OAuthFlowController {
    pub fn new(
        backend: Arc<dyn OnboardingBackend>,
        tokens: Arc<dyn TokenProvider>,
        config: ClientConfig,
    ) -> Self {
        Self {
            backend,
            tokens,
            config,
            snapshot: Arc::new(RwLock::new(FlowSnapshot::default())),
            saving: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn state(&self) -> FlowState {
        self.snapshot.read().await.state
    }

    /// Start linking `provider` to `location_id`.
    ///
    /// Returns the provider connect URL for a full navigation. Fails without
    /// touching state when there is no location to carry through the redirect.
    pub async fn begin_connect(
        &self,
        location_id: Option<&str>,
        provider: Provider,
    ) -> Result<Navigation, FlowError> {
        let Some(location_id) = location_id.map(str::trim).filter(|id| !id.is_empty()) else {
            tracing::warn!(provider = %provider, "Connect requested before a location exists");
            return Err(FlowError::Precondition(
                "connect requested without a location id".to_string(),
            ));
        };
        if Uuid::parse_str(location_id).is_err() {
            tracing::warn!(location_id, "Connect requested with a malformed location id");
            return Err(FlowError::Precondition(format!(
                "'{location_id}' is not a location id"
            )));
        }
        let grant = provider.grant().ok_or_else(|| FlowError::UnsupportedProvider {
            provider: provider.display_name().to_string(),
        })?;

        let mut snap = self.snapshot.write().await;
        if snap.state.is_in_progress() {
            return Err(FlowError::Busy {
                operation: "connect".to_string(),
            });
        }
        transition(&mut snap, FlowState::Redirecting)?;
        *snap = FlowSnapshot {
            state: FlowState::Redirecting,
            location_id: Some(location_id.to_string()),
            grant: Some(grant),
            ..Default::default()
        };

        let mut url = self
            .config
            .api_url_for(&["api", "oauth", grant.as_str(), "connect"]);
        url.query_pairs_mut().append_pair(LOCATION_PARAM, location_id);

        tracing::info!(location_id, provider = %provider, "Redirecting to provider consent");
        Ok(Navigation::External(url))
    }

    /// Consume the provider-return query of one page load.
    ///
    /// Safe to call repeatedly for the same URL: once the flow has moved past
    /// waiting for the callback, later calls report the current snapshot.
    pub async fn resolve_callback(&self, ctx: &CallbackContext) -> FlowOutcome {
        {
            let mut snap = self.snapshot.write().await;
            match snap.state {
                FlowState::Idle | FlowState::Redirecting => {
                    snap.state = FlowState::AwaitingCallback;
                }
                FlowState::AwaitingCallback => {}
                state => {
                    tracing::debug!(state = %state, "Callback already handled");
                    return self.outcome_of(&snap, None, None);
                }
            }
            if ctx.location_id.is_some() {
                snap.location_id = ctx.location_id.clone();
            }
        }

        match self.tokens.session().await {
            SessionStatus::Loading => {
                tracing::debug!("Session still loading, deferring callback");
                return self.outcome(None, None).await;
            }
            SessionStatus::SignedOut => {
                tracing::warn!("OAuth callback without a signed-in session");
                return self
                    .fail(
                        "Please sign in to continue".to_string(),
                        Navigation::internal(SIGN_IN_PATH, self.config.failure_redirect_delay),
                    )
                    .await;
            }
            SessionStatus::SignedIn => {}
        }

        let (grant, location_id) = match ctx.classify() {
            CallbackKind::ProviderError { reason } => {
                tracing::warn!(location_id = ?ctx.location_id, reason = %reason, "Provider reported failure");
                let err = FlowError::Provider { reason };
                return self.fail_to_wizard(err.user_message()).await;
            }
            CallbackKind::Invalid => {
                tracing::warn!(?ctx, "Malformed OAuth callback");
                return self.fail_to_wizard(INVALID_CALLBACK_MESSAGE.to_string()).await;
            }
            CallbackKind::Success { grant, location_id } => (grant, location_id),
        };

        {
            let mut snap = self.snapshot.write().await;
            if snap.state != FlowState::AwaitingCallback {
                return self.outcome_of(&snap, None, None);
            }
            snap.grant = Some(grant);
            snap.location_id = Some(location_id.clone());
            if let Err(e) = transition(&mut snap, FlowState::ResolvingAccounts) {
                tracing::warn!(error = %e, "Cannot resolve accounts");
                return self.outcome_of(&snap, None, None);
            }
        }
        // A dropped listing leaves the callback resolvable again.
        let _rollback = Rollback::new(
            &self.snapshot,
            FlowState::ResolvingAccounts,
            FlowState::AwaitingCallback,
        );

        // The callback is single use; without a token the redirect must be redone.
        if let Err(e) = require_token(self.tokens.as_ref()).await {
            tracing::warn!(location_id = %location_id, error = %e, "No token for account listing");
            return self
                .fail(
                    e.user_message(),
                    Navigation::internal(SIGN_IN_PATH, self.config.failure_redirect_delay),
                )
                .await;
        }

        let candidates = match self
            .backend
            .list_provider_accounts(grant, &location_id)
            .await
        {
            Ok(accounts) => accounts.candidates(),
            Err(e) => Err(FlowError::Api(e)),
        };
        let candidates = match candidates {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(location_id = %location_id, error = %e, "Failed to list provider accounts");
                return self.fail_to_wizard(e.user_message()).await;
            }
        };

        let mut snap = self.snapshot.write().await;
        if let Err(e) = transition(&mut snap, FlowState::Selecting) {
            tracing::warn!(error = %e, "Flow changed while listing accounts");
            return self.outcome_of(&snap, None, None);
        }
        tracing::info!(
            location_id = %location_id,
            candidates = candidates.len(),
            "Provider accounts resolved"
        );
        let notice = candidates.is_empty().then(|| {
            Notice::new(
                NoticeLevel::Info,
                format!("No {} found for this account", grant.resource_label()),
            )
        });
        snap.candidates = candidates;
        snap.selected = None;
        self.outcome_of(&snap, notice, None)
    }

    /// Mark one candidate as chosen.
    pub async fn select(&self, resource_name: &str) -> Result<(), FlowError> {
        let mut snap = self.snapshot.write().await;
        if snap.state != FlowState::Selecting {
            return Err(FlowError::InvalidTransition {
                from: snap.state.to_string(),
                to: FlowState::Selecting.to_string(),
            });
        }
        if !snap.candidates.iter().any(|c| c.resource_name == resource_name) {
            return Err(FlowError::Precondition(format!(
                "'{resource_name}' is not one of the offered resources"
            )));
        }
        snap.selected = Some(resource_name.to_string());
        Ok(())
    }

    /// Persist the chosen resource on the location.
    ///
    /// Only one save is honored: a repeat while one is in flight, or after the
    /// same resource was linked, reports the current outcome. A failed save
    /// returns to `selecting` so the user can retry without a new redirect.
    pub async fn save_selection(
        &self,
        location_id: Option<&str>,
        selected: Option<&str>,
    ) -> Result<FlowOutcome, FlowError> {
        let Some(selected) = selected.filter(|s| !s.is_empty()) else {
            return Err(FlowError::Precondition("no resource selected".to_string()));
        };

        if self.saving.swap(true, Ordering::AcqRel) {
            tracing::debug!(selected, "Save already in flight");
            return Ok(self.outcome(None, None).await);
        }
        let _guard = SavingGuard(&self.saving);

        let location_id = {
            let mut snap = self.snapshot.write().await;
            if snap.state == FlowState::Connected && snap.selected.as_deref() == Some(selected) {
                return Ok(self.outcome_of(&snap, None, None));
            }
            let Some(location_id) = location_id
                .map(str::to_string)
                .or_else(|| snap.location_id.clone())
            else {
                return Err(FlowError::Precondition(
                    "save requested without a location id".to_string(),
                ));
            };
            if snap.state == FlowState::Selecting
                && !snap.candidates.iter().any(|c| c.resource_name == selected)
            {
                return Err(FlowError::Precondition(format!(
                    "'{selected}' is not one of the offered resources"
                )));
            }
            transition(&mut snap, FlowState::Saving)?;
            snap.selected = Some(selected.to_string());
            snap.last_error = None;
            location_id
        };
        let _rollback = Rollback::new(&self.snapshot, FlowState::Saving, FlowState::Selecting);

        let result = match require_token(self.tokens.as_ref()).await {
            Ok(_) => self.backend.save_gbp_location(&location_id, selected).await,
            Err(e) => Err(e),
        };

        let mut snap = self.snapshot.write().await;
        match result {
            Ok(saved) => {
                transition(&mut snap, FlowState::Connected)?;
                tracing::info!(
                    location_id = %saved.location_id,
                    resource = %saved.gbp_location_name,
                    "External resource linked"
                );
                Ok(self.outcome_of(
                    &snap,
                    Some(Notice::new(NoticeLevel::Success, CONNECTED_MESSAGE)),
                    Some(Navigation::internal(
                        WIZARD_PATH,
                        self.config.success_redirect_delay,
                    )),
                ))
            }
            Err(e) => {
                transition(&mut snap, FlowState::Selecting)?;
                snap.last_error = Some(e.user_message());
                tracing::warn!(location_id = %location_id, error = %e, "Failed to save selection");
                Err(FlowError::Api(e))
            }
        }
    }

    /// Abandon the flow and return to the wizard. Nothing is persisted.
    pub async fn cancel(&self) -> Result<Navigation, FlowError> {
        let mut snap = self.snapshot.write().await;
        match snap.state {
            FlowState::Idle => {}
            FlowState::Saving => {
                return Err(FlowError::Busy {
                    operation: "save".to_string(),
                });
            }
            _ => {
                transition(&mut snap, FlowState::Idle)?;
                snap.candidates.clear();
                snap.selected = None;
                snap.last_error = None;
                tracing::info!(location_id = ?snap.location_id, "OAuth flow cancelled");
            }
        }
        Ok(Navigation::internal(WIZARD_PATH, Duration::ZERO))
    }

    async fn fail_to_wizard(&self, message: String) -> FlowOutcome {
        let nav = Navigation::internal(WIZARD_PATH, self.config.failure_redirect_delay);
        self.fail(message, nav).await
    }

    async fn fail(&self, message: String, navigation: Navigation) -> FlowOutcome {
        let mut snap = self.snapshot.write().await;
        if let Err(e) = transition(&mut snap, FlowState::Failed) {
            tracing::warn!(error = %e, "Flow already left the callback");
            return self.outcome_of(&snap, None, None);
        }
        snap.candidates.clear();
        snap.last_error = Some(message.clone());
        self.outcome_of(
            &snap,
            Some(Notice::new(NoticeLevel::Error, message)),
            Some(navigation),
        )
    }

    async fn outcome(&self, notice: Option<Notice>, navigation: Option<Navigation>) -> FlowOutcome {
        let snap = self.snapshot.read().await;
        self.outcome_of(&snap, notice, navigation)
    }

    fn outcome_of(
        &self,
        snap: &FlowSnapshot,
        notice: Option<Notice>,
        navigation: Option<Navigation>,
    ) -> FlowOutcome {
        FlowOutcome {
            snapshot: snap.clone(),
            notice,
            navigation,
        }
    }
}
