//! Ties the local snapshot to exactly one server-side draft location.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::model::{BusinessProfile, OnboardingDraft, OnboardingFields};
use super::store::DraftStore;
use crate::api::OnboardingBackend;
use crate::error::ApiError;

/// Keeps the local draft snapshot and the draft location id in step.
///
/// Snapshot writes are best-effort: storage failures are logged and
/// swallowed so that losing autosave never blocks the wizard.
pub struct DraftSynchronizer {
    store: Arc<dyn DraftStore>,
    backend: Arc<dyn OnboardingBackend>,
    location_id: RwLock<Option<String>>,
    /// Serializes create calls so concurrent advances reuse one location.
    create_lock: Mutex<()>,
}

impl DraftSynchronizer {
    pub fn new(store: Arc<dyn DraftStore>, backend: Arc<dyn OnboardingBackend>) -> Self {
        Self {
            store,
            backend,
            location_id: RwLock::new(None),
            create_lock: Mutex::new(()),
        }
    }

    /// The draft location id, once known.
    pub async fn location_id(&self) -> Option<String> {
        self.location_id.read().await.clone()
    }

    /// Read the snapshot. Missing or unparsable snapshots yield `None`.
    pub async fn load(&self) -> Option<OnboardingDraft> {
        let raw = match self.store.read().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read onboarding draft");
                return None;
            }
        };

        let draft = match serde_json::from_str::<OnboardingDraft>(&raw) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring corrupt onboarding draft");
                return None;
            }
        };

        if let Some(ref id) = draft.location_id {
            *self.location_id.write().await = Some(id.clone());
        }
        tracing::info!(
            location_id = ?draft.location_id,
            step = ?draft.step,
            "Loaded onboarding draft"
        );
        Some(draft)
    }

    /// Write the full field set to the snapshot. Never fails.
    ///
    /// The known location id is merged in when `draft` does not carry one,
    /// so autosave cannot drop it.
    pub async fn persist(&self, draft: &OnboardingDraft) {
        let mut snapshot = draft.clone();
        if snapshot.location_id.is_none() {
            snapshot.location_id = self.location_id().await;
        }
        snapshot.saved_at = Some(Utc::now());
        self.write_snapshot(&snapshot).await;
    }

    /// Ensure a draft location exists for the step-1 fields.
    ///
    /// Creates it on first call; afterwards returns the cached id without
    /// contacting the backend. Later step-1 edits are only carried by the
    /// terminal submission.
    pub async fn create_or_update(&self, fields: &OnboardingFields) -> Result<String, ApiError> {
        let _guard = self.create_lock.lock().await;

        if let Some(id) = self.location_id().await {
            tracing::debug!(location_id = %id, "Draft location already exists, reusing");
            return Ok(id);
        }

        let profile = BusinessProfile::from(fields);
        let resp = self.backend.create_location(&profile).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to create draft location");
            e
        })?;
        let id = resp.location_id;

        *self.location_id.write().await = Some(id.clone());
        tracing::info!(location_id = %id, "Draft location created");

        let mut snapshot = self.load_quiet().await.unwrap_or_else(|| OnboardingDraft {
            fields: fields.clone(),
            ..Default::default()
        });
        snapshot.location_id = Some(id.clone());
        snapshot.saved_at = Some(Utc::now());
        self.write_snapshot(&snapshot).await;

        Ok(id)
    }

    /// Remove the snapshot and forget the location id.
    ///
    /// Only called after a confirmed terminal submission.
    pub async fn clear(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "Failed to clear onboarding draft");
        }
        *self.location_id.write().await = None;
    }

    async fn load_quiet(&self) -> Option<OnboardingDraft> {
        let raw = self.store.read().await.ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    async fn write_snapshot(&self, snapshot: &OnboardingDraft) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize onboarding draft");
                return;
            }
        };
        if let Err(e) = self.store.write(&json).await {
            tracing::warn!(error = %e, "Failed to persist onboarding draft");
        }
    }
}
