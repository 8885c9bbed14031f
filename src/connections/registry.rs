//! Answers "is provider P connected for location L".

use std::sync::Arc;

use crate::api::{LocationSummary, OnboardingBackend};
use crate::auth::{TokenProvider, require_token};
use crate::error::ApiError;

use super::model::{ConnectionSet, ConnectionStatus, OAuthGrant, Provider};

/// Queries and mutates per-location connection status.
pub struct ConnectionRegistry {
    backend: Arc<dyn OnboardingBackend>,
    tokens: Arc<dyn TokenProvider>,
}

impl ConnectionRegistry {
    pub fn new(backend: Arc<dyn OnboardingBackend>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { backend, tokens }
    }

    /// Status of every known provider for `location_id`.
    ///
    /// The aggregate endpoint only covers the caller's own location. When it
    /// describes a different location (or none), every provider starts out
    /// disconnected and the per-grant status endpoint fills in Google.
    pub async fn get_status(&self, location_id: &str) -> Result<ConnectionSet, ApiError> {
        require_token(self.tokens.as_ref()).await?;

        let aggregate = match self.backend.connections_status().await {
            Ok(resp) if resp.location_id == location_id => Some(resp.into_connection_set()),
            Ok(resp) => {
                tracing::debug!(
                    location_id,
                    caller_location = %resp.location_id,
                    "Aggregate status is for another location"
                );
                None
            }
            Err(ApiError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let needs_detail = aggregate
            .as_ref()
            .map(|set| set.grant_connected(OAuthGrant::Google))
            .unwrap_or(true);
        let mut set = aggregate.unwrap_or_else(|| ConnectionSet::disconnected(location_id));

        if needs_detail {
            let google = self.backend.google_status(location_id).await?;
            for provider in OAuthGrant::Google.providers() {
                let previous = set
                    .get(*provider)
                    .cloned()
                    .unwrap_or_else(|| ConnectionStatus::disconnected(*provider));
                set.set(ConnectionStatus {
                    connected: google.connected,
                    account_email: google.email.clone().filter(|_| google.connected),
                    ..previous
                });
            }
        }

        tracing::debug!(
            location_id,
            connected = set.statuses.iter().filter(|s| s.connected).count(),
            "Resolved connection status"
        );
        Ok(set)
    }

    /// Like [`get_status`](Self::get_status), but failures degrade to
    /// "nothing connected" instead of blocking the caller.
    pub async fn status_or_disconnected(&self, location_id: &str) -> ConnectionSet {
        match self.get_status(location_id).await {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(location_id, error = %e, "Connection status unavailable");
                ConnectionSet::disconnected(location_id)
            }
        }
    }

    /// Revoke the stored link. Disconnecting an unlinked provider succeeds.
    pub async fn disconnect(&self, location_id: &str, provider: Provider) -> Result<(), ApiError> {
        let Some(grant) = provider.grant() else {
            tracing::info!(location_id, provider = %provider, "Provider has no stored link");
            return Ok(());
        };
        require_token(self.tokens.as_ref()).await?;

        let result = match grant {
            OAuthGrant::Google => self.backend.disconnect_google(location_id).await,
        };
        match result {
            Ok(()) => {
                tracing::info!(location_id, provider = %provider, "Disconnected");
                Ok(())
            }
            Err(ApiError::NotFound { .. }) => {
                tracing::debug!(location_id, provider = %provider, "Already disconnected");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The caller's existing location, if any.
    pub async fn my_location(&self) -> Result<Option<LocationSummary>, ApiError> {
        require_token(self.tokens.as_ref()).await?;
        self.backend.my_location().await
    }
}
