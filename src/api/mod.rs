//! Onboarding backend API: the trait seam plus the reqwest implementation.

pub mod http;
pub mod types;

#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;

use crate::connections::OAuthGrant;
use crate::draft::{BusinessProfile, OnboardingFields};
use crate::error::ApiError;
use crate::oauth::ProviderAccounts;

pub use http::HttpBackend;
pub use types::{
    ConnectionsStatusResponse, CreateLocationResponse, GbpLocationSaved, GoogleStatus,
    LocationDetails, LocationSummary, SubmitResponse,
};

/// Backend-agnostic interface to every endpoint the onboarding flow consumes.
#[async_trait]
pub trait OnboardingBackend: Send + Sync {
    // ── Onboarding ──────────────────────────────────────────────────

    /// Create (or update) the caller's draft location from step-1 fields.
    async fn create_location(
        &self,
        profile: &BusinessProfile,
    ) -> Result<CreateLocationResponse, ApiError>;

    /// Terminal submission of the full wizard payload.
    async fn submit_onboarding(&self, fields: &OnboardingFields)
    -> Result<SubmitResponse, ApiError>;

    // ── Locations ───────────────────────────────────────────────────

    /// The caller's existing location, if any.
    async fn my_location(&self) -> Result<Option<LocationSummary>, ApiError>;

    async fn location(&self, location_id: &str) -> Result<LocationDetails, ApiError>;

    /// Persist the external resource chosen during disambiguation.
    async fn save_gbp_location(
        &self,
        location_id: &str,
        resource_name: &str,
    ) -> Result<GbpLocationSaved, ApiError>;

    // ── OAuth ───────────────────────────────────────────────────────

    /// Candidate external accounts/resources after a successful grant.
    async fn list_provider_accounts(
        &self,
        grant: OAuthGrant,
        location_id: &str,
    ) -> Result<ProviderAccounts, ApiError>;

    async fn google_status(&self, location_id: &str) -> Result<GoogleStatus, ApiError>;

    /// Revoke the stored Google grant. A missing grant is `NotFound`.
    async fn disconnect_google(&self, location_id: &str) -> Result<(), ApiError>;

    /// Aggregate status for the caller's own location.
    async fn connections_status(&self) -> Result<ConnectionsStatusResponse, ApiError>;
}
