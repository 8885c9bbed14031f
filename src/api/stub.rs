//! In-memory backend stub for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::OnboardingBackend;
use super::types::{
    ConnectionsStatusResponse, CreateLocationResponse, GbpLocationSaved, GoogleStatus,
    LocationDetails, LocationSummary, SubmitResponse,
};
use crate::connections::OAuthGrant;
use crate::draft::{BusinessProfile, OnboardingFields};
use crate::error::ApiError;
use crate::oauth::ProviderAccounts;

#[derive(Default)]
struct StubState {
    create_calls: usize,
    accounts_calls: usize,
    save_calls: usize,
    submit_calls: usize,
    fail_next_create: Option<ApiError>,
    fail_next_save: Option<ApiError>,
    fail_next_submit: Option<ApiError>,
    fail_next_accounts: Option<ApiError>,
    fail_status: Option<ApiError>,
    save_delay: Option<Duration>,
    accounts_delay: Option<Duration>,
    locations: HashMap<String, LocationDetails>,
    caller_location: Option<String>,
    granted: HashSet<String>,
    accounts: Option<serde_json::Value>,
}

/// Records calls and serves canned responses.
#[derive(Default)]
pub(crate) struct StubBackend {
    state: Mutex<StubState>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut StubState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn create_calls(&self) -> usize {
        self.with(|s| s.create_calls)
    }

    pub fn accounts_calls(&self) -> usize {
        self.with(|s| s.accounts_calls)
    }

    pub fn save_calls(&self) -> usize {
        self.with(|s| s.save_calls)
    }

    pub fn submit_calls(&self) -> usize {
        self.with(|s| s.submit_calls)
    }

    pub fn fail_next_create(&self, err: ApiError) {
        self.with(|s| s.fail_next_create = Some(err));
    }

    pub fn fail_next_save(&self, err: ApiError) {
        self.with(|s| s.fail_next_save = Some(err));
    }

    pub fn fail_next_submit(&self, err: ApiError) {
        self.with(|s| s.fail_next_submit = Some(err));
    }

    pub fn fail_next_accounts(&self, err: ApiError) {
        self.with(|s| s.fail_next_accounts = Some(err));
    }

    pub fn fail_status(&self, err: ApiError) {
        self.with(|s| s.fail_status = Some(err));
    }

    pub fn set_save_delay(&self, delay: Duration) {
        self.with(|s| s.save_delay = Some(delay));
    }

    pub fn set_accounts_delay(&self, delay: Duration) {
        self.with(|s| s.accounts_delay = Some(delay));
    }

    /// Simulate the provider's consent grant landing server-side.
    pub fn grant_google(&self, location_id: &str) {
        self.with(|s| {
            s.granted.insert(location_id.to_string());
            s.caller_location
                .get_or_insert_with(|| location_id.to_string());
        });
    }

    pub fn set_accounts(&self, payload: serde_json::Value) {
        self.with(|s| s.accounts = Some(payload));
    }

    pub fn saved_resource(&self, location_id: &str) -> Option<String> {
        self.with(|s| {
            s.locations
                .get(location_id)
                .and_then(|l| l.gbp_location_name.clone())
        })
    }
}

#[async_trait]
impl OnboardingBackend for StubBackend {
    async fn create_location(
        &self,
        profile: &BusinessProfile,
    ) -> Result<CreateLocationResponse, ApiError> {
        self.with(|s| {
            s.create_calls += 1;
            if let Some(err) = s.fail_next_create.take() {
                return Err(err);
            }
            let id = Uuid::new_v4().to_string();
            s.locations.insert(
                id.clone(),
                LocationDetails {
                    id: id.clone(),
                    business_name: Some(profile.business_name.clone()),
                    city: Some(profile.city.clone()),
                    state: Some(profile.state.clone()),
                    gbp_location_name: None,
                    gbp_cadence: None,
                    blog_cadence: None,
                },
            );
            s.caller_location = Some(id.clone());
            Ok(CreateLocationResponse {
                success: true,
                location_id: id,
                message: "Draft location created".to_string(),
            })
        })
    }

    async fn submit_onboarding(
        &self,
        _fields: &OnboardingFields,
    ) -> Result<SubmitResponse, ApiError> {
        self.with(|s| {
            s.submit_calls += 1;
            if let Some(err) = s.fail_next_submit.take() {
                return Err(err);
            }
            let location_id = s
                .caller_location
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            Ok(SubmitResponse {
                success: true,
                message: "Onboarding completed successfully!".to_string(),
                user_id: Uuid::new_v4().to_string(),
                location_id,
                next_steps: vec!["Check your email for next steps".to_string()],
            })
        })
    }

    async fn my_location(&self) -> Result<Option<LocationSummary>, ApiError> {
        self.with(|s| {
            Ok(s.caller_location.as_ref().map(|id| LocationSummary {
                id: id.clone(),
                business_name: s
                    .locations
                    .get(id)
                    .and_then(|l| l.business_name.clone())
                    .unwrap_or_default(),
            }))
        })
    }

    async fn location(&self, location_id: &str) -> Result<LocationDetails, ApiError> {
        self.with(|s| {
            s.locations
                .get(location_id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound {
                    detail: "Location not found".to_string(),
                })
        })
    }

    async fn save_gbp_location(
        &self,
        location_id: &str,
        resource_name: &str,
    ) -> Result<GbpLocationSaved, ApiError> {
        let delay = self.with(|s| {
            s.save_calls += 1;
            s.save_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            if let Some(err) = s.fail_next_save.take() {
                return Err(err);
            }
            let location = s
                .locations
                .entry(location_id.to_string())
                .or_insert_with(|| LocationDetails {
                    id: location_id.to_string(),
                    business_name: None,
                    city: None,
                    state: None,
                    gbp_location_name: None,
                    gbp_cadence: None,
                    blog_cadence: None,
                });
            location.gbp_location_name = Some(resource_name.to_string());
            Ok(GbpLocationSaved {
                message: "GBP location saved successfully".to_string(),
                location_id: location_id.to_string(),
                gbp_location_name: resource_name.to_string(),
            })
        })
    }

    async fn list_provider_accounts(
        &self,
        grant: OAuthGrant,
        location_id: &str,
    ) -> Result<ProviderAccounts, ApiError> {
        let delay = self.with(|s| {
            s.accounts_calls += 1;
            s.accounts_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            if let Some(err) = s.fail_next_accounts.take() {
                return Err(err);
            }
            if !s.granted.contains(location_id) {
                return Err(ApiError::NotFound {
                    detail: "Google not connected for this location".to_string(),
                });
            }
            let payload = s
                .accounts
                .clone()
                .unwrap_or_else(|| serde_json::json!({"accounts": [], "total_accounts": 0}));
            Ok(ProviderAccounts::decode(grant, payload))
        })
    }

    async fn google_status(&self, location_id: &str) -> Result<GoogleStatus, ApiError> {
        self.with(|s| {
            if let Some(err) = s.fail_status.take() {
                return Err(err);
            }
            let connected = s.granted.contains(location_id);
            Ok(GoogleStatus {
                connected,
                location_id: Some(location_id.to_string()),
                email: connected.then(|| "owner@example.com".to_string()),
                accounts_count: connected.then_some(1),
            })
        })
    }

    async fn disconnect_google(&self, location_id: &str) -> Result<(), ApiError> {
        self.with(|s| {
            if s.granted.remove(location_id) {
                Ok(())
            } else {
                Err(ApiError::NotFound {
                    detail: "No Google connection found for this location".to_string(),
                })
            }
        })
    }

    async fn connections_status(&self) -> Result<ConnectionsStatusResponse, ApiError> {
        self.with(|s| {
            if let Some(err) = s.fail_status.take() {
                return Err(err);
            }
            let Some(location_id) = s.caller_location.clone() else {
                return Err(ApiError::NotFound {
                    detail: "No location found for user".to_string(),
                });
            };
            let google = s.granted.contains(&location_id);
            let entry = |provider: &str, connected: bool| {
                serde_json::json!({
                    "provider": provider,
                    "connected": connected,
                    "needs_reconnection": false,
                })
            };
            let body = serde_json::json!({
                "location_id": location_id,
                "google_business_profile": entry("google", google),
                "google_search_console": entry("google", google),
                "google_analytics": entry("google", google),
                "wordpress": entry("wordpress", false),
                "meta": entry("meta", false),
                "linkedin": entry("linkedin", false),
            });
            serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse {
                endpoint: "oauth/connections/status".to_string(),
                reason: e.to_string(),
            })
        })
    }
}
