//! reqwest-backed implementation of [`OnboardingBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

use super::OnboardingBackend;
use super::types::{
    ConnectionsStatusResponse, CreateLocationResponse, ErrorBody, GbpLocationSaved,
    GbpLocationUpdate, GoogleStatus, LocationDetails, LocationSummary, SubmitResponse,
};
use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::connections::OAuthGrant;
use crate::draft::{BusinessProfile, OnboardingFields};
use crate::error::ApiError;
use crate::oauth::ProviderAccounts;

/// HTTP client for the onboarding backend.
///
/// Attaches `Authorization: Bearer …` to every request when the token
/// provider has a token.
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpBackend {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.tokens.token().await {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = self.dispatch(endpoint, builder).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }

    async fn dispatch(&self, endpoint: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        let resp = builder.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Backend request failed");
            if e.is_timeout() {
                ApiError::Network(format!("{endpoint} timed out"))
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        if resp.status().is_success() {
            return Ok(resp);
        }
        let err = error_from_response(resp).await;
        tracing::debug!(endpoint, error = %err, "Backend returned an error status");
        Err(err)
    }
}

/// Translate a non-2xx response into the error taxonomy.
async fn error_from_response(resp: Response) -> ApiError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message())
        .ok()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Auth { reason: detail },
        StatusCode::FORBIDDEN => ApiError::Forbidden { detail },
        StatusCode::NOT_FOUND => ApiError::NotFound { detail },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation {
            status: status.as_u16(),
            detail,
        },
        _ => ApiError::Status {
            status: status.as_u16(),
            detail,
        },
    }
}

#[async_trait]
impl OnboardingBackend for HttpBackend {
    async fn create_location(
        &self,
        profile: &BusinessProfile,
    ) -> Result<CreateLocationResponse, ApiError> {
        let url = self.config.api_url_for(&["api", "onboarding", "create-location"]);
        let builder = self.request(Method::POST, url).await.json(profile);
        let resp: CreateLocationResponse = self.send("create-location", builder).await?;
        if resp.location_id.trim().is_empty() {
            return Err(ApiError::InvalidResponse {
                endpoint: "create-location".to_string(),
                reason: "empty location_id".to_string(),
            });
        }
        Ok(resp)
    }

    async fn submit_onboarding(
        &self,
        fields: &OnboardingFields,
    ) -> Result<SubmitResponse, ApiError> {
        let url = self.config.api_url_for(&["api", "onboarding", "submit"]);
        let builder = self.request(Method::POST, url).await.json(fields);
        self.send("submit", builder).await
    }

    async fn my_location(&self) -> Result<Option<LocationSummary>, ApiError> {
        let url = self.config.api_url_for(&["api", "locations", "me"]);
        let builder = self.request(Method::GET, url).await;
        self.send("locations/me", builder).await
    }

    async fn location(&self, location_id: &str) -> Result<LocationDetails, ApiError> {
        let url = self.config.api_url_for(&["api", "locations", location_id]);
        let builder = self.request(Method::GET, url).await;
        self.send("locations/:id", builder).await
    }

    async fn save_gbp_location(
        &self,
        location_id: &str,
        resource_name: &str,
    ) -> Result<GbpLocationSaved, ApiError> {
        let url = self
            .config
            .api_url_for(&["api", "locations", location_id, "gbp-location"]);
        let body = GbpLocationUpdate {
            gbp_location_name: resource_name.to_string(),
        };
        let builder = self.request(Method::PATCH, url).await.json(&body);
        self.send("locations/:id/gbp-location", builder).await
    }

    async fn list_provider_accounts(
        &self,
        grant: OAuthGrant,
        location_id: &str,
    ) -> Result<ProviderAccounts, ApiError> {
        let url = self
            .config
            .api_url_for(&["api", "oauth", grant.as_str(), "accounts", location_id]);
        let builder = self.request(Method::GET, url).await;
        let payload: serde_json::Value = self.send("oauth/accounts", builder).await?;
        Ok(ProviderAccounts::decode(grant, payload))
    }

    async fn google_status(&self, location_id: &str) -> Result<GoogleStatus, ApiError> {
        let url = self
            .config
            .api_url_for(&["api", "oauth", "google", "status", location_id]);
        let builder = self.request(Method::GET, url).await;
        self.send("oauth/google/status", builder).await
    }

    async fn disconnect_google(&self, location_id: &str) -> Result<(), ApiError> {
        let url = self
            .config
            .api_url_for(&["api", "oauth", "google", "disconnect", location_id]);
        let builder = self.request(Method::POST, url).await;
        self.dispatch("oauth/google/disconnect", builder).await?;
        Ok(())
    }

    async fn connections_status(&self) -> Result<ConnectionsStatusResponse, ApiError> {
        let url = self
            .config
            .api_url_for(&["api", "oauth", "connections", "status"]);
        let builder = self.request(Method::GET, url).await;
        self.send("oauth/connections/status", builder).await
    }
}
