//! Bearer-token source for backend calls.
//!
//! The identity provider is external; this crate only consumes short-lived
//! bearer tokens through [`TokenProvider`].

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::ApiError;

/// Whether the identity session has been resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The session provider has not finished loading.
    Loading,
    /// Loaded, no signed-in user.
    SignedOut,
    /// Loaded with a signed-in user.
    SignedIn,
}

/// Supplies a bearer token on demand.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current session status.
    async fn session(&self) -> SessionStatus;

    /// A fresh token, or `None` when unauthenticated.
    async fn token(&self) -> Option<SecretString>;
}

/// Fetch a token or fail with [`ApiError::Auth`].
pub async fn require_token(tokens: &dyn TokenProvider) -> Result<SecretString, ApiError> {
    tokens.token().await.ok_or_else(|| ApiError::Auth {
        reason: "no bearer token available".to_string(),
    })
}

/// Token provider holding one fixed token (or none).
pub struct StaticTokenProvider {
    token: Option<SecretString>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }

    /// Read `ONBOARDING_BEARER_TOKEN` from the environment.
    pub fn from_env() -> Self {
        let token = std::env::var("ONBOARDING_BEARER_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);
        Self::new(token)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn session(&self) -> SessionStatus {
        if self.token.is_some() {
            SessionStatus::SignedIn
        } else {
            SessionStatus::SignedOut
        }
    }

    async fn token(&self) -> Option<SecretString> {
        self.token.clone()
    }
}
