//! Provider-return query parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::connections::OAuthGrant;

pub const SUCCESS_PARAM: &str = "oauth_success";
pub const ERROR_PARAM: &str = "oauth_error";
pub const LOCATION_PARAM: &str = "location_id";

/// Query parameters of one callback page load. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackContext {
    pub success: Option<String>,
    pub error: Option<String>,
    pub location_id: Option<String>,
}

/// What a callback asks the flow to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackKind {
    Success {
        grant: OAuthGrant,
        location_id: String,
    },
    ProviderError {
        reason: String,
    },
    /// Neither marker usable.
    Invalid,
}

impl CallbackContext {
    pub fn from_map(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            success: get(SUCCESS_PARAM),
            error: get(ERROR_PARAM),
            location_id: get(LOCATION_PARAM),
        }
    }

    /// Parse a raw query string such as `oauth_success=google&location_id=…`.
    pub fn from_query(query: &str) -> Self {
        let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::from_map(&params)
    }

    /// An error marker wins over a success marker.
    pub fn classify(&self) -> CallbackKind {
        if let Some(reason) = &self.error {
            return CallbackKind::ProviderError {
                reason: reason.clone(),
            };
        }
        match (
            self.success.as_deref().and_then(OAuthGrant::from_marker),
            &self.location_id,
        ) {
            (Some(grant), Some(location_id)) => CallbackKind::Success {
                grant,
                location_id: location_id.clone(),
            },
            _ => CallbackKind::Invalid,
        }
    }
}
