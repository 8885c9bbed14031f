//! Candidate external resources returned after provider consent.
//!
//! Payloads are decoded into a tagged union at the HTTP boundary. Shapes we
//! do not recognise are kept as [`ProviderAccounts::Unknown`] and rejected
//! before the flow offers any selection.

use serde::{Deserialize, Serialize};

use crate::connections::OAuthGrant;
use crate::error::FlowError;

/// A Business Profile location under a Google account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleLocation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub resource_name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// A Google Business account and its locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleAccount {
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    pub resource_name: String,
    #[serde(default)]
    pub locations: Vec<GoogleLocation>,
}

/// `GET /api/oauth/google/accounts/:location_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleAccounts {
    pub accounts: Vec<GoogleAccount>,
    #[serde(default)]
    pub total_accounts: Option<u32>,
}

/// Provider-specific account listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderAccounts {
    Google(GoogleAccounts),
    /// Payload whose shape did not match the grant it was requested for.
    Unknown {
        grant: OAuthGrant,
        payload: serde_json::Value,
    },
}

impl ProviderAccounts {
    /// Decode a raw payload for `grant`.
    pub fn decode(grant: OAuthGrant, payload: serde_json::Value) -> Self {
        match grant {
            OAuthGrant::Google => match serde_json::from_value::<GoogleAccounts>(payload.clone()) {
                Ok(accounts) => Self::Google(accounts),
                Err(e) => {
                    tracing::warn!(grant = %grant, error = %e, "Unrecognised account payload");
                    Self::Unknown { grant, payload }
                }
            },
        }
    }

    /// Flatten into selectable candidates.
    pub fn candidates(&self) -> Result<Vec<Candidate>, FlowError> {
        match self {
            Self::Google(listing) => Ok(listing
                .accounts
                .iter()
                .flat_map(|account| {
                    account.locations.iter().map(move |loc| Candidate {
                        resource_name: loc.resource_name.clone(),
                        title: loc
                            .title
                            .clone()
                            .or_else(|| loc.name.clone())
                            .unwrap_or_else(|| loc.resource_name.clone()),
                        address: loc.address.clone(),
                        account_name: account.account_name.clone(),
                    })
                })
                .collect()),
            Self::Unknown { grant, .. } => Err(FlowError::Provider {
                reason: format!("unrecognised {grant} account listing"),
            }),
        }
    }
}

/// One selectable external resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifier persisted on the location when selected.
    pub resource_name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}
