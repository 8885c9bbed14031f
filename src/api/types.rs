//! Request and response bodies exchanged with the onboarding backend.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connections::{ConnectionSet, ConnectionStatus, Provider};

/// `POST /api/onboarding/create-location`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocationResponse {
    #[serde(default)]
    pub success: bool,
    pub location_id: String,
    #[serde(default)]
    pub message: String,
}

/// `POST /api/onboarding/submit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub user_id: String,
    pub location_id: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// `GET /api/locations/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub id: String,
    #[serde(default)]
    pub business_name: String,
}

/// `GET /api/locations/:id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDetails {
    pub id: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// External resource chosen during disambiguation.
    #[serde(default)]
    pub gbp_location_name: Option<String>,
    #[serde(default)]
    pub gbp_cadence: Option<String>,
    #[serde(default)]
    pub blog_cadence: Option<String>,
}

/// Body of `PATCH /api/locations/:id/gbp-location`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbpLocationUpdate {
    pub gbp_location_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GbpLocationSaved {
    #[serde(default)]
    pub message: String,
    pub location_id: String,
    pub gbp_location_name: String,
}

/// `GET /api/oauth/google/status/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleStatus {
    pub connected: bool,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub accounts_count: Option<u32>,
}

/// One provider entry of the aggregate status response.
#[derive(Debug, Clone, Deserialize)]
pub struct WireConnectionStatus {
    #[serde(default)]
    pub provider: String,
    pub connected: bool,
    #[serde(default)]
    pub connected_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub needs_reconnection: bool,
}

/// `GET /api/oauth/connections/status`
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionsStatusResponse {
    pub location_id: String,
    pub google_business_profile: WireConnectionStatus,
    pub google_search_console: WireConnectionStatus,
    pub google_analytics: WireConnectionStatus,
    pub wordpress: WireConnectionStatus,
    pub meta: WireConnectionStatus,
    pub linkedin: WireConnectionStatus,
}

impl ConnectionsStatusResponse {
    fn entry(&self, provider: Provider) -> &WireConnectionStatus {
        match provider {
            Provider::GoogleBusinessProfile => &self.google_business_profile,
            Provider::GoogleSearchConsole => &self.google_search_console,
            Provider::GoogleAnalytics => &self.google_analytics,
            Provider::WordPress => &self.wordpress,
            Provider::Meta => &self.meta,
            Provider::LinkedIn => &self.linkedin,
        }
    }

    pub fn into_connection_set(self) -> ConnectionSet {
        let statuses = Provider::ALL
            .into_iter()
            .map(|provider| {
                let wire = self.entry(provider);
                ConnectionStatus {
                    provider,
                    connected: wire.connected,
                    account_email: None,
                    connected_at: wire.connected_at.as_deref().and_then(parse_timestamp),
                    expires_at: wire.expires_at.as_deref().and_then(parse_timestamp),
                    needs_reconnection: wire.needs_reconnection,
                }
            })
            .collect();
        ConnectionSet {
            location_id: self.location_id,
            statuses,
        }
    }
}

/// Parse a backend timestamp. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// FastAPI error body: `detail` is either a string or a list of field errors.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    let field = item
                        .get("loc")
                        .and_then(|l| l.as_array())
                        .and_then(|l| l.last())
                        .and_then(|l| l.as_str())
                        .unwrap_or("");
                    let msg = item.get("msg").and_then(|m| m.as_str()).unwrap_or("invalid");
                    if field.is_empty() {
                        msg.to_string()
                    } else {
                        format!("{field}: {msg}")
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
