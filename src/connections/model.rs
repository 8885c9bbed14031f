//! Provider catalogue and per-location connection status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A third-party service that can be linked to a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    GoogleBusinessProfile,
    GoogleSearchConsole,
    GoogleAnalytics,
    #[serde(rename = "wordpress")]
    WordPress,
    Meta,
    #[serde(rename = "linkedin")]
    LinkedIn,
}

impl Provider {
    /// Every provider, in display order.
    pub const ALL: [Provider; 6] = [
        Provider::GoogleBusinessProfile,
        Provider::GoogleSearchConsole,
        Provider::GoogleAnalytics,
        Provider::WordPress,
        Provider::Meta,
        Provider::LinkedIn,
    ];

    /// The OAuth grant that links this provider, if one is wired up.
    ///
    /// The three Google products share a single Google consent grant.
    pub fn grant(&self) -> Option<OAuthGrant> {
        match self {
            Self::GoogleBusinessProfile | Self::GoogleSearchConsole | Self::GoogleAnalytics => {
                Some(OAuthGrant::Google)
            }
            Self::WordPress | Self::Meta | Self::LinkedIn => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GoogleBusinessProfile => "Google Business Profile",
            Self::GoogleSearchConsole => "Google Search Console",
            Self::GoogleAnalytics => "Google Analytics 4",
            Self::WordPress => "WordPress",
            Self::Meta => "Meta",
            Self::LinkedIn => "LinkedIn",
        }
    }

    /// Whether the wizard treats this connection as required.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::GoogleBusinessProfile | Self::GoogleSearchConsole)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GoogleBusinessProfile => "google_business_profile",
            Self::GoogleSearchConsole => "google_search_console",
            Self::GoogleAnalytics => "google_analytics",
            Self::WordPress => "wordpress",
            Self::Meta => "meta",
            Self::LinkedIn => "linkedin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.to_string() == s)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// An OAuth consent grant handled by the backend's connect/callback endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthGrant {
    Google,
}

impl OAuthGrant {
    /// Value carried by the `oauth_success` callback marker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }

    /// Parse the `oauth_success` marker value.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "google" => Some(Self::Google),
            _ => None,
        }
    }

    /// Providers linked by this grant.
    pub fn providers(&self) -> &'static [Provider] {
        match self {
            Self::Google => &[
                Provider::GoogleBusinessProfile,
                Provider::GoogleSearchConsole,
                Provider::GoogleAnalytics,
            ],
        }
    }

    /// Name of the external resource the user picks after consent.
    pub fn resource_label(&self) -> &'static str {
        match self {
            Self::Google => "Google Business Profile locations",
        }
    }
}

impl std::fmt::Display for OAuthGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Link status of one provider for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub provider: Provider,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// The stored grant has expired and must be redone.
    pub needs_reconnection: bool,
}

impl ConnectionStatus {
    pub fn disconnected(provider: Provider) -> Self {
        Self {
            provider,
            connected: false,
            account_email: None,
            connected_at: None,
            expires_at: None,
            needs_reconnection: false,
        }
    }
}

/// Status of every known provider for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSet {
    pub location_id: String,
    pub statuses: Vec<ConnectionStatus>,
}

impl ConnectionSet {
    /// Every provider reported as not connected.
    pub fn disconnected(location_id: &str) -> Self {
        Self {
            location_id: location_id.to_string(),
            statuses: Provider::ALL
                .into_iter()
                .map(ConnectionStatus::disconnected)
                .collect(),
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&ConnectionStatus> {
        self.statuses.iter().find(|s| s.provider == provider)
    }

    pub fn is_connected(&self, provider: Provider) -> bool {
        self.get(provider).map(|s| s.connected).unwrap_or(false)
    }

    /// Whether any provider covered by `grant` reports connected.
    pub fn grant_connected(&self, grant: OAuthGrant) -> bool {
        grant.providers().iter().any(|p| self.is_connected(*p))
    }

    /// Replace the status for one provider, inserting it if absent.
    pub fn set(&mut self, status: ConnectionStatus) {
        match self.statuses.iter_mut().find(|s| s.provider == status.provider) {
            Some(existing) => *existing = status,
            None => self.statuses.push(status),
        }
    }
}
