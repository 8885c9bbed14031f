//! Error types for location onboarding.

use crate::wizard::FieldErrors;

/// Generic text shown when a UI-state invariant was violated.
const PLEASE_RETRY: &str =
    "Please wait a moment - we're still setting up your account. Try again in a few seconds.";

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("OAuth flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Draft store error: {0}")]
    Store(#[from] StoreError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),
}

impl Error {
    /// Notification text for the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Api(e) => e.user_message(),
            Self::Flow(e) => e.user_message(),
            Self::Store(_) => "An unexpected error occurred".to_string(),
            Self::Wizard(e) => e.user_message(),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures talking to the onboarding backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No bearer token, or the backend rejected it. Never retried automatically.
    #[error("Authentication required: {reason}")]
    Auth { reason: String },

    /// Transport failure or timeout. Safe to retry.
    #[error("Network error: {0}")]
    Network(String),

    /// Structural rejection of the submitted fields (400 / 422).
    #[error("Validation failed ({status}): {detail}")]
    Validation { status: u16, detail: String },

    #[error("Permission denied: {detail}")]
    Forbidden { detail: String },

    #[error("Not found: {detail}")]
    NotFound { detail: String },

    #[error("Request failed with status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl ApiError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Auth { .. } => "Please sign in to continue".to_string(),
            Self::Network(_) => "Network error. Please check your connection.".to_string(),
            Self::Validation { status: 400, detail } => format!("Invalid request: {detail}"),
            Self::Validation { detail, .. } => format!("Validation error: {detail}"),
            Self::Forbidden { .. } => {
                "You do not have permission to perform this action".to_string()
            }
            Self::NotFound { .. } => "Resource not found".to_string(),
            Self::Status { status, .. } if *status >= 500 => {
                "Server error. Please try again later.".to_string()
            }
            Self::Status { detail, .. } => detail.clone(),
            Self::InvalidResponse { .. } => "An unexpected error occurred".to_string(),
        }
    }
}

/// OAuth connection flow errors.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// A UI-state invariant was violated (e.g. connect without a location id).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The third-party provider reported a failure through the callback.
    #[error("Provider reported failure: {reason}")]
    Provider { reason: String },

    #[error("Cannot transition OAuth flow from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The same operation is already in flight.
    #[error("{operation} already in progress")]
    Busy { operation: String },

    #[error("Provider {provider} cannot be connected yet")]
    UnsupportedProvider { provider: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FlowError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Precondition(_) | Self::InvalidTransition { .. } | Self::Busy { .. } => {
                PLEASE_RETRY.to_string()
            }
            Self::Provider { reason } => format!("OAuth failed: {reason}"),
            Self::UnsupportedProvider { provider } => {
                format!("OAuth flow for {provider} will be implemented soon")
            }
            Self::Api(e) => e.user_message(),
        }
    }
}

/// Local draft snapshot errors. Logged, never shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Wizard step machine errors.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// Field-level structural errors; the wizard stays on its step.
    #[error("{} field(s) failed validation", .0.len())]
    Validation(FieldErrors),

    #[error("Step {step} is not reachable: {reason}")]
    InvalidStep { step: u8, reason: String },

    /// Creating the draft location failed; the wizard stays on step 1.
    #[error("Failed to save business profile: {0}")]
    Save(#[source] ApiError),

    /// The terminal submission failed; the wizard stays on the review step.
    #[error("Failed to submit onboarding: {0}")]
    Submit(#[source] ApiError),
}

impl WizardError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Please fill in all required fields correctly".to_string(),
            Self::InvalidStep { .. } => PLEASE_RETRY.to_string(),
            Self::Save(e) | Self::Submit(e) if Self::is_inline(e) => e.user_message(),
            Self::Save(_) => "Failed to save business profile. Please try again.".to_string(),
            Self::Submit(_) => "Failed to submit onboarding. Please try again.".to_string(),
        }
    }

    /// Whether the wizard can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Save(e) | Self::Submit(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Backend errors whose own text tells the user what to fix.
    fn is_inline(e: &ApiError) -> bool {
        matches!(e, ApiError::Auth { .. } | ApiError::Validation { .. })
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
