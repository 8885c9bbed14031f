//! OAuth connection flow states.

use serde::{Deserialize, Serialize};

/// Where the connect flow currently is.
///
/// Happy path: Idle → Redirecting → AwaitingCallback → ResolvingAccounts →
/// Selecting → Saving → Connected. Any callback-side failure ends in Failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Idle,
    Redirecting,
    /// Control has left the process. A fresh controller starts here when the
    /// provider sends the user back.
    AwaitingCallback,
    ResolvingAccounts,
    Selecting,
    Saving,
    Connected,
    Failed,
}

impl FlowState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, target),
            (Idle | Failed | Connected, Redirecting)
                | (Idle | Redirecting, AwaitingCallback)
                | (AwaitingCallback, ResolvingAccounts | Failed)
                | (ResolvingAccounts, Selecting | Failed | Idle)
                | (Selecting, Saving | Idle)
                | (Saving, Connected | Selecting)
                | (Failed, Idle)
        )
    }

    /// Whether the flow has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }

    /// States in which a network call owned by the flow may be outstanding.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::Redirecting | Self::ResolvingAccounts | Self::Saving
        )
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Redirecting => "redirecting",
            Self::AwaitingCallback => "awaiting_callback",
            Self::ResolvingAccounts => "resolving_accounts",
            Self::Selecting => "selecting",
            Self::Saving => "saving",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
