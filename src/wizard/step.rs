//! Wizard steps and phases.

use serde::{Deserialize, Serialize};

/// Number of wizard steps; the last one is the review step.
pub const TOTAL_STEPS: u8 = 6;

/// A step ordinal in `1..=TOTAL_STEPS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WizardStep(u8);

impl WizardStep {
    pub const BUSINESS_PROFILE: WizardStep = WizardStep(1);
    pub const CONNECT_ACCOUNTS: WizardStep = WizardStep(2);
    pub const CONTENT_BRAND: WizardStep = WizardStep(3);
    pub const AUTONOMY: WizardStep = WizardStep(4);
    pub const GOALS_REPORTING: WizardStep = WizardStep(5);
    pub const REVIEW: WizardStep = WizardStep(TOTAL_STEPS);

    pub fn new(n: u8) -> Option<Self> {
        (1..=TOTAL_STEPS).contains(&n).then_some(Self(n))
    }

    pub fn first() -> Self {
        Self::BUSINESS_PROFILE
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn is_first(&self) -> bool {
        self.0 == 1
    }

    pub fn is_review(&self) -> bool {
        *self == Self::REVIEW
    }

    /// The following step, if any.
    pub fn next(&self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// The preceding step, if any.
    pub fn prev(&self) -> Option<Self> {
        Self::new(self.0.saturating_sub(1))
    }

    pub fn title(&self) -> &'static str {
        match self.0 {
            1 => "Business Profile",
            2 => "Connect Your Accounts",
            3 => "Content & Brand",
            4 => "Autonomy & Control",
            5 => "Goals & Reporting",
            _ => "Review & Launch",
        }
    }

    pub fn description(&self) -> &'static str {
        match self.0 {
            1 => {
                "We'll use this information to verify your NAP (Name, Address, Phone) consistency across all platforms."
            }
            2 => "Connect your accounts so we can manage your local SEO automatically.",
            3 => "Configure how your AI agents will create content for your brand.",
            4 => "Choose how much control you want. You can change this anytime.",
            5 => "Set your business goals and reporting preferences.",
            _ => "Review your setup before launching your agents.",
        }
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::first()
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n).ok_or_else(|| format!("step {n} is outside 1..={TOTAL_STEPS}"))
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> u8 {
        step.0
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, TOTAL_STEPS)
    }
}

/// Where the wizard is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum WizardPhase {
    Editing(WizardStep),
    /// The terminal submission is in flight.
    Submitting,
    /// Terminal.
    Submitted,
}

impl WizardPhase {
    /// The step being edited, if still editing.
    pub fn step(&self) -> Option<WizardStep> {
        match self {
            Self::Editing(step) => Some(*step),
            _ => None,
        }
    }
}
