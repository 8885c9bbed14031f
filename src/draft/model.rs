//! Wizard field set and the locally persisted draft snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often blog articles are drafted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlogCadence {
    Off,
    Monthly,
    Biweekly,
    Weekly,
}

/// How often Business Profile posts are drafted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GbpCadence {
    Off,
    Weekly,
    Biweekly,
    Triweekly,
}

/// Social posts per week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocialCadence {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "3x")]
    ThreePerWeek,
    #[serde(rename = "5x")]
    FivePerWeek,
    #[serde(rename = "7x")]
    Daily,
}

/// Whether agents publish on their own or leave drafts for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyMode {
    Draft,
    Autopilot,
}

impl Default for AutonomyMode {
    fn default() -> Self {
        Self::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    Calls,
    Forms,
    Bookings,
    Directions,
}

/// Every field the wizard collects, across all steps.
///
/// Serialized in the backend's camelCase form; missing keys fall back to
/// [`Default`] so partially filled drafts load cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnboardingFields {
    // Business profile (name, address, phone)
    pub email: String,
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dba_name: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cms_platform: Option<String>,
    pub primary_category: String,
    /// Newline-separated list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
    /// Miles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_radius: Option<u32>,

    // Content & brand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forbidden_words: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forbidden_topics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_cadence: Option<BlogCadence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gbp_cadence: Option<GbpCadence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_cadence: Option<SocialCadence>,

    // Autonomy & control
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_autonomy: Option<AutonomyMode>,
    /// `HH:MM`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackout_start: Option<String>,
    /// `HH:MM`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackout_end: Option<String>,

    // Goals & reporting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_goal: Option<PrimaryGoal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_report: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_report: Option<bool>,
    /// Comma-separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_emails: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
}

impl Default for OnboardingFields {
    fn default() -> Self {
        Self {
            email: String::new(),
            business_name: String::new(),
            dba_name: None,
            street_address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            phone: String::new(),
            phone_secondary: None,
            website_url: None,
            cms_platform: None,
            primary_category: String::new(),
            services: None,
            coverage_radius: None,
            brand_tone: None,
            forbidden_words: None,
            forbidden_topics: None,
            blog_cadence: Some(BlogCadence::Monthly),
            gbp_cadence: Some(GbpCadence::Weekly),
            social_cadence: None,
            global_autonomy: Some(AutonomyMode::default()),
            blackout_start: None,
            blackout_end: None,
            primary_goal: None,
            weekly_report: Some(true),
            monthly_report: Some(true),
            report_emails: None,
            utm_campaign: None,
        }
    }
}

/// Step-1 subset sent to `create-location`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dba_name: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cms_platform: Option<String>,
    pub primary_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

impl From<&OnboardingFields> for BusinessProfile {
    fn from(f: &OnboardingFields) -> Self {
        Self {
            business_name: f.business_name.clone(),
            dba_name: f.dba_name.clone(),
            street_address: f.street_address.clone(),
            city: f.city.clone(),
            state: f.state.clone(),
            zip_code: f.zip_code.clone(),
            phone: f.phone.clone(),
            phone_secondary: f.phone_secondary.clone(),
            website_url: f.website_url.clone(),
            cms_platform: f.cms_platform.clone(),
            primary_category: f.primary_category.clone(),
            services: f.services.clone(),
        }
    }
}

/// The local snapshot: all field values plus the draft location id.
///
/// Invariant: `location_id` is only set once the backend has confirmed the
/// location exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDraft {
    #[serde(flatten)]
    pub fields: OnboardingFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Wizard step the user was on when the snapshot was written.
    #[serde(default, rename = "currentStep", skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}
