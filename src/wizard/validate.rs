//! Structural field checks per wizard step.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::step::WizardStep;
use crate::draft::OnboardingFields;

/// Field name (camelCase, as the form knows it) to error text.
pub type FieldErrors = BTreeMap<String, String>;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d{3}\) \d{3}-\d{4}$").expect("phone pattern"));
static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time pattern"));

struct Checker {
    errors: FieldErrors,
}

impl Checker {
    fn new() -> Self {
        Self {
            errors: FieldErrors::new(),
        }
    }

    fn check(&mut self, field: &str, ok: bool, message: &str) {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.to_string());
        }
    }

    fn min_len(&mut self, field: &str, value: &str, min: usize, message: &str) {
        self.check(field, value.trim().chars().count() >= min, message);
    }

    fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn business_profile(f: &OnboardingFields, c: &mut Checker) {
    c.check(
        "email",
        EMAIL.is_match(f.email.trim()),
        "Please enter a valid email address",
    );
    c.min_len(
        "businessName",
        &f.business_name,
        2,
        "Business name must be at least 2 characters",
    );
    c.min_len(
        "streetAddress",
        &f.street_address,
        5,
        "Please enter a valid street address",
    );
    c.min_len("city", &f.city, 2, "Please enter a valid city");
    c.min_len("state", &f.state, 2, "Please enter a valid state");
    c.check(
        "zipCode",
        ZIP.is_match(f.zip_code.trim()),
        "Please enter a valid ZIP code",
    );
    c.check(
        "phone",
        PHONE.is_match(f.phone.trim()),
        "Format: (XXX) XXX-XXXX",
    );
    if let Some(url) = non_empty(&f.website_url) {
        c.check("websiteUrl", is_http_url(url), "Please enter a valid URL");
    }
    c.min_len(
        "primaryCategory",
        &f.primary_category,
        2,
        "Please enter your business category",
    );
    if let Some(radius) = f.coverage_radius {
        c.check(
            "coverageRadius",
            (1..=100).contains(&radius),
            "Coverage radius must be between 1 and 100 miles",
        );
    }
}

fn autonomy(f: &OnboardingFields, c: &mut Checker) {
    let start = non_empty(&f.blackout_start);
    let end = non_empty(&f.blackout_end);
    match (start, end) {
        (Some(start), Some(end)) => {
            c.check("blackoutStart", CLOCK.is_match(start), "Use HH:MM");
            c.check("blackoutEnd", CLOCK.is_match(end), "Use HH:MM");
        }
        (Some(_), None) => c.check("blackoutEnd", false, "Set both blackout times"),
        (None, Some(_)) => c.check("blackoutStart", false, "Set both blackout times"),
        (None, None) => {}
    }
}

fn goals_reporting(f: &OnboardingFields, c: &mut Checker) {
    if let Some(emails) = non_empty(&f.report_emails) {
        let all_valid = emails
            .split(',')
            .map(str::trim)
            .all(|e| EMAIL.is_match(e));
        c.check("reportEmails", all_valid, "Please enter a valid email");
    }
}

/// Check the fields owned by `step`. The review step checks everything.
pub fn validate_step(step: WizardStep, fields: &OnboardingFields) -> Result<(), FieldErrors> {
    let mut c = Checker::new();
    match step {
        WizardStep::BUSINESS_PROFILE => business_profile(fields, &mut c),
        WizardStep::AUTONOMY => autonomy(fields, &mut c),
        WizardStep::GOALS_REPORTING => goals_reporting(fields, &mut c),
        WizardStep::REVIEW => return validate_all(fields),
        // Connect accounts has no fields; content cadences are typed.
        _ => {}
    }
    c.finish()
}

/// Check every step's fields.
pub fn validate_all(fields: &OnboardingFields) -> Result<(), FieldErrors> {
    let mut c = Checker::new();
    business_profile(fields, &mut c);
    autonomy(fields, &mut c);
    goals_reporting(fields, &mut c);
    c.finish()
}
