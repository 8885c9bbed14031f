//! Location onboarding: provider OAuth linking and a resumable setup wizard.

pub mod api;
pub mod auth;
pub mod config;
pub mod connections;
pub mod draft;
pub mod error;
pub mod oauth;
pub mod wizard;
