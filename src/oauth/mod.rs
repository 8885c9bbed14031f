//! OAuth connection lifecycle: redirect, callback, disambiguation, link save.

pub mod accounts;
pub mod callback;
pub mod controller;
pub mod routes;
pub mod state;

pub use accounts::{Candidate, GoogleAccount, GoogleAccounts, GoogleLocation, ProviderAccounts};
pub use callback::{CallbackContext, CallbackKind};
pub use controller::{
    FlowOutcome, FlowSnapshot, Navigation, Notice, NoticeLevel, OAuthFlowController, SIGN_IN_PATH,
    WIZARD_PATH,
};
pub use routes::{CallbackRouteState, callback_routes};
pub use state::FlowState;
