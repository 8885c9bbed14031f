//! The six-step onboarding wizard.

pub mod machine;
pub mod step;
pub mod validate;

pub use machine::{Advance, WizardStateMachine};
pub use step::{TOTAL_STEPS, WizardPhase, WizardStep};
pub use validate::{FieldErrors, validate_all, validate_step};
