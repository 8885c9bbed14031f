//! Draft location synchronization.
//!
//! The wizard's field values are autosaved to a local snapshot on every
//! change. Completing the first step creates a draft location server-side;
//! its id is stored in the snapshot and reused across reloads so the same
//! draft is never created twice.

pub mod model;
pub mod store;
pub mod sync;

pub use model::{
    AutonomyMode, BlogCadence, BusinessProfile, GbpCadence, OnboardingDraft, OnboardingFields,
    PrimaryGoal, SocialCadence,
};
pub use store::{DRAFT_KEY, DraftStore, FileDraftStore, MemoryDraftStore};
pub use sync::DraftSynchronizer;
