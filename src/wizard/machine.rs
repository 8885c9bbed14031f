//! Step sequencing and validation gates for the onboarding wizard.

use std::sync::Arc;

use super::step::{WizardPhase, WizardStep};
use super::validate::{validate_all, validate_step};
use crate::api::{OnboardingBackend, SubmitResponse};
use crate::draft::{DraftSynchronizer, OnboardingDraft, OnboardingFields};
use crate::error::WizardError;

/// Result of a successful [`WizardStateMachine::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved(WizardStep),
    Submitted(SubmitResponse),
}

/// Drives the linear onboarding wizard.
///
/// Every field edit and step move is written to the local snapshot. Leaving
/// step 1 requires a draft location; leaving the review step performs the one
/// terminal submission and clears the snapshot.
pub struct WizardStateMachine {
    sync: Arc<DraftSynchronizer>,
    backend: Arc<dyn OnboardingBackend>,
    phase: WizardPhase,
    fields: OnboardingFields,
    restored: bool,
    submission: Option<SubmitResponse>,
}

impl WizardStateMachine {
    /// A fresh wizard at step 1 with default field values.
    pub fn new(sync: Arc<DraftSynchronizer>, backend: Arc<dyn OnboardingBackend>) -> Self {
        Self {
            sync,
            backend,
            phase: WizardPhase::Editing(WizardStep::first()),
            fields: OnboardingFields::default(),
            restored: false,
            submission: None,
        }
    }

    /// Start from the local snapshot if there is one.
    ///
    /// A stored step past the first is only honored when the snapshot also
    /// carries a location id.
    pub async fn resume(sync: Arc<DraftSynchronizer>, backend: Arc<dyn OnboardingBackend>) -> Self {
        let mut machine = Self::new(sync, backend);
        let Some(draft) = machine.sync.load().await else {
            return machine;
        };

        let stored = draft.step.and_then(WizardStep::new).unwrap_or_default();
        let step = if !stored.is_first() && draft.location_id.is_none() {
            tracing::info!(step = %stored, "Draft has no location yet, resuming at step 1");
            WizardStep::first()
        } else {
            stored
        };

        machine.fields = draft.fields;
        machine.phase = WizardPhase::Editing(step);
        machine.restored = true;
        tracing::info!(step = %step, location_id = ?draft.location_id, "Loaded saved progress");
        machine
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn step(&self) -> Option<WizardStep> {
        self.phase.step()
    }

    pub fn fields(&self) -> &OnboardingFields {
        &self.fields
    }

    /// Whether progress was loaded from a snapshot.
    pub fn restored(&self) -> bool {
        self.restored
    }

    pub fn submission(&self) -> Option<&SubmitResponse> {
        self.submission.as_ref()
    }

    pub async fn location_id(&self) -> Option<String> {
        self.sync.location_id().await
    }

    /// Change field values. The snapshot is rewritten immediately.
    pub async fn edit<F>(&mut self, change: F) -> Result<(), WizardError>
    where
        F: FnOnce(&mut OnboardingFields),
    {
        let step = self.editing_step()?;
        change(&mut self.fields);
        self.persist(step).await;
        Ok(())
    }

    /// Validate the current step and move forward.
    pub async fn advance(&mut self) -> Result<Advance, WizardError> {
        let step = self.editing_step()?;
        validate_step(step, &self.fields).map_err(|errors| {
            tracing::debug!(step = %step, fields = ?errors.keys().collect::<Vec<_>>(), "Step invalid");
            WizardError::Validation(errors)
        })?;

        if step.is_review() {
            return self.submit().await.map(Advance::Submitted);
        }

        if step.is_first() {
            self.sync
                .create_or_update(&self.fields)
                .await
                .map_err(WizardError::Save)?;
        }

        let next = step.next().ok_or_else(|| WizardError::InvalidStep {
            step: step.get(),
            reason: "no further step".to_string(),
        })?;
        self.phase = WizardPhase::Editing(next);
        self.persist(next).await;
        tracing::debug!(from = %step, to = %next, "Wizard advanced");
        Ok(Advance::Moved(next))
    }

    /// Terminal submission from the review step.
    ///
    /// On failure the wizard stays on the review step and the snapshot is
    /// kept so nothing the user entered is lost.
    pub async fn submit(&mut self) -> Result<SubmitResponse, WizardError> {
        let step = self.editing_step()?;
        if !step.is_review() {
            return Err(WizardError::InvalidStep {
                step: step.get(),
                reason: "submission happens from the review step".to_string(),
            });
        }
        validate_all(&self.fields).map_err(WizardError::Validation)?;

        self.phase = WizardPhase::Submitting;
        match self.backend.submit_onboarding(&self.fields).await {
            Ok(resp) => {
                self.phase = WizardPhase::Submitted;
                self.sync.clear().await;
                tracing::info!(
                    location_id = %resp.location_id,
                    user_id = %resp.user_id,
                    "Onboarding submitted"
                );
                self.submission = Some(resp.clone());
                Ok(resp)
            }
            Err(e) => {
                self.phase = WizardPhase::Editing(WizardStep::REVIEW);
                tracing::warn!(error = %e, "Onboarding submission failed");
                Err(WizardError::Submit(e))
            }
        }
    }

    /// Go back one step. No network effect.
    pub async fn retreat(&mut self) -> Result<WizardStep, WizardError> {
        let step = self.editing_step()?;
        let prev = step.prev().ok_or_else(|| WizardError::InvalidStep {
            step: step.get(),
            reason: "already at the first step".to_string(),
        })?;
        self.phase = WizardPhase::Editing(prev);
        self.persist(prev).await;
        Ok(prev)
    }

    /// Edit an earlier step from the review step.
    pub async fn jump_to(&mut self, target: WizardStep) -> Result<(), WizardError> {
        let step = self.editing_step()?;
        if !step.is_review() {
            return Err(WizardError::InvalidStep {
                step: target.get(),
                reason: "steps can only be revisited from the review step".to_string(),
            });
        }
        self.phase = WizardPhase::Editing(target);
        self.persist(target).await;
        Ok(())
    }

    fn editing_step(&self) -> Result<WizardStep, WizardError> {
        self.phase.step().ok_or_else(|| WizardError::InvalidStep {
            step: WizardStep::REVIEW.get(),
            reason: "onboarding has already been submitted".to_string(),
        })
    }

    async fn persist(&self, step: WizardStep) {
        self.sync
            .persist(&OnboardingDraft {
                fields: self.fields.clone(),
                location_id: None,
                step: Some(step.get()),
                saved_at: None,
            })
            .await;
    }
}
