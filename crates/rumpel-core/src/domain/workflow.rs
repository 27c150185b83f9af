//! Publish/delete workflow states

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// State of the share workflow for one editing session
///
/// ```text
/// Idle -> ValidatingToken -> [UploadingImage -> TogglingVisibility] -> Persisting -> Done
///                         \-> Deleting -> Done
/// any in-flight state -> Failed
/// Done | Failed -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    ValidatingToken,
    UploadingImage,
    TogglingVisibility,
    Persisting,
    Deleting,
    Done,
    Failed,
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::ValidatingToken => "ValidatingToken",
            WorkflowState::UploadingImage => "UploadingImage",
            WorkflowState::TogglingVisibility => "TogglingVisibility",
            WorkflowState::Persisting => "Persisting",
            WorkflowState::Deleting => "Deleting",
            WorkflowState::Done => "Done",
            WorkflowState::Failed => "Failed",
        }
    }

    /// Whether a publish or delete is currently in flight
    pub fn is_in_flight(&self) -> bool {
        !matches!(
            self,
            WorkflowState::Idle | WorkflowState::Done | WorkflowState::Failed
        )
    }

    pub fn can_transition_to(&self, target: WorkflowState) -> bool {
        use WorkflowState::*;

        if self.is_in_flight() && target == Failed {
            return true;
        }

        matches!(
            (self, target),
            (Idle, ValidatingToken)
                | (ValidatingToken, UploadingImage)
                | (ValidatingToken, Persisting)
                | (ValidatingToken, Deleting)
                | (UploadingImage, TogglingVisibility)
                | (TogglingVisibility, Persisting)
                | (Persisting, Done)
                | (Deleting, Done)
                // A cancelled confirmation or a dropped screen returns to Idle
                | (ValidatingToken, Idle)
                | (UploadingImage, Idle)
                | (TogglingVisibility, Idle)
                | (Persisting, Idle)
                | (Deleting, Idle)
                | (Done, Idle)
                | (Failed, Idle)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tracks the current workflow state and rejects invalid transitions
#[derive(Debug, Default)]
pub struct WorkflowTracker {
    state: WorkflowState,
}

impl WorkflowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if the transition is not allowed.
    pub fn transition_to(&mut self, target: WorkflowState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(target) {
            return Err(DomainError::InvalidState {
                from: self.state.name().to_string(),
                to: target.name().to_string(),
            });
        }
        self.state = target;
        Ok(())
    }

    /// Claims the tracker for a new run; false if one is already in flight
    pub fn try_begin(&mut self) -> bool {
        if self.state.is_in_flight() {
            return false;
        }
        self.state = WorkflowState::ValidatingToken;
        true
    }

    /// Returns to `Idle` from any state
    pub fn reset(&mut self) {
        self.state = WorkflowState::Idle;
    }
}
