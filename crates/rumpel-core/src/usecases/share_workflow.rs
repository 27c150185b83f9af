//! Share workflow use case
//!
//! Runs one publish or delete of a note as a sequence of awaited steps:
//!
//! 1. Policy checks and confirmations
//! 2. Token validation through [`TokenGuard`]
//! 3. Image upload, then one best-effort visibility call
//! 4. Delete of the previous record when editing, then create
//!
//! New notes and edits of existing notes go through the same path; the
//! [`EditContext`] decides whether the delete step runs. The liveness
//! token is checked after every suspension point and a dropped session
//! ends the run with `Abandoned`, without any further UI.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::{
    AccessToken, FileId, FileVisibility, HatDomain, Note, NoteId, PendingImage, RunId,
    WorkflowState, WorkflowTracker,
};
use crate::ports::{Alert, HatApiError, HatService, Interaction, Prompt, UploadProgress};
use crate::token_store::TokenStore;

use super::error::WorkflowError;
use super::token_guard::TokenGuard;

// ============================================================================
// Requests and outcomes
// ============================================================================

/// What the session knew about the note when editing started
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditContext {
    /// Record to delete before the updated note is created
    pub existing_id: Option<NoteId>,
    /// Whether the note was shared when editing started
    pub was_shared: bool,
    /// Message when editing started
    pub original_message: String,
}

impl EditContext {
    /// Context for a note that has never been persisted
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Context for editing `note` as loaded from the HAT
    pub fn editing(note: &Note) -> Self {
        Self {
            existing_id: note.id().cloned(),
            was_shared: note.is_shared(),
            original_message: note.message().to_string(),
        }
    }

    pub fn is_editing_existing(&self) -> bool {
        self.existing_id.is_some()
    }
}

/// Input of a publish run
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub note: &'a Note,
    pub image: Option<&'a PendingImage>,
    pub context: &'a EditContext,
}

/// Result of a publish run
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// The note was created; carries the note as stored, with its new id
    Published(Note),
    /// The user cancelled a confirmation or a policy check stopped the run
    Cancelled,
    /// The session went away while the run was suspended
    Abandoned,
    /// A step failed; the error has already been shown to the user
    Failed(WorkflowError),
}

/// Result of a delete run
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    /// The note was never persisted
    NothingToDelete,
    Cancelled,
    Abandoned,
    /// The delete failed; the error has already been shown to the user
    Failed(WorkflowError),
}

// ============================================================================
// Run slot
// ============================================================================

/// Exclusive claim on the workflow for one run
///
/// Dropping the slot while a run is still in flight returns the workflow
/// to `Idle`, so early returns always leave it usable.
struct RunSlot<'a> {
    tracker: &'a Mutex<WorkflowTracker>,
}

impl<'a> RunSlot<'a> {
    fn claim(tracker: &'a Mutex<WorkflowTracker>) -> Result<Self, WorkflowError> {
        let mut guard = tracker.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard.try_begin() {
            return Err(WorkflowError::Busy);
        }
        Ok(Self { tracker })
    }

    fn advance(&self, state: WorkflowState) {
        let mut guard = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = guard.transition_to(state) {
            warn!(error = %e, "Unexpected workflow transition");
        }
    }
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        let mut guard = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.state().is_in_flight() {
            guard.reset();
        }
    }
}

// ============================================================================
// ShareWorkflow
// ============================================================================

/// Publishes and deletes notes for one editing session
pub struct ShareWorkflow {
    hat: Arc<dyn HatService>,
    tokens: Arc<TokenStore>,
    guard: Arc<TokenGuard>,
    interaction: Arc<dyn Interaction>,
    domain: HatDomain,
    tracker: Mutex<WorkflowTracker>,
}

impl ShareWorkflow {
    pub fn new(
        hat: Arc<dyn HatService>,
        tokens: Arc<TokenStore>,
        guard: Arc<TokenGuard>,
        interaction: Arc<dyn Interaction>,
    ) -> Self {
        let domain = guard.domain().clone();
        Self {
            hat,
            tokens,
            guard,
            interaction,
            domain,
            tracker: Mutex::new(WorkflowTracker::new()),
        }
    }

    /// Current state of the workflow
    pub fn state(&self) -> WorkflowState {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    /// Publishes a note
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Busy` if another publish or delete is in
    /// flight. Every other failure is reported as `PublishOutcome::Failed`
    /// after the user has been alerted.
    pub async fn publish(
        &self,
        request: PublishRequest<'_>,
        liveness: &CancellationToken,
    ) -> Result<PublishOutcome, WorkflowError> {
        let slot = RunSlot::claim(&self.tracker)?;
        let run_id = RunId::new();
        let span = info_span!(
            "publish",
            %run_id,
            editing = request.context.is_editing_existing(),
            shared = request.note.is_shared()
        );
        Ok(self
            .run_publish(&slot, request, liveness)
            .instrument(span)
            .await)
    }

    /// Deletes a persisted note
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Busy` if another publish or delete is in
    /// flight.
    pub async fn delete(
        &self,
        note_id: Option<&NoteId>,
        was_shared: bool,
        liveness: &CancellationToken,
    ) -> Result<DeleteOutcome, WorkflowError> {
        let Some(note_id) = note_id else {
            return Ok(DeleteOutcome::NothingToDelete);
        };
        let slot = RunSlot::claim(&self.tracker)?;
        let run_id = RunId::new();
        let span = info_span!("delete", %run_id, note_id = %note_id);
        Ok(self
            .run_delete(&slot, note_id, was_shared, liveness)
            .instrument(span)
            .await)
    }

    async fn run_publish(
        &self,
        slot: &RunSlot<'_>,
        request: PublishRequest<'_>,
        liveness: &CancellationToken,
    ) -> PublishOutcome {
        let PublishRequest {
            note,
            image,
            context,
        } = request;

        // Step 1: a shared note needs somewhere to go
        if note.is_shared() && note.shared_on().is_empty() {
            self.interaction.alert(&Alert::missing_destination()).await;
            return PublishOutcome::Cancelled;
        }

        // Step 2: make sure the token is usable before asking anything
        if let Err(e) = self.guard.ensure_valid().await {
            return self.publish_failed(slot, e, liveness).await;
        }
        if liveness.is_cancelled() {
            return PublishOutcome::Abandoned;
        }

        if let Some(prompt) = publish_confirmation(note, context) {
            let choice = self.interaction.confirm(&prompt).await;
            if liveness.is_cancelled() {
                return PublishOutcome::Abandoned;
            }
            if !choice.is_proceed() {
                info!("Publish cancelled at confirmation");
                return PublishOutcome::Cancelled;
            }
        }

        let mut outgoing = note.clone();

        // Step 3: upload the pending image and set its visibility
        if let Some(image) = image {
            slot.advance(WorkflowState::UploadingImage);
            let file_id = match self.upload(image).await {
                Ok(file_id) => file_id,
                Err(e) => {
                    if liveness.is_cancelled() {
                        return PublishOutcome::Abandoned;
                    }
                    error!(error = %e, "Image upload failed");
                    self.interaction.alert(&Alert::upload_failed()).await;
                    slot.advance(WorkflowState::Failed);
                    return PublishOutcome::Failed(e);
                }
            };
            if liveness.is_cancelled() {
                return PublishOutcome::Abandoned;
            }

            slot.advance(WorkflowState::TogglingVisibility);
            self.propagate_visibility(&file_id, FileVisibility::for_shared(outgoing.is_shared()))
                .await;
            outgoing.set_photo_link(self.domain.file_content_url(&file_id));
            if liveness.is_cancelled() {
                return PublishOutcome::Abandoned;
            }
        }

        // Step 4: delete the previous record, then create the new one
        slot.advance(WorkflowState::Persisting);
        if let Some(previous) = context.existing_id.as_ref() {
            if let Err(e) = self.delete_remote(previous).await {
                return self.publish_failed(slot, e, liveness).await;
            }
            if liveness.is_cancelled() {
                return PublishOutcome::Abandoned;
            }
        }

        outgoing.set_id(None);
        outgoing.touch();
        match self.create_remote(&outgoing).await {
            Ok(id) => {
                info!(note_id = %id, "Note published");
                outgoing.set_id(Some(id));
                slot.advance(WorkflowState::Done);
                if liveness.is_cancelled() {
                    return PublishOutcome::Abandoned;
                }
                PublishOutcome::Published(outgoing)
            }
            Err(e) => self.publish_failed(slot, e, liveness).await,
        }
    }

    async fn run_delete(
        &self,
        slot: &RunSlot<'_>,
        note_id: &NoteId,
        was_shared: bool,
        liveness: &CancellationToken,
    ) -> DeleteOutcome {
        if let Err(e) = self.guard.ensure_valid().await {
            return self.delete_failed(slot, e, liveness).await;
        }
        if liveness.is_cancelled() {
            return DeleteOutcome::Abandoned;
        }

        if was_shared {
            let choice = self.interaction.confirm(&Prompt::delete_shared_note()).await;
            if liveness.is_cancelled() {
                return DeleteOutcome::Abandoned;
            }
            if !choice.is_proceed() {
                info!("Delete cancelled at confirmation");
                return DeleteOutcome::Cancelled;
            }
        }

        slot.advance(WorkflowState::Deleting);
        if let Err(e) = self.delete_remote(note_id).await {
            return self.delete_failed(slot, e, liveness).await;
        }
        slot.advance(WorkflowState::Done);
        info!("Note deleted");

        if liveness.is_cancelled() {
            return DeleteOutcome::Abandoned;
        }
        DeleteOutcome::Deleted
    }

    // --- steps ---

    async fn current_token(&self) -> Result<AccessToken, WorkflowError> {
        self.tokens
            .current()
            .await
            .ok_or(WorkflowError::TokenExpired)
    }

    async fn upload(&self, image: &PendingImage) -> Result<FileId, WorkflowError> {
        let token = self.current_token().await?;
        let interaction = Arc::clone(&self.interaction);
        let progress: UploadProgress = Box::new(move |sent, total| {
            if total > 0 {
                interaction.progress(sent as f64 / total as f64);
            }
        });

        let result = self
            .hat
            .upload_file(&token, image, Some(progress))
            .await?;
        let file_id = self.tokens.absorb(result).await;
        info!(file_id = %file_id, bytes = image.len(), "Image uploaded");
        Ok(file_id)
    }

    async fn propagate_visibility(&self, file_id: &FileId, visibility: FileVisibility) {
        let token = match self.current_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Skipping file visibility update");
                return;
            }
        };
        match self
            .hat
            .set_file_visibility(&token, file_id, visibility)
            .await
        {
            Ok(result) => {
                self.tokens.absorb(result).await;
                info!(file_id = %file_id, %visibility, "File visibility updated");
            }
            Err(e) => {
                warn!(file_id = %file_id, %visibility, error = %e, "Failed to update file visibility");
            }
        }
    }

    async fn delete_remote(&self, note_id: &NoteId) -> Result<(), WorkflowError> {
        let token = self.current_token().await?;
        match self.hat.delete_note(&token, note_id).await {
            Ok(result) => {
                self.tokens.absorb(result).await;
                Ok(())
            }
            Err(HatApiError::NotFound(_)) => {
                warn!(note_id = %note_id, "Note already gone from the HAT");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_remote(&self, note: &Note) -> Result<NoteId, WorkflowError> {
        let token = self.current_token().await?;
        let result = self.hat.post_note(&token, note).await?;
        Ok(self.tokens.absorb(result).await)
    }

    // --- failure reporting ---

    async fn report_failure(
        &self,
        slot: &RunSlot<'_>,
        err: &WorkflowError,
        liveness: &CancellationToken,
    ) -> bool {
        if liveness.is_cancelled() {
            return false;
        }
        error!(error = %err, "Workflow step failed");
        self.interaction.alert(&err.to_alert()).await;
        slot.advance(WorkflowState::Failed);
        true
    }

    async fn publish_failed(
        &self,
        slot: &RunSlot<'_>,
        err: WorkflowError,
        liveness: &CancellationToken,
    ) -> PublishOutcome {
        if self.report_failure(slot, &err, liveness).await {
            PublishOutcome::Failed(err)
        } else {
            PublishOutcome::Abandoned
        }
    }

    async fn delete_failed(
        &self,
        slot: &RunSlot<'_>,
        err: WorkflowError,
        liveness: &CancellationToken,
    ) -> DeleteOutcome {
        if self.report_failure(slot, &err, liveness).await {
            DeleteOutcome::Failed(err)
        } else {
            DeleteOutcome::Abandoned
        }
    }
}

/// The confirmation shown before a publish, if any
fn publish_confirmation(note: &Note, context: &EditContext) -> Option<Prompt> {
    if context.is_editing_existing()
        && context.was_shared
        && note.message() != context.original_message
    {
        Some(Prompt::edit_not_propagated())
    } else if note.is_shared() {
        Some(Prompt::share_now())
    } else {
        None
    }
}
