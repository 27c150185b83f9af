//! Note editing session
//!
//! A [`NoteEditor`] owns the note being written or edited and applies the
//! user's changes to it: text, public/private, destinations, duration,
//! location and image. Publishing and deleting are handed to
//! [`ShareWorkflow`]; selecting a social destination goes through
//! [`DataPlugActivator`] first.
//!
//! Dropping the editor cancels its liveness token, so any run still
//! suspended on its behalf ends quietly.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{
    LocationData, Note, NoteKind, PendingImage, ShareDestination, ShareDuration, ShareStatus,
};
use crate::ports::{Interaction, Prompt};

use super::data_plug_activator::{ActivationOutcome, DataPlugActivator};
use super::error::WorkflowError;
use super::share_workflow::{
    DeleteOutcome, EditContext, PublishOutcome, PublishRequest, ShareWorkflow,
};

/// Whether a toggle took effect or snapped back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied,
    Reverted,
}

/// Services an editing session delegates to
#[derive(Clone)]
pub struct EditorServices {
    pub workflow: Arc<ShareWorkflow>,
    pub activator: Arc<DataPlugActivator>,
    pub interaction: Arc<dyn Interaction>,
}

/// Editing session over one note
pub struct NoteEditor {
    note: Note,
    pending_image: Option<PendingImage>,
    context: EditContext,
    services: EditorServices,
    liveness: CancellationToken,
}

impl NoteEditor {
    /// Starts a new, unpersisted note
    pub fn new_note(kind: NoteKind, services: EditorServices) -> Self {
        Self {
            note: Note::new(kind),
            pending_image: None,
            context: EditContext::fresh(),
            services,
            liveness: CancellationToken::new(),
        }
    }

    /// Starts editing a note loaded from the HAT
    pub fn edit(note: Note, services: EditorServices) -> Self {
        let context = EditContext::editing(&note);
        Self {
            note,
            pending_image: None,
            context,
            services,
            liveness: CancellationToken::new(),
        }
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        self.pending_image.as_ref()
    }

    pub fn is_editing_existing(&self) -> bool {
        self.context.is_editing_existing()
    }

    /// Whether the note was shared when the session started
    pub fn was_shared(&self) -> bool {
        self.context.was_shared
    }

    /// Token cancelled when the session ends
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.clone()
    }

    /// Ends the session; runs still suspended on its behalf are abandoned
    pub fn close(&self) {
        self.liveness.cancel();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.note.set_message(message);
    }

    /// Switches the note between public and private
    ///
    /// Making a previously shared note private asks first. Cancelling
    /// leaves the note public; proceeding clears destinations and resets
    /// the duration to "Forever".
    pub async fn toggle_public(&mut self, public: bool) -> ToggleOutcome {
        if !public && self.note.is_shared() && self.context.was_shared {
            let choice = self
                .services
                .interaction
                .confirm(&Prompt::make_private())
                .await;
            if !choice.is_proceed() {
                debug!("Keeping note public");
                return ToggleOutcome::Reverted;
            }
        }
        self.note.set_shared(public);
        ToggleOutcome::Applied
    }

    /// Selects or deselects a destination
    ///
    /// Selecting runs the data plug check; anything short of an active
    /// plug leaves the destination unselected. Destinations can only be
    /// changed while the note is public.
    pub async fn toggle_destination(&mut self, destination: ShareDestination) -> ToggleOutcome {
        if !self.note.is_shared() {
            debug!(destination = %destination, "Destinations are locked while the note is private");
            return ToggleOutcome::Reverted;
        }
        if self.note.shared_on().contains(destination) {
            self.note.remove_destination(destination);
            return ToggleOutcome::Applied;
        }

        let outcome = self
            .services
            .activator
            .ensure_active(destination, &self.liveness)
            .await;

        match outcome {
            Ok(ActivationOutcome::AlreadyActive) => {
                self.note.add_destination(destination);
                ToggleOutcome::Applied
            }
            Ok(ActivationOutcome::Activated { offer_claimed }) => {
                // MarketSquare is only usable once its offer is held
                if destination.requires_data_plug() || offer_claimed {
                    self.note.add_destination(destination);
                    ToggleOutcome::Applied
                } else {
                    ToggleOutcome::Reverted
                }
            }
            Ok(ActivationOutcome::Declined) | Ok(ActivationOutcome::Abandoned) => {
                ToggleOutcome::Reverted
            }
            Err(e) => {
                debug!(destination = %destination, error = %e, "Destination not added");
                ToggleOutcome::Reverted
            }
        }
    }

    /// Sets how long the note stays public, counted from now
    pub fn set_share_duration(&mut self, duration: ShareDuration) {
        self.note.apply_share_duration(duration, Utc::now());
    }

    pub fn set_location(&mut self, location: LocationData) {
        self.note.set_location(location);
    }

    pub fn clear_location(&mut self) {
        self.note.clear_location();
    }

    /// Attaches an image to upload on the next publish
    pub fn attach_image(&mut self, image: PendingImage) {
        self.pending_image = Some(image);
    }

    /// Drops the pending image and any photo already linked to the note
    pub fn remove_image(&mut self) {
        self.pending_image = None;
        self.note.clear_photo();
    }

    /// Text of the duration control
    pub fn share_status_label(&self) -> String {
        match self.note.share_status(Utc::now()) {
            ShareStatus::Private => ShareDuration::Forever.label().to_string(),
            status => status.to_string(),
        }
    }

    /// Publishes the note
    ///
    /// On success the session continues on the stored note, so a second
    /// publish edits the record that was just created.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Busy` if a run is already in flight.
    pub async fn publish(&mut self) -> Result<PublishOutcome, WorkflowError> {
        let outcome = self
            .services
            .workflow
            .publish(
                PublishRequest {
                    note: &self.note,
                    image: self.pending_image.as_ref(),
                    context: &self.context,
                },
                &self.liveness,
            )
            .await?;

        if let PublishOutcome::Published(stored) = &outcome {
            info!(note_id = ?stored.id().map(|id| id.as_str()), "Editor now tracks stored note");
            self.note = stored.clone();
            self.pending_image = None;
            self.context = EditContext::editing(stored);
        }
        Ok(outcome)
    }

    /// Deletes the note from the HAT
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Busy` if a run is already in flight.
    pub async fn delete(&mut self) -> Result<DeleteOutcome, WorkflowError> {
        let outcome = self
            .services
            .workflow
            .delete(
                self.context.existing_id.as_ref(),
                self.context.was_shared,
                &self.liveness,
            )
            .await?;

        if outcome == DeleteOutcome::Deleted {
            self.note.set_id(None);
            self.context = EditContext::fresh();
        }
        Ok(outcome)
    }
}

impl Drop for NoteEditor {
    fn drop(&mut self) {
        self.liveness.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NoteId, SharedOn, DEFAULT_OFFER_ID};
    use crate::ports::{Choice, HatApiError};
    use crate::testing::{domain, token_store, AuthScript, MockAuth, MockHat, MockInteraction};
    use crate::usecases::TokenGuard;

    struct Fixture {
        services: EditorServices,
        hat: Arc<MockHat>,
        interaction: Arc<MockInteraction>,
    }

    fn fixture(choices: Vec<Choice>) -> Fixture {
        let hat = MockHat::arc();
        let interaction = Arc::new(MockInteraction::scripted(choices));
        let tokens = token_store("initial");
        let guard = Arc::new(TokenGuard::new(
            hat.clone(),
            tokens.clone(),
            Arc::new(MockAuth::new(AuthScript::Cancel)),
            domain(),
        ));
        let workflow = Arc::new(ShareWorkflow::new(
            hat.clone(),
            tokens.clone(),
            guard.clone(),
            interaction.clone(),
        ));
        let activator = Arc::new(DataPlugActivator::new(
            hat.clone(),
            tokens,
            guard,
            interaction.clone(),
            DEFAULT_OFFER_ID,
        ));
        Fixture {
            services: EditorServices {
                workflow,
                activator,
                interaction: interaction.clone(),
            },
            hat,
            interaction,
        }
    }

    fn stored_shared_note() -> Note {
        Note::new(NoteKind::Note)
            .with_id(NoteId::new("rec-1").unwrap())
            .with_message("original")
            .with_sharing(true, SharedOn::parse("facebook,"), None)
    }

    #[tokio::test]
    async fn test_declining_facebook_leaves_destinations_empty() {
        let fx = fixture(vec![Choice::Cancel]);
        fx.hat.set_plug_active("facebook", Ok(false));
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());

        assert_eq!(editor.toggle_public(true).await, ToggleOutcome::Applied);
        let outcome = editor.toggle_destination(ShareDestination::Facebook).await;

        assert_eq!(outcome, ToggleOutcome::Reverted);
        assert!(editor.note().shared_on().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_off_shared_note_confirms_and_clears() {
        let fx = fixture(vec![Choice::Proceed]);
        let mut editor = NoteEditor::edit(stored_shared_note(), fx.services.clone());
        editor.set_share_duration(ShareDuration::SevenDays);
        assert!(editor.share_status_label().starts_with("Shared until"));

        let outcome = editor.toggle_public(false).await;

        assert_eq!(outcome, ToggleOutcome::Applied);
        assert_eq!(fx.interaction.prompts(), vec![Prompt::make_private()]);
        assert!(editor.note().shared_on().is_empty());
        assert!(editor.note().public_until().is_none());
        assert_eq!(editor.share_status_label(), "Forever");
    }

    #[tokio::test]
    async fn test_toggle_off_cancel_keeps_note_public() {
        let fx = fixture(vec![Choice::Cancel]);
        let mut editor = NoteEditor::edit(stored_shared_note(), fx.services.clone());

        let outcome = editor.toggle_public(false).await;

        assert_eq!(outcome, ToggleOutcome::Reverted);
        assert!(editor.note().is_shared());
        assert!(editor.note().shared_on().contains(ShareDestination::Facebook));
    }

    #[tokio::test]
    async fn test_toggle_off_never_shared_note_has_no_prompt() {
        let fx = fixture(vec![]);
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());
        editor.toggle_public(true).await;

        editor.toggle_public(false).await;

        assert!(fx.interaction.prompts().is_empty());
        assert!(!editor.note().is_shared());
    }

    #[tokio::test]
    async fn test_edited_shared_note_confirms_before_delete_then_create() {
        let fx = fixture(vec![]);
        let mut editor = NoteEditor::edit(stored_shared_note(), fx.services.clone());
        editor.set_message("edited");

        let outcome = editor.publish().await.unwrap();

        assert!(matches!(outcome, PublishOutcome::Published(_)));
        assert_eq!(
            fx.interaction.prompts(),
            vec![Prompt::edit_not_propagated()]
        );
        assert_eq!(fx.hat.ops(), vec!["validate_token", "delete_note", "post_note"]);
        assert_eq!(editor.note().id().unwrap().as_str(), "note-1");
        assert!(editor.is_editing_existing());
    }

    #[tokio::test]
    async fn test_destinations_locked_while_private() {
        let fx = fixture(vec![]);
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());

        let outcome = editor.toggle_destination(ShareDestination::Twitter).await;

        assert_eq!(outcome, ToggleOutcome::Reverted);
        assert!(fx.hat.ops().is_empty());
    }

    #[tokio::test]
    async fn test_active_plug_adds_destination_and_deselect_removes() {
        let fx = fixture(vec![]);
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());
        editor.toggle_public(true).await;

        assert_eq!(
            editor.toggle_destination(ShareDestination::Twitter).await,
            ToggleOutcome::Applied
        );
        assert!(editor.note().shared_on().contains(ShareDestination::Twitter));

        assert_eq!(
            editor.toggle_destination(ShareDestination::Twitter).await,
            ToggleOutcome::Applied
        );
        assert!(editor.note().shared_on().is_empty());
    }

    #[tokio::test]
    async fn test_marketsquare_removed_when_claim_fails() {
        let fx = fixture(vec![]);
        *fx.hat.claim_result.lock().unwrap() = Err(HatApiError::Network("offline".into()));
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());
        editor.toggle_public(true).await;

        let outcome = editor.toggle_destination(ShareDestination::MarketSquare).await;

        assert_eq!(outcome, ToggleOutcome::Reverted);
        assert!(!editor.note().shared_on().contains(ShareDestination::MarketSquare));
    }

    #[tokio::test]
    async fn test_facebook_kept_when_only_offer_fails() {
        let fx = fixture(vec![Choice::Proceed]);
        fx.hat.set_plug_active("facebook", Ok(false));
        *fx.hat.claim_result.lock().unwrap() = Err(HatApiError::Network("offline".into()));
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());
        editor.toggle_public(true).await;

        let outcome = editor.toggle_destination(ShareDestination::Facebook).await;

        assert_eq!(outcome, ToggleOutcome::Applied);
        assert!(editor.note().shared_on().contains(ShareDestination::Facebook));
    }

    #[tokio::test]
    async fn test_publish_with_image_clears_pending_image() {
        let fx = fixture(vec![]);
        let mut editor = NoteEditor::new_note(NoteKind::Blog, fx.services.clone());
        editor.set_message("photo post");
        editor.attach_image(PendingImage::new("p.jpg", "image/jpeg", vec![1, 2, 3, 4]));

        editor.publish().await.unwrap();

        assert!(editor.pending_image().is_none());
        assert!(editor.note().photo().is_some());
        assert_eq!(fx.hat.count("upload_file"), 1);
        assert_eq!(fx.hat.count("set_file_visibility"), 1);
    }

    #[tokio::test]
    async fn test_remove_image_clears_photo_link() {
        let fx = fixture(vec![]);
        let note = stored_shared_note().with_photo_link("https://alice.hat.net/api/v2/files/content/x");
        let mut editor = NoteEditor::edit(note, fx.services.clone());
        editor.attach_image(PendingImage::new("p.jpg", "image/jpeg", vec![1]));

        editor.remove_image();

        assert!(editor.pending_image().is_none());
        assert!(editor.note().photo().is_none());
    }

    #[tokio::test]
    async fn test_delete_resets_session() {
        let fx = fixture(vec![Choice::Proceed]);
        let mut editor = NoteEditor::edit(stored_shared_note(), fx.services.clone());

        let outcome = editor.delete().await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(fx.interaction.prompts(), vec![Prompt::delete_shared_note()]);
        assert!(!editor.is_editing_existing());
        assert!(editor.note().id().is_none());
    }

    #[tokio::test]
    async fn test_closed_session_abandons_publish() {
        let fx = fixture(vec![]);
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());
        editor.close();

        let outcome = editor.publish().await.unwrap();

        assert_eq!(outcome, PublishOutcome::Abandoned);
        assert_eq!(fx.hat.count("post_note"), 0);
    }

    #[tokio::test]
    async fn test_location_set_and_cleared() {
        let fx = fixture(vec![]);
        let mut editor = NoteEditor::new_note(NoteKind::Note, fx.services.clone());

        editor.set_location(LocationData::new(51.5, -0.12, 0.0).unwrap());
        assert_eq!(editor.note().location().map(|l| l.accuracy), Some(0.0));

        editor.set_location(LocationData::new(51.5, -0.12, 8.0).unwrap());
        assert_eq!(editor.note().location().map(|l| l.accuracy), Some(8.0));

        editor.clear_location();
        assert!(editor.note().location().is_none());
    }
}
