//! Note listing use case

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Note, NoteId};
use crate::ports::HatService;
use crate::token_store::TokenStore;

use super::error::WorkflowError;
use super::token_guard::TokenGuard;

/// Reads the user's notes back from the HAT
pub struct ListNotesUseCase {
    hat: Arc<dyn HatService>,
    tokens: Arc<TokenStore>,
    guard: Arc<TokenGuard>,
}

impl ListNotesUseCase {
    pub fn new(hat: Arc<dyn HatService>, tokens: Arc<TokenStore>, guard: Arc<TokenGuard>) -> Self {
        Self { hat, tokens, guard }
    }

    /// All notes, most recently updated first
    pub async fn list(&self) -> Result<Vec<Note>, WorkflowError> {
        let token = self.guard.ensure_valid().await?;
        let result = self.hat.fetch_notes(&token).await?;
        let notes = self.tokens.absorb(result).await;
        debug!(count = notes.len(), "Fetched notes");
        Ok(notes)
    }

    /// The note with record id `id`
    pub async fn find(&self, id: &NoteId) -> Result<Note, WorkflowError> {
        self.list()
            .await?
            .into_iter()
            .find(|note| note.id() == Some(id))
            .ok_or_else(|| WorkflowError::Validation(format!("No note with id {id}")))
    }
}
