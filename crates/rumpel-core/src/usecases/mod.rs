//! Use cases (interactors) for Rumpel
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`TokenGuard`] - Token validity check and interactive reauthorization
//! - [`ShareWorkflow`] - Publish and delete of a note
//! - [`DataPlugActivator`] - Data plug check, activation and offer claim
//! - [`NoteEditor`] - Editing session over one note
//! - [`ListNotesUseCase`] - Reading notes back from the HAT

pub mod data_plug_activator;
pub mod error;
pub mod list_notes;
pub mod note_editor;
pub mod share_workflow;
pub mod token_guard;

pub use data_plug_activator::{ActivationOutcome, DataPlugActivator};
pub use error::WorkflowError;
pub use list_notes::ListNotesUseCase;
pub use note_editor::{EditorServices, NoteEditor, ToggleOutcome};
pub use share_workflow::{DeleteOutcome, EditContext, PublishOutcome, PublishRequest, ShareWorkflow};
pub use token_guard::TokenGuard;
