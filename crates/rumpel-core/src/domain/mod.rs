//! Domain entities and business rules
//!
//! This module contains the core domain types for Rumpel:
//! - Newtypes for validated identifiers, the HAT domain and access tokens
//! - Notes and their sharing metadata
//! - Share destinations and data plugs
//! - Workflow states
//! - Domain-specific error types

pub mod data_plug;
pub mod destination;
pub mod errors;
pub mod newtypes;
pub mod note;
pub mod workflow;

// Re-export commonly used types
pub use data_plug::{DataPlug, FileVisibility, PendingImage, UploadedFile, DEFAULT_OFFER_ID};
pub use destination::ShareDestination;
pub use errors::DomainError;
pub use newtypes::*;
pub use note::{
    Author, LocationData, Note, NoteKind, PhotoData, ShareDuration, ShareStatus, SharedOn,
};
pub use workflow::{WorkflowState, WorkflowTracker};
