//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`HatService`] - Privileged calls against the HAT, the data plug
//!   directory and the offer API
//! - [`CredentialStore`] - Persistent storage for the access token
//! - [`Interaction`] - Confirmations, alerts, external pages and progress
//! - [`AuthSurface`] - Interactive HAT login

pub mod credential_store;
pub mod hat_service;
pub mod interaction;

pub use credential_store::{CredentialStore, USER_TOKEN_KEY};
pub use hat_service::{HatApiError, HatService, Renewable, TokenStatus, UploadProgress};
pub use interaction::{Alert, AuthResult, AuthSurface, Choice, Interaction, Prompt};
