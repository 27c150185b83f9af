//! Rumpel Core - Note publishing and sharing logic
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Note`, `DataPlug`, `UploadedFile`, `AccessToken`, `ShareDestination`
//! - **Use cases** - `TokenGuard`, `ShareWorkflow`, `DataPlugActivator`, `NoteEditor`
//! - **Port definitions** - Traits for adapters: `HatService`, `CredentialStore`,
//!   `AuthSurface`, `Interaction`
//! - **Token store** - The process-wide access token with overwrite semantics
//!
//! # Architecture
//!
//! The domain module contains pure data types and rules with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod token_store;
pub mod usecases;

#[cfg(test)]
pub(crate) mod testing;
