//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! validation failures of identifiers and values, and invalid
//! workflow state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid HAT domain (PHATA) format
    #[error("Invalid HAT domain: {0}")]
    InvalidDomain(String),

    /// Invalid or empty access token
    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    /// Invalid record or file identifier
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Unknown share destination name
    #[error("Unknown share destination: {0}")]
    UnknownDestination(String),

    /// Unknown note kind
    #[error("Unknown note kind: {0}")]
    UnknownKind(String),

    /// Invalid share duration label
    #[error("Invalid share duration: {0}")]
    InvalidDuration(String),

    /// Coordinates outside the valid range
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },
}
