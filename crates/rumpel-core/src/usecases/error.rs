//! Use case error types

use thiserror::Error;

use crate::ports::{Alert, HatApiError};

/// Errors surfaced by the publish, delete and activation workflows
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The HAT or a related service could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The token was rejected and could not be recovered
    #[error("Access token expired")]
    TokenExpired,

    /// The request was refused for a reason the user can act on
    #[error("{0}")]
    Validation(String),

    /// The user backed out of a required interactive step
    #[error("Cancelled by user")]
    UserDeclined,

    /// A publish or delete is already running for this session
    #[error("Another publish or delete is already in progress")]
    Busy,

    /// Interactive login could not be completed
    #[error("Reauthorization failed: {0}")]
    Reauthorization(String),

    /// The service answered with an error
    #[error("{0}")]
    Service(String),
}

impl WorkflowError {
    /// The single alert shown for this error
    pub fn to_alert(&self) -> Alert {
        Alert::new("", self.to_string())
    }
}

impl From<HatApiError> for WorkflowError {
    fn from(err: HatApiError) -> Self {
        match err {
            HatApiError::TokenExpired => WorkflowError::TokenExpired,
            HatApiError::Network(message) => WorkflowError::Network(message),
            HatApiError::OfferAlreadyClaimed => WorkflowError::Validation(err.to_string()),
            other => WorkflowError::Service(other.to_string()),
        }
    }
}
