//! HAT service port (driven/secondary port)
//!
//! This module defines the interface for every privileged call made
//! against the user's HAT and the services around it: note storage, the
//! file service, the data plug directory and the offer API.
//!
//! ## Design Notes
//!
//! - Errors are classified with [`HatApiError`] because the use cases
//!   branch on them (expired tokens are recovered, "offer already claimed"
//!   is downgraded to success).
//! - Every call may renew the access token. Results are wrapped in
//!   [`Renewable`] so the caller can store the renewal before issuing
//!   its next call.

use thiserror::Error;

use crate::domain::{
    AccessToken, DataPlug, FileId, FileVisibility, Note, NoteId, PendingImage,
};

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by [`HatService`] implementations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HatApiError {
    /// The access token was rejected
    #[error("Access token expired")]
    TokenExpired,

    /// The offer had already been claimed for this account
    #[error("Offer already claimed")]
    OfferAlreadyClaimed,

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request did not reach the service
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with an error status
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Results
// ============================================================================

/// A call result plus the renewed access token the service may have issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renewable<T> {
    pub value: T,
    pub renewed_token: Option<AccessToken>,
}

impl<T> Renewable<T> {
    /// A result without token renewal
    pub fn new(value: T) -> Self {
        Self {
            value,
            renewed_token: None,
        }
    }

    /// A result carrying a renewed token
    pub fn renewed(value: T, token: AccessToken) -> Self {
        Self {
            value,
            renewed_token: Some(token),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Renewable<U> {
        Renewable {
            value: f(self.value),
            renewed_token: self.renewed_token,
        }
    }
}

/// Outcome of asking the HAT whether a token is still accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Expired,
}

/// Upload progress callback, called with `(bytes_sent, total_bytes)`
pub type UploadProgress = Box<dyn Fn(u64, u64) + Send + Sync>;

// ============================================================================
// HatService trait
// ============================================================================

/// Port trait for privileged HAT operations
///
/// ## Implementation Notes
///
/// - Implementations must not retry. Every failure is returned once.
/// - A renewed token found on any response must be returned in
///   [`Renewable::renewed_token`], including on calls whose value is `()`.
#[async_trait::async_trait]
pub trait HatService: Send + Sync {
    /// Checks whether the HAT still accepts `token`
    ///
    /// Expiry is reported as `Ok(TokenStatus::Expired)`, not as an error.
    async fn validate_token(
        &self,
        token: &AccessToken,
    ) -> Result<Renewable<TokenStatus>, HatApiError>;

    /// Fetches the user's notes, most recently updated first
    async fn fetch_notes(&self, token: &AccessToken) -> Result<Renewable<Vec<Note>>, HatApiError>;

    /// Creates a note and returns its record id
    async fn post_note(
        &self,
        token: &AccessToken,
        note: &Note,
    ) -> Result<Renewable<NoteId>, HatApiError>;

    /// Deletes a note record
    async fn delete_note(
        &self,
        token: &AccessToken,
        id: &NoteId,
    ) -> Result<Renewable<()>, HatApiError>;

    /// Uploads an image to the file service
    ///
    /// # Arguments
    /// * `progress` - Optional callback reporting `(bytes_sent, total_bytes)`
    async fn upload_file(
        &self,
        token: &AccessToken,
        image: &PendingImage,
        progress: Option<UploadProgress>,
    ) -> Result<Renewable<FileId>, HatApiError>;

    /// Marks an uploaded file public or private
    async fn set_file_visibility(
        &self,
        token: &AccessToken,
        file_id: &FileId,
        visibility: FileVisibility,
    ) -> Result<Renewable<()>, HatApiError>;

    /// Lists the data plugs available in the directory
    async fn list_data_plugs(
        &self,
        token: &AccessToken,
    ) -> Result<Renewable<Vec<DataPlug>>, HatApiError>;

    /// Checks whether the data plug called `plug_name` is active for this account
    async fn is_data_plug_active(
        &self,
        token: &AccessToken,
        plug_name: &str,
    ) -> Result<Renewable<bool>, HatApiError>;

    /// Claims a promotional offer
    ///
    /// Returns `HatApiError::OfferAlreadyClaimed` when the account already
    /// holds the offer.
    async fn claim_offer(
        &self,
        token: &AccessToken,
        offer_id: &str,
    ) -> Result<Renewable<()>, HatApiError>;
}
