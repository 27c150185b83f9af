//! Rumpel HAT - HAT API client
//!
//! Provides async adapters for:
//! - Token validation and interactive HAT login
//! - Note records (`rumpel/notablesv1`)
//! - File uploads and public/private visibility
//! - Data plug status, the Dex plug directory and MarketSquare offers
//!
//! ## Modules
//!
//! - [`auth`] - Keyring credential store and browser login flow
//! - [`client`] - HAT HTTP client with renewed-token tracking
//! - [`notes`] - Note record wire format and CRUD calls
//! - [`files`] - File upload and visibility calls
//! - [`data_plugs`] - Application tokens, plug status and offer claims
//! - [`provider`] - [`HatService`](rumpel_core::ports::HatService) implementation

pub mod auth;
pub mod client;
pub mod data_plugs;
pub mod files;
pub mod notes;
pub mod provider;

use thiserror::Error;

/// Errors that can occur when talking to a HAT or one of its satellite services
#[derive(Debug, Error)]
pub enum HatError {
    /// The token was rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected as malformed (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, or the reason phrase when the body is empty
        message: String,
    },

    /// The offer is already held by this account
    #[error("Offer already claimed")]
    OfferAlreadyClaimed,

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
