//! HAT API client
//!
//! Provides a typed HTTP client for a user's HAT and the satellite services
//! (data plugs, Dex, MarketSquare) reached on its behalf. Handles the bearer
//! header, status-to-error mapping, and the renewed token the HAT may hand
//! back on any response.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rumpel_core::domain::{AccessToken, HatDomain};
//! use rumpel_hat::client::HatClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let domain = HatDomain::new("alice.hubofallthings.net")?;
//! let client = HatClient::new(&domain);
//! let status = client.validate_token(&AccessToken::new("token")?).await?;
//! println!("{:?}", status.value);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rumpel_core::domain::{AccessToken, HatDomain};
use rumpel_core::ports::{Renewable, TokenStatus};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::HatError;

/// Response header carrying a renewed user token
pub const RENEWED_TOKEN_HEADER: &str = "x-auth-token";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// HatClient
// ============================================================================

/// HTTP client for calls against one HAT
pub struct HatClient {
    /// The underlying HTTP client
    client: Client,
    /// `https://{domain}`, or a mock server URI in tests
    base_url: String,
}

impl HatClient {
    /// Creates a client for the HAT at `domain`
    pub fn new(domain: &HatDomain) -> Self {
        Self::with_base_url(domain.base_url())
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Replaces the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request against the HAT
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the HAT, e.g. `/api/v2/files/upload`
    /// * `token` - User token sent as the bearer credential
    pub fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(token.secret())
    }

    /// Creates an unauthenticated request to an absolute URL
    ///
    /// Used for upload targets and for services outside the HAT that
    /// authenticate with application tokens.
    pub fn external(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends a request and maps error statuses to [`HatError`]
    ///
    /// A renewed token is picked up from successful responses only.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Reply, HatError> {
        let request = request.build()?;
        debug!(method = %request.method(), url = %request.url(), "HAT request");

        let response = self.client.execute(request).await?;
        let status = response.status();

        if status.is_success() {
            let renewed_token = renewed_token(response.headers());
            if renewed_token.is_some() {
                debug!("Response carried a renewed token");
            }
            return Ok(Reply {
                response,
                renewed_token,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            body
        };
        debug!(status = status.as_u16(), %message, "HAT request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => HatError::Unauthorized(message),
            StatusCode::NOT_FOUND => HatError::NotFound(message),
            StatusCode::BAD_REQUEST => HatError::BadRequest(message),
            _ => HatError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Asks the HAT whether `token` is still accepted
    ///
    /// A 401 is reported as [`TokenStatus::Expired`], not as an error.
    pub async fn validate_token(
        &self,
        token: &AccessToken,
    ) -> Result<Renewable<TokenStatus>, HatError> {
        let request = self.request(Method::GET, "/users/access_token/validate", token);
        match self.execute(request).await {
            Ok(reply) => Ok(reply.into_renewable(TokenStatus::Valid)),
            Err(HatError::Unauthorized(_)) => {
                debug!("Token rejected by the HAT");
                Ok(Renewable::new(TokenStatus::Expired))
            }
            Err(e) => Err(e),
        }
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
        Client::new()
    })
}

/// Extracts a renewed token from response headers, ignoring blank values
fn renewed_token(headers: &HeaderMap) -> Option<AccessToken> {
    headers
        .get(RENEWED_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| AccessToken::new(value.trim()).ok())
}

// ============================================================================
// Reply
// ============================================================================

/// A successful response plus any renewed token it carried
pub struct Reply {
    pub response: Response,
    pub renewed_token: Option<AccessToken>,
}

impl Reply {
    /// Parses the body as JSON
    pub async fn json<T: DeserializeOwned>(self) -> Result<(T, Option<AccessToken>), HatError> {
        let body = self.response.text().await?;
        let value = serde_json::from_str(&body)
            .map_err(|e| HatError::InvalidResponse(format!("{e}: {}", truncate(&body))))?;
        Ok((value, self.renewed_token))
    }

    /// Drops the body and wraps `value` with the renewed token
    pub fn into_renewable<T>(self, value: T) -> Renewable<T> {
        match self.renewed_token {
            Some(token) => Renewable::renewed(value, token),
            None => Renewable::new(value),
        }
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

// ============================================================================
// TokenCursor
// ============================================================================

/// Tracks the token to send across the requests of one operation
///
/// Once a response renews the token, every later request in the same
/// operation uses the renewed one, and the operation reports it.
#[derive(Debug, Clone)]
pub struct TokenCursor {
    current: AccessToken,
    renewed: Option<AccessToken>,
}

impl TokenCursor {
    pub fn new(token: &AccessToken) -> Self {
        Self {
            current: token.clone(),
            renewed: None,
        }
    }

    /// The token for the next request
    pub fn token(&self) -> &AccessToken {
        self.renewed.as_ref().unwrap_or(&self.current)
    }

    /// Records a renewed token seen on a response
    pub fn observe(&mut self, renewed: Option<AccessToken>) {
        if let Some(token) = renewed {
            self.renewed = Some(token);
        }
    }

    /// Wraps the operation's result with the latest renewed token
    pub fn finish<T>(self, value: T) -> Renewable<T> {
        match self.renewed {
            Some(token) => Renewable::renewed(value, token),
            None => Renewable::new(value),
        }
    }
}
