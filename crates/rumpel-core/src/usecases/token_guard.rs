//! Token guard use case
//!
//! Makes sure a valid access token is available before a privileged
//! workflow starts. An expired or missing token triggers the interactive
//! login once; nothing is retried automatically.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{AccessToken, HatDomain};
use crate::ports::{AuthResult, AuthSurface, HatService, TokenStatus};
use crate::token_store::TokenStore;

use super::error::WorkflowError;

/// Gates privileged calls behind a token validity check
pub struct TokenGuard {
    hat: Arc<dyn HatService>,
    tokens: Arc<TokenStore>,
    auth: Arc<dyn AuthSurface>,
    domain: HatDomain,
}

impl TokenGuard {
    pub fn new(
        hat: Arc<dyn HatService>,
        tokens: Arc<TokenStore>,
        auth: Arc<dyn AuthSurface>,
        domain: HatDomain,
    ) -> Self {
        Self {
            hat,
            tokens,
            auth,
            domain,
        }
    }

    pub fn domain(&self) -> &HatDomain {
        &self.domain
    }

    /// Returns a token the HAT currently accepts
    ///
    /// # Errors
    ///
    /// - `WorkflowError::UserDeclined` if the user cancels the login
    /// - `WorkflowError::Reauthorization` if the login flow fails
    /// - Any error of the validity check itself, unretried
    pub async fn ensure_valid(&self) -> Result<AccessToken, WorkflowError> {
        let Some(token) = self.tokens.current().await else {
            info!("No stored access token, starting login");
            return self.reauthorize().await;
        };

        let result = self.hat.validate_token(&token).await?;
        let token = result.renewed_token.clone().unwrap_or(token);
        match self.tokens.absorb(result).await {
            TokenStatus::Valid => Ok(token),
            TokenStatus::Expired => {
                info!("Access token expired, starting login");
                self.reauthorize().await
            }
        }
    }

    async fn reauthorize(&self) -> Result<AccessToken, WorkflowError> {
        match self.auth.reauthorize(&self.domain).await {
            Ok(AuthResult::Authorized(token)) => {
                self.tokens.replace(token.clone()).await;
                info!(domain = %self.domain, "Reauthorized");
                Ok(token)
            }
            Ok(AuthResult::Cancelled) => Err(WorkflowError::UserDeclined),
            Err(e) => {
                warn!(error = %e, "Login flow failed");
                Err(WorkflowError::Reauthorization(format!("{e:#}")))
            }
        }
    }
}
