//! Process-wide access token
//!
//! [`TokenStore`] holds the single access token shared by every use case.
//! Writes replace the whole value under a lock, so the last writer wins
//! and no reader ever observes a partial update. Every write is persisted
//! through the [`CredentialStore`] port so the token survives restarts.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::AccessToken;
use crate::ports::{CredentialStore, Renewable, USER_TOKEN_KEY};

/// The shared access token with last-writer-wins overwrite semantics
pub struct TokenStore {
    credentials: Arc<dyn CredentialStore>,
    cached: RwLock<Option<AccessToken>>,
}

impl TokenStore {
    /// Creates a store backed by `credentials`
    ///
    /// Nothing is read until the first call to [`TokenStore::current`].
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            cached: RwLock::new(None),
        }
    }

    /// Returns the current token, loading it from the credential store once
    pub async fn current(&self) -> Option<AccessToken> {
        if let Some(token) = self.cached.read().await.clone() {
            return Some(token);
        }

        let mut cached = self.cached.write().await;
        if cached.is_none() {
            *cached = self.load();
        }
        cached.clone()
    }

    /// Replaces the current token
    ///
    /// The in-memory value is always replaced; a persistence failure is
    /// logged and the new token is still used for this process.
    pub async fn replace(&self, token: AccessToken) {
        let mut cached = self.cached.write().await;
        if let Err(e) = self.credentials.set(USER_TOKEN_KEY, token.secret()) {
            warn!(error = %e, "Failed to persist access token");
        }
        *cached = Some(token);
        debug!("Access token replaced");
    }

    /// Stores the renewed token carried by `result`, if any, and returns its value
    ///
    /// Call this before issuing the next privileged request.
    pub async fn absorb<T>(&self, result: Renewable<T>) -> T {
        if let Some(token) = result.renewed_token {
            self.replace(token).await;
        }
        result.value
    }

    /// Forgets the token in memory and in the credential store
    pub async fn clear(&self) -> anyhow::Result<()> {
        let mut cached = self.cached.write().await;
        *cached = None;
        self.credentials.remove(USER_TOKEN_KEY)
    }

    fn load(&self) -> Option<AccessToken> {
        match self.credentials.get(USER_TOKEN_KEY) {
            Ok(Some(raw)) => match AccessToken::new(raw) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "Ignoring stored access token");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored access token");
                None
            }
        }
    }
}
