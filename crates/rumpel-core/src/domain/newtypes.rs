//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for identifiers and values
//! exchanged with the HAT. Each newtype ensures data validity at
//! construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// RunId
// ============================================================================

/// Identifier for a single publish or delete invocation
///
/// Only used to correlate log lines of one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Remote identifiers
// ============================================================================

/// Record identifier assigned by the HAT when a note is first persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Creates a NoteId, rejecting empty or whitespace-only values
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidId("note id cannot be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NoteId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NoteId> for String {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier of a file stored in the HAT file service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Creates a FileId, rejecting empty values and values containing `/`
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidId("file id cannot be empty".into()));
        }
        if id.contains('/') {
            return Err(DomainError::InvalidId(format!(
                "file id cannot contain '/': {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// HatDomain
// ============================================================================

/// The user's HAT address (PHATA), e.g. `alice.hubofallthings.net`
///
/// Stored without scheme or trailing slash, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HatDomain(String);

impl HatDomain {
    /// Creates a HatDomain from user input
    ///
    /// A leading `https://` and a trailing `/` are stripped; anything else
    /// that is not a bare host name is rejected.
    pub fn new(domain: impl Into<String>) -> Result<Self, DomainError> {
        let raw = domain.into();
        let trimmed = raw.trim();
        let host = trimmed
            .strip_prefix("https://")
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        if host.is_empty() {
            return Err(DomainError::InvalidDomain("domain cannot be empty".into()));
        }
        if host.contains("://") || host.contains('/') || host.contains(char::is_whitespace) {
            return Err(DomainError::InvalidDomain(raw));
        }
        if !host.contains('.') {
            return Err(DomainError::InvalidDomain(format!(
                "{raw} is not a fully qualified domain"
            )));
        }

        Ok(Self(host.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `https://{domain}`
    pub fn base_url(&self) -> String {
        format!("https://{}", self.0)
    }

    /// Public link for the content of an uploaded file
    pub fn file_content_url(&self, file_id: &FileId) -> String {
        format!("https://{}/api/v2/files/content/{}", self.0, file_id)
    }
}

impl TryFrom<String> for HatDomain {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HatDomain> for String {
    fn from(domain: HatDomain) -> Self {
        domain.0
    }
}

impl Display for HatDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HatDomain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// AccessToken
// ============================================================================

/// Opaque bearer token for privileged HAT calls
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::InvalidToken("token cannot be empty".into()));
        }
        Ok(Self(token))
    }

    /// Returns the raw secret for use in request headers
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl TryFrom<String> for AccessToken {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccessToken> for String {
    fn from(token: AccessToken) -> Self {
        token.0
    }
}
