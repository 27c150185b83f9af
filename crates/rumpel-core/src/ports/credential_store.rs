//! Credential store port
//!
//! Persistent key/value storage for secrets that must survive restarts.
//! The only key used today is [`USER_TOKEN_KEY`].

/// Key under which the HAT access token is stored
pub const USER_TOKEN_KEY: &str = "UserToken";

/// Port trait for persistent secret storage
///
/// Calls are synchronous; platform secret stores answer quickly and the
/// token store caches values in memory.
pub trait CredentialStore: Send + Sync {
    /// Reads a value; `Ok(None)` when nothing is stored under `key`
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Stores a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removes a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}
