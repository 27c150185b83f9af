//! Configuration module for Rumpel.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HatDomain, DEFAULT_OFFER_ID};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Rumpel.
///
/// Every section is optional in the file; missing sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hat: HatConfig,
    pub auth: AuthConfig,
    pub data_plugs: DataPlugsConfig,
    pub offers: OffersConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// The user's HAT and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HatConfig {
    /// HAT address, e.g. `alice.hubofallthings.net`. `None` until the user logs in.
    pub domain: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Number of notes fetched by `notes list`.
    pub notes_take: u32,
}

/// Interactive login settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Application name passed to the HAT login page.
    pub service_name: String,
    /// Local port the login callback listens on.
    pub callback_port: u16,
    /// Seconds to wait for the browser to come back before giving up.
    pub login_timeout_secs: u64,
}

/// A data plug whose status can be queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlugEndpoint {
    /// Directory name of the plug, e.g. `facebook`.
    pub name: String,
    /// Base URL of the plug API.
    pub url: String,
}

/// Data plug directory and known plugs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPlugsConfig {
    /// Base URL of the data plug directory (Dex).
    pub directory_url: String,
    /// Plugs whose status is checked before sharing.
    pub plugs: Vec<PlugEndpoint>,
}

/// Offer claimed when a data plug is activated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OffersConfig {
    pub offer_id: String,
    /// Base URL of the MarketSquare offer API.
    pub marketsquare_url: String,
    /// Application name used to obtain a MarketSquare token.
    pub app_token_name: String,
}

/// Image upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Tags attached to every uploaded file.
    pub tags: Vec<String>,
    /// Largest accepted image, in MiB.
    pub max_size_mb: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/rumpel/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("rumpel")
            .join("config.yaml")
    }

    /// The configured HAT domain, validated.
    pub fn hat_domain(&self) -> Result<Option<HatDomain>, DomainError> {
        self.hat.domain.as_deref().map(HatDomain::new).transpose()
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for HatConfig {
    fn default() -> Self {
        Self {
            domain: None,
            request_timeout_secs: 30,
            notes_take: 50,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            service_name: "RumpelLite".into(),
            callback_port: 8400,
            login_timeout_secs: 300,
        }
    }
}

impl Default for DataPlugsConfig {
    fn default() -> Self {
        Self {
            directory_url: "https://dex.hubofallthings.com".into(),
            plugs: vec![
                PlugEndpoint {
                    name: "facebook".into(),
                    url: "https://social-plug.hubofallthings.com".into(),
                },
                PlugEndpoint {
                    name: "twitter".into(),
                    url: "https://twitter-plug.hubofallthings.com".into(),
                },
            ],
        }
    }
}

impl Default for OffersConfig {
    fn default() -> Self {
        Self {
            offer_id: DEFAULT_OFFER_ID.into(),
            marketsquare_url: "https://marketsquare.hubofallthings.com".into(),
            app_token_name: "MarketSquare".into(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            tags: vec!["rumpel".into(), "notes".into()],
            max_size_mb: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"auth.callback_port"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- hat ---
        if let Err(e) = self.hat_domain() {
            errors.push(ValidationError::new("hat.domain", e.to_string()));
        }
        if self.hat.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "hat.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.hat.notes_take == 0 {
            errors.push(ValidationError::new("hat.notes_take", "must be greater than 0"));
        }

        // --- auth ---
        if self.auth.service_name.trim().is_empty() {
            errors.push(ValidationError::new("auth.service_name", "must not be empty"));
        }
        if self.auth.login_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "auth.login_timeout_secs",
                "must be greater than 0",
            ));
        }

        // --- data_plugs ---
        if !is_http_url(&self.data_plugs.directory_url) {
            errors.push(ValidationError::new(
                "data_plugs.directory_url",
                format!("must be an http(s) URL: {}", self.data_plugs.directory_url),
            ));
        }
        for (i, plug) in self.data_plugs.plugs.iter().enumerate() {
            if plug.name.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("data_plugs.plugs[{i}].name"),
                    "must not be empty",
                ));
            }
            if !is_http_url(&plug.url) {
                errors.push(ValidationError::new(
                    format!("data_plugs.plugs[{i}].url"),
                    format!("must be an http(s) URL: {}", plug.url),
                ));
            }
        }

        // --- offers ---
        if self.offers.offer_id.trim().is_empty() {
            errors.push(ValidationError::new("offers.offer_id", "must not be empty"));
        }
        if !is_http_url(&self.offers.marketsquare_url) {
            errors.push(ValidationError::new(
                "offers.marketsquare_url",
                format!("must be an http(s) URL: {}", self.offers.marketsquare_url),
            ));
        }
        if self.offers.app_token_name.trim().is_empty() {
            errors.push(ValidationError::new(
                "offers.app_token_name",
                "must not be empty",
            ));
        }

        // --- upload ---
        if self.upload.max_size_mb == 0 {
            errors.push(ValidationError::new(
                "upload.max_size_mb",
                "must be greater than 0",
            ));
        }
        if self.upload.tags.iter().any(|tag| tag.trim().is_empty()) {
            errors.push(ValidationError::new("upload.tags", "tags must not be empty"));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- hat ---

    pub fn hat_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.hat.domain = Some(domain.into());
        self
    }

    pub fn hat_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.hat.request_timeout_secs = seconds;
        self
    }

    pub fn hat_notes_take(mut self, take: u32) -> Self {
        self.config.hat.notes_take = take;
        self
    }

    // --- auth ---

    pub fn auth_service_name(mut self, name: impl Into<String>) -> Self {
        self.config.auth.service_name = name.into();
        self
    }

    pub fn auth_callback_port(mut self, port: u16) -> Self {
        self.config.auth.callback_port = port;
        self
    }

    pub fn auth_login_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.auth.login_timeout_secs = seconds;
        self
    }

    // --- data_plugs ---

    pub fn data_plugs_directory_url(mut self, url: impl Into<String>) -> Self {
        self.config.data_plugs.directory_url = url.into();
        self
    }

    /// Add or replace the endpoint of a plug.
    pub fn data_plug(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        let url = url.into();
        match self.config.data_plugs.plugs.iter_mut().find(|p| p.name == name) {
            Some(plug) => plug.url = url,
            None => self.config.data_plugs.plugs.push(PlugEndpoint { name, url }),
        }
        self
    }

    // --- offers ---

    pub fn offers_offer_id(mut self, id: impl Into<String>) -> Self {
        self.config.offers.offer_id = id.into();
        self
    }

    pub fn offers_marketsquare_url(mut self, url: impl Into<String>) -> Self {
        self.config.offers.marketsquare_url = url.into();
        self
    }

    // --- upload ---

    pub fn upload_tags(mut self, tags: Vec<String>) -> Self {
        self.config.upload.tags = tags;
        self
    }

    pub fn upload_max_size_mb(mut self, mb: u64) -> Self {
        self.config.upload.max_size_mb = mb;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
