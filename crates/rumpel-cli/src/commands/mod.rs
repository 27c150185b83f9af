//! CLI subcommands and the wiring they share

pub mod auth;
pub mod completions;
pub mod config;
pub mod notes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rumpel_core::config::Config;
use rumpel_core::domain::HatDomain;
use rumpel_core::token_store::TokenStore;
use rumpel_core::usecases::{
    DataPlugActivator, EditorServices, ListNotesUseCase, ShareWorkflow, TokenGuard,
};
use rumpel_hat::auth::{BrowserAuthSurface, KeyringCredentialStore};
use rumpel_hat::provider::{HatApiService, HatServiceSettings};
use tracing::warn;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::terminal::TerminalInteraction;

/// Global options and configuration every command runs with
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub assume_yes: bool,
    pub quiet: bool,
}

impl AppContext {
    /// Loads the configuration from `config_path` or the default location
    ///
    /// A missing or unreadable file falls back to defaults.
    pub fn load(
        config_path: Option<PathBuf>,
        format: OutputFormat,
        assume_yes: bool,
        quiet: bool,
    ) -> Self {
        let config_path = config_path.unwrap_or_else(Config::default_path);
        let config = Config::load_or_default(&config_path);

        Self {
            config,
            config_path,
            format,
            assume_yes,
            quiet,
        }
    }

    /// Logs validation problems; `rumpel config validate` reports them in full
    pub fn warn_invalid_config(&self) {
        for error in self.config.validate() {
            warn!(field = %error.field, "Invalid configuration: {}", error.message);
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// The HAT to talk to: `explicit` if given, else the configured domain
    pub fn domain(&self, explicit: Option<&str>) -> Result<HatDomain> {
        match explicit {
            Some(raw) => HatDomain::new(raw).with_context(|| format!("Invalid HAT domain: {raw}")),
            None => self
                .config
                .hat_domain()
                .context("Invalid hat.domain in configuration")?
                .context("No HAT configured. Run 'rumpel auth login --domain <your-hat>' first"),
        }
    }

    /// Wires adapters and use cases for `domain`
    pub fn session(&self, domain: HatDomain) -> Session {
        let credentials = Arc::new(KeyringCredentialStore::new(&domain));
        let tokens = Arc::new(TokenStore::new(credentials));
        let hat = Arc::new(HatApiService::new(
            domain.clone(),
            HatServiceSettings::from_config(&self.config),
        ));
        let auth = Arc::new(BrowserAuthSurface::new(
            self.config.auth.service_name.clone(),
            self.config.auth.callback_port,
            Duration::from_secs(self.config.auth.login_timeout_secs),
        ));
        let interaction = Arc::new(TerminalInteraction::new(self.assume_yes));
        let guard = Arc::new(TokenGuard::new(
            hat.clone(),
            tokens.clone(),
            auth.clone(),
            domain.clone(),
        ));

        Session {
            domain,
            hat,
            tokens,
            guard,
            auth,
            interaction,
            offer_id: self.config.offers.offer_id.clone(),
        }
    }
}

/// Adapters and use cases bound to one HAT
pub struct Session {
    pub domain: HatDomain,
    pub hat: Arc<HatApiService>,
    pub tokens: Arc<TokenStore>,
    pub guard: Arc<TokenGuard>,
    pub auth: Arc<BrowserAuthSurface>,
    pub interaction: Arc<TerminalInteraction>,
    offer_id: String,
}

impl Session {
    pub fn editor_services(&self) -> EditorServices {
        let workflow = Arc::new(ShareWorkflow::new(
            self.hat.clone(),
            self.tokens.clone(),
            self.guard.clone(),
            self.interaction.clone(),
        ));
        let activator = Arc::new(DataPlugActivator::new(
            self.hat.clone(),
            self.tokens.clone(),
            self.guard.clone(),
            self.interaction.clone(),
            self.offer_id.clone(),
        ));

        EditorServices {
            workflow,
            activator,
            interaction: self.interaction.clone(),
        }
    }

    pub fn list_notes(&self) -> ListNotesUseCase {
        ListNotesUseCase::new(self.hat.clone(), self.tokens.clone(), self.guard.clone())
    }
}
