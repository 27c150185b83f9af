//! HatApiService - HatService implementation for a user's HAT
//!
//! Wraps the [`HatClient`] and delegates to the notes, files and data plug
//! modules to fulfil the [`HatService`] port contract.
//!
//! ## Design Notes
//!
//! - Adapter errors ([`HatError`]) are mapped to [`HatApiError`] at this
//!   boundary; a 401 from any call becomes `TokenExpired`.
//! - Data plug URLs come from configuration first and the Dex directory
//!   second, so a plug missing from the config can still be checked.

use std::time::Duration;

use rumpel_core::config::Config;
use rumpel_core::domain::{
    AccessToken, DataPlug, FileId, FileVisibility, HatDomain, Note, NoteId, PendingImage,
    DEFAULT_OFFER_ID,
};
use rumpel_core::ports::{HatApiError, HatService, Renewable, TokenStatus, UploadProgress};
use tracing::debug;

use crate::client::HatClient;
use crate::data_plugs::{self, OfferClaim};
use crate::{files, notes, HatError};

// ============================================================================
// Settings
// ============================================================================

/// Everything besides the domain that the service needs to reach
#[derive(Debug, Clone)]
pub struct HatServiceSettings {
    pub request_timeout: Duration,
    /// Number of notes fetched per listing
    pub notes_take: u32,
    pub upload_tags: Vec<String>,
    /// Dex directory base URL
    pub directory_url: String,
    /// Known plugs, consulted before the directory
    pub plugs: Vec<DataPlug>,
    pub marketsquare_url: String,
    /// Application name MarketSquare tokens are issued for
    pub offer_app_name: String,
}

impl HatServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.hat.request_timeout_secs),
            notes_take: config.hat.notes_take,
            upload_tags: config.upload.tags.clone(),
            directory_url: config.data_plugs.directory_url.clone(),
            plugs: config
                .data_plugs
                .plugs
                .iter()
                .map(|plug| DataPlug::new(plug.name.clone(), plug.url.clone()))
                .collect(),
            marketsquare_url: config.offers.marketsquare_url.clone(),
            offer_app_name: config.offers.app_token_name.clone(),
        }
    }
}

impl Default for HatServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ============================================================================
// HatApiService
// ============================================================================

/// [`HatService`] backed by the HAT HTTP API
pub struct HatApiService {
    client: HatClient,
    domain: HatDomain,
    settings: HatServiceSettings,
}

impl HatApiService {
    /// Creates a service talking to `https://{domain}`
    pub fn new(domain: HatDomain, settings: HatServiceSettings) -> Self {
        let client = HatClient::new(&domain).with_timeout(settings.request_timeout);
        Self::with_client(client, domain, settings)
    }

    /// Creates a service over an existing client (useful for testing)
    pub fn with_client(client: HatClient, domain: HatDomain, settings: HatServiceSettings) -> Self {
        Self {
            client,
            domain,
            settings,
        }
    }

    pub fn domain(&self) -> &HatDomain {
        &self.domain
    }

    /// Finds the plug called `name`, asking the directory if it is not configured
    async fn resolve_plug(&self, name: &str) -> Result<DataPlug, HatError> {
        if let Some(plug) = DataPlug::find(&self.settings.plugs, name) {
            return Ok(plug.clone());
        }
        debug!(plug = name, "Plug not configured, looking it up in the directory");
        let listed = data_plugs::directory(&self.client, &self.settings.directory_url).await?;
        DataPlug::find(&listed, name)
            .cloned()
            .ok_or_else(|| HatError::NotFound(format!("data plug {name}")))
    }
}

/// Maps adapter errors to the port error type
pub(crate) fn into_port_error(err: HatError) -> HatApiError {
    match err {
        HatError::Unauthorized(_) => HatApiError::TokenExpired,
        HatError::NotFound(message) => HatApiError::NotFound(message),
        HatError::BadRequest(message) => HatApiError::Server {
            status: 400,
            message,
        },
        HatError::Status { status, message } => HatApiError::Server { status, message },
        HatError::OfferAlreadyClaimed => HatApiError::OfferAlreadyClaimed,
        HatError::NetworkError(e) => HatApiError::Network(e.to_string()),
        HatError::InvalidResponse(message) => HatApiError::InvalidResponse(message),
    }
}

#[async_trait::async_trait]
impl HatService for HatApiService {
    async fn validate_token(
        &self,
        token: &AccessToken,
    ) -> Result<Renewable<TokenStatus>, HatApiError> {
        self.client
            .validate_token(token)
            .await
            .map_err(into_port_error)
    }

    async fn fetch_notes(&self, token: &AccessToken) -> Result<Renewable<Vec<Note>>, HatApiError> {
        notes::fetch(&self.client, token, self.settings.notes_take)
            .await
            .map_err(into_port_error)
    }

    async fn post_note(
        &self,
        token: &AccessToken,
        note: &Note,
    ) -> Result<Renewable<NoteId>, HatApiError> {
        notes::post(&self.client, token, note, self.domain.as_str())
            .await
            .map_err(into_port_error)
    }

    async fn delete_note(
        &self,
        token: &AccessToken,
        id: &NoteId,
    ) -> Result<Renewable<()>, HatApiError> {
        notes::delete(&self.client, token, id)
            .await
            .map_err(into_port_error)
    }

    async fn upload_file(
        &self,
        token: &AccessToken,
        image: &PendingImage,
        progress: Option<UploadProgress>,
    ) -> Result<Renewable<FileId>, HatApiError> {
        files::upload(
            &self.client,
            token,
            image,
            &self.settings.upload_tags,
            progress,
        )
        .await
        .map_err(into_port_error)
    }

    async fn set_file_visibility(
        &self,
        token: &AccessToken,
        file_id: &FileId,
        visibility: FileVisibility,
    ) -> Result<Renewable<()>, HatApiError> {
        files::set_visibility(&self.client, token, file_id, visibility)
            .await
            .map_err(into_port_error)
    }

    async fn list_data_plugs(
        &self,
        _token: &AccessToken,
    ) -> Result<Renewable<Vec<DataPlug>>, HatApiError> {
        data_plugs::directory(&self.client, &self.settings.directory_url)
            .await
            .map(Renewable::new)
            .map_err(into_port_error)
    }

    async fn is_data_plug_active(
        &self,
        token: &AccessToken,
        plug_name: &str,
    ) -> Result<Renewable<bool>, HatApiError> {
        let plug = self.resolve_plug(plug_name).await.map_err(into_port_error)?;
        data_plugs::is_active(&self.client, token, &plug)
            .await
            .map_err(into_port_error)
    }

    async fn claim_offer(
        &self,
        token: &AccessToken,
        offer_id: &str,
    ) -> Result<Renewable<()>, HatApiError> {
        let offer_id = if offer_id.is_empty() {
            DEFAULT_OFFER_ID
        } else {
            offer_id
        };
        let claim = OfferClaim {
            marketsquare_url: &self.settings.marketsquare_url,
            app_name: &self.settings.offer_app_name,
            offer_id,
        };
        data_plugs::claim_offer(&self.client, token, &claim)
            .await
            .map_err(into_port_error)
    }
}
