//! Data plug activation use case
//!
//! Before a social destination can be selected its data plug must be
//! active for the account. This use case checks the plug, offers to
//! activate it through the HAT login page, and claims the promotional
//! offer bundled with activation. MarketSquare has no plug; selecting it
//! only claims the offer.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::domain::{AccessToken, DataPlug, ShareDestination};
use crate::ports::{Alert, HatApiError, HatService, Interaction, Prompt};
use crate::token_store::TokenStore;

use super::error::WorkflowError;
use super::token_guard::TokenGuard;

/// Result of making sure a destination can be shared to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The plug was already active; nothing was changed
    AlreadyActive,
    /// The user went through activation; the offer may or may not be held
    Activated { offer_claimed: bool },
    /// The user chose not to activate the plug
    Declined,
    /// The session went away while the activation was suspended
    Abandoned,
}

/// Checks, activates and claims offers for share destinations
pub struct DataPlugActivator {
    hat: Arc<dyn HatService>,
    tokens: Arc<TokenStore>,
    guard: Arc<TokenGuard>,
    interaction: Arc<dyn Interaction>,
    offer_id: String,
}

impl DataPlugActivator {
    pub fn new(
        hat: Arc<dyn HatService>,
        tokens: Arc<TokenStore>,
        guard: Arc<TokenGuard>,
        interaction: Arc<dyn Interaction>,
        offer_id: impl Into<String>,
    ) -> Self {
        Self {
            hat,
            tokens,
            guard,
            interaction,
            offer_id: offer_id.into(),
        }
    }

    /// Makes sure `destination` can be shared to
    ///
    /// Every error has already been shown to the user when it is returned.
    pub async fn ensure_active(
        &self,
        destination: ShareDestination,
        liveness: &CancellationToken,
    ) -> Result<ActivationOutcome, WorkflowError> {
        let span = info_span!("activate", destination = %destination);
        self.run(destination, liveness).instrument(span).await
    }

    async fn run(
        &self,
        destination: ShareDestination,
        liveness: &CancellationToken,
    ) -> Result<ActivationOutcome, WorkflowError> {
        // Step 1: make sure the token is usable
        let token = match self.guard.ensure_valid().await {
            Ok(token) => token,
            Err(e) => return Err(self.surface(e, liveness).await),
        };
        if liveness.is_cancelled() {
            return Ok(ActivationOutcome::Abandoned);
        }

        let Some(plug_name) = destination.plug_name() else {
            let offer_claimed = self.claim_offer().await;
            return Ok(self.finish_claim(offer_claimed, liveness).await);
        };

        // Step 2: query the plug status
        let active = match self.hat.is_data_plug_active(&token, plug_name).await {
            Ok(result) => self.tokens.absorb(result).await,
            Err(e) => {
                let err = WorkflowError::from(e);
                return Err(self
                    .surface_with(err, Alert::data_plug_check_failed(), liveness)
                    .await);
            }
        };
        if liveness.is_cancelled() {
            return Ok(ActivationOutcome::Abandoned);
        }
        if active {
            info!(plug = plug_name, "Data plug already active");
            return Ok(ActivationOutcome::AlreadyActive);
        }

        // Step 3: offer activation
        let choice = self
            .interaction
            .confirm(&Prompt::enable_data_plug(destination))
            .await;
        if liveness.is_cancelled() {
            return Ok(ActivationOutcome::Abandoned);
        }
        if !choice.is_proceed() {
            info!(plug = plug_name, "Data plug activation declined");
            return Ok(ActivationOutcome::Declined);
        }

        // Step 4: find the plug in the directory
        let plug = match self.find_plug(plug_name).await {
            Ok(plug) => plug,
            Err(e) => return Err(self.surface(e, liveness).await),
        };
        if liveness.is_cancelled() {
            return Ok(ActivationOutcome::Abandoned);
        }

        // Step 5: send the user through the HAT login for the plug
        let Some(url) = destination.activation_url(self.guard.domain(), &plug) else {
            let e = WorkflowError::Validation(format!(
                "{} cannot be activated",
                destination.display_name()
            ));
            return Err(self.surface(e, liveness).await);
        };
        if let Err(e) = self.interaction.present_authorization(&url).await {
            let e = WorkflowError::Validation(format!(
                "Could not open the {} activation page: {e}",
                destination.display_name()
            ));
            return Err(self.surface(e, liveness).await);
        }
        if liveness.is_cancelled() {
            return Ok(ActivationOutcome::Abandoned);
        }
        info!(plug = plug_name, "Data plug activation completed");

        // Step 6: claim the bundled offer
        let offer_claimed = self.claim_offer().await;
        Ok(self.finish_claim(offer_claimed, liveness).await)
    }

    async fn find_plug(&self, plug_name: &str) -> Result<DataPlug, WorkflowError> {
        let token = self.current_token().await?;
        let result = self.hat.list_data_plugs(&token).await?;
        let plugs = self.tokens.absorb(result).await;
        DataPlug::find(&plugs, plug_name)
            .cloned()
            .ok_or_else(|| {
                WorkflowError::Validation(format!("Data plug {plug_name} is not available"))
            })
    }

    /// Claims the offer; "already claimed" counts as claimed
    async fn claim_offer(&self) -> bool {
        let token = match self.current_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Cannot claim offer without a token");
                return false;
            }
        };
        match self.hat.claim_offer(&token, &self.offer_id).await {
            Ok(result) => {
                self.tokens.absorb(result).await;
                info!(offer_id = %self.offer_id, "Offer claimed");
                true
            }
            Err(HatApiError::OfferAlreadyClaimed) => {
                info!(offer_id = %self.offer_id, "Offer already claimed");
                true
            }
            Err(e) => {
                warn!(offer_id = %self.offer_id, error = %e, "Failed to claim offer");
                false
            }
        }
    }

    async fn finish_claim(
        &self,
        offer_claimed: bool,
        liveness: &CancellationToken,
    ) -> ActivationOutcome {
        if liveness.is_cancelled() {
            return ActivationOutcome::Abandoned;
        }
        if !offer_claimed {
            self.interaction.alert(&Alert::offer_claim_failed()).await;
        }
        ActivationOutcome::Activated { offer_claimed }
    }

    async fn current_token(&self) -> Result<AccessToken, WorkflowError> {
        self.tokens
            .current()
            .await
            .ok_or(WorkflowError::TokenExpired)
    }

    /// Shows the error's own alert unless the session is gone
    async fn surface(&self, err: WorkflowError, liveness: &CancellationToken) -> WorkflowError {
        let alert = err.to_alert();
        self.surface_with(err, alert, liveness).await
    }

    /// Shows `alert` unless the session is gone, and hands the error back
    async fn surface_with(
        &self,
        err: WorkflowError,
        alert: Alert,
        liveness: &CancellationToken,
    ) -> WorkflowError {
        warn!(error = %err, "Data plug activation failed");
        if !liveness.is_cancelled() {
            self.interaction.alert(&alert).await;
        }
        err
    }
}
