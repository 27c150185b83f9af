//! Data plugs and offers
//!
//! Data plugs and MarketSquare sit outside the HAT. The HAT issues an
//! application token for each of them, which is then sent in the
//! `x-auth-token` header instead of the user's bearer token.

use reqwest::Method;
use rumpel_core::domain::{AccessToken, DataPlug};
use rumpel_core::ports::Renewable;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{HatClient, TokenCursor};
use crate::HatError;

/// Header carrying an application token to a satellite service
const APP_TOKEN_HEADER: &str = "x-auth-token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    name: String,
    url: String,
}

// ============================================================================
// Application tokens
// ============================================================================

/// Asks the HAT for an application token
///
/// # Arguments
/// * `name` - Application name, e.g. `facebook` or `MarketSquare`
/// * `resource` - Base URL of the service the token is for
pub async fn application_token(
    client: &HatClient,
    token: &AccessToken,
    name: &str,
    resource: &str,
) -> Result<Renewable<AccessToken>, HatError> {
    let request = client
        .request(Method::GET, "/users/application_token", token)
        .query(&[("name", name), ("resource", resource)]);

    let (body, renewed): (ApplicationTokenResponse, _) =
        client.execute(request).await?.json().await?;
    let app_token = AccessToken::new(body.access_token)
        .map_err(|e| HatError::InvalidResponse(format!("application token for {name}: {e}")))?;

    debug!(application = name, "Obtained application token");
    let mut cursor = TokenCursor::new(token);
    cursor.observe(renewed);
    Ok(cursor.finish(app_token))
}

// ============================================================================
// Plug directory and status
// ============================================================================

/// Lists the plugs registered in the Dex directory
pub async fn directory(client: &HatClient, directory_url: &str) -> Result<Vec<DataPlug>, HatError> {
    let url = format!("{}/api/dataplugs", directory_url.trim_end_matches('/'));
    let (entries, _): (Vec<DirectoryEntry>, _) = client
        .execute(client.external(Method::GET, &url))
        .await?
        .json()
        .await?;

    debug!(count = entries.len(), "Fetched data plug directory");
    Ok(entries
        .into_iter()
        .map(|entry| DataPlug::new(entry.name, entry.url))
        .collect())
}

/// Checks whether `plug` is set up for this account
///
/// Failing to obtain the application token is an error. Once the token is
/// in hand, any error status from the plug means "not active"; only a
/// network failure is reported as an error.
pub async fn is_active(
    client: &HatClient,
    token: &AccessToken,
    plug: &DataPlug,
) -> Result<Renewable<bool>, HatError> {
    let mut cursor = TokenCursor::new(token);

    // Step 1: Application token for the plug
    let app = application_token(client, cursor.token(), &plug.name, &plug.url).await?;
    cursor.observe(app.renewed_token);

    // Step 2: Plug status
    let url = format!("{}/api/status", plug.url.trim_end_matches('/'));
    let request = client
        .external(Method::GET, &url)
        .header(APP_TOKEN_HEADER, app.value.secret());

    let active = match client.execute(request).await {
        Ok(_) => true,
        Err(HatError::NetworkError(e)) => return Err(HatError::NetworkError(e)),
        Err(e) => {
            debug!(plug = %plug.name, error = %e, "Data plug reports inactive");
            false
        }
    };

    info!(plug = %plug.name, active, "Checked data plug status");
    Ok(cursor.finish(active))
}

// ============================================================================
// Offers
// ============================================================================

/// Where and how to claim an offer
#[derive(Debug, Clone)]
pub struct OfferClaim<'a> {
    /// MarketSquare base URL
    pub marketsquare_url: &'a str,
    /// Application name the HAT knows MarketSquare by
    pub app_name: &'a str,
    pub offer_id: &'a str,
}

/// Claims an offer through MarketSquare
///
/// Tries `userClaim` first and falls back to `claim` when the former is not
/// found. A 400 mentioning "already claimed" becomes
/// [`HatError::OfferAlreadyClaimed`].
pub async fn claim_offer(
    client: &HatClient,
    token: &AccessToken,
    offer: &OfferClaim<'_>,
) -> Result<Renewable<()>, HatError> {
    let mut cursor = TokenCursor::new(token);
    let base = offer.marketsquare_url.trim_end_matches('/');

    // Step 1: Application token for MarketSquare
    let app = application_token(client, cursor.token(), offer.app_name, base).await?;
    cursor.observe(app.renewed_token);

    // Step 2: Claim, falling back to the legacy endpoint
    let claim = |endpoint: &str| {
        let url = format!("{}/api/offer/{}/{}", base, offer.offer_id, endpoint);
        client
            .external(Method::GET, &url)
            .header(APP_TOKEN_HEADER, app.value.secret())
    };

    let result = match client.execute(claim("userClaim")).await {
        Err(HatError::NotFound(_)) => {
            debug!(offer = offer.offer_id, "userClaim not found, trying claim");
            client.execute(claim("claim")).await
        }
        other => other,
    };

    match result {
        Ok(_) => {
            info!(offer = offer.offer_id, "Offer claimed");
            Ok(cursor.finish(()))
        }
        Err(HatError::BadRequest(message)) if mentions_already_claimed(&message) => {
            info!(offer = offer.offer_id, "Offer was already claimed");
            Err(HatError::OfferAlreadyClaimed)
        }
        Err(e) => Err(e),
    }
}

fn mentions_already_claimed(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already claimed")
}
