//! Shared test helpers for HAT API integration tests
//!
//! Provides a wiremock server standing in for the HAT, the Dex directory,
//! one data plug and MarketSquare, all under different path prefixes.

use rumpel_core::domain::{AccessToken, DataPlug, HatDomain};
use rumpel_hat::client::HatClient;
use rumpel_hat::provider::{HatApiService, HatServiceSettings};
use wiremock::MockServer;

/// Token the tests authenticate with
pub const TOKEN: &str = "test-token";

/// Path prefix of the configured Facebook plug
pub const FACEBOOK_PLUG_PREFIX: &str = "/facebook-plug";

/// Path prefix of MarketSquare
pub const MARKETSQUARE_PREFIX: &str = "/marketsquare";

pub fn token() -> AccessToken {
    AccessToken::new(TOKEN).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Starts a mock server and returns a service pointed at it
///
/// Only the Facebook plug is configured; other plugs must come from
/// the directory at `/api/dataplugs`.
pub async fn setup_hat_mock() -> (MockServer, HatApiService) {
    let server = MockServer::start().await;
    let uri = server.uri();

    let settings = HatServiceSettings {
        notes_take: 50,
        upload_tags: vec!["rumpel".into(), "notes".into()],
        directory_url: uri.clone(),
        plugs: vec![DataPlug::new("facebook", format!("{uri}{FACEBOOK_PLUG_PREFIX}"))],
        marketsquare_url: format!("{uri}{MARKETSQUARE_PREFIX}"),
        offer_app_name: "MarketSquare".into(),
        ..HatServiceSettings::default()
    };
    let domain = HatDomain::new("alice.hubofallthings.net").unwrap();
    let service = HatApiService::with_client(HatClient::with_base_url(&uri), domain, settings);

    (server, service)
}
