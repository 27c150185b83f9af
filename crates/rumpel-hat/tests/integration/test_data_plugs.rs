//! Data plug directory, plug status and offer claims

use rumpel_core::domain::DEFAULT_OFFER_ID;
use rumpel_core::ports::{HatApiError, HatService};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, FACEBOOK_PLUG_PREFIX, MARKETSQUARE_PREFIX};

async fn mount_app_token(server: &MockServer, name: &str, app_token: &str) {
    Mock::given(method("GET"))
        .and(path("/users/application_token"))
        .and(query_param("name", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": app_token
        })))
        .mount(server)
        .await;
}

fn offer_path(endpoint: &str) -> String {
    format!("{MARKETSQUARE_PREFIX}/api/offer/{DEFAULT_OFFER_ID}/{endpoint}")
}

#[tokio::test]
async fn test_list_data_plugs_from_directory() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/dataplugs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "facebook", "url": "https://social-plug.hubofallthings.com/dataplug", "description": "" },
            { "name": "twitter", "url": "https://twitter-plug.hubofallthings.com" }
        ])))
        .mount(&server)
        .await;

    let plugs = service.list_data_plugs(&common::token()).await.unwrap().value;

    assert_eq!(plugs.len(), 2);
    assert_eq!(plugs[1].name, "twitter");
}

#[tokio::test]
async fn test_active_plug_checked_with_app_token() {
    let (server, service) = common::setup_hat_mock().await;
    mount_app_token(&server, "facebook", "app-fb").await;

    Mock::given(method("GET"))
        .and(path(format!("{FACEBOOK_PLUG_PREFIX}/api/status")))
        .and(header("x-auth-token", "app-fb"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let active = service
        .is_data_plug_active(&common::token(), "facebook")
        .await
        .unwrap();
    assert!(active.value);
}

#[tokio::test]
async fn test_plug_error_status_means_inactive() {
    let (server, service) = common::setup_hat_mock().await;
    mount_app_token(&server, "facebook", "app-fb").await;

    Mock::given(method("GET"))
        .and(path(format!("{FACEBOOK_PLUG_PREFIX}/api/status")))
        .respond_with(ResponseTemplate::new(403).set_body_string("not set up"))
        .mount(&server)
        .await;

    let active = service
        .is_data_plug_active(&common::token(), "facebook")
        .await
        .unwrap();
    assert!(!active.value);
}

#[tokio::test]
async fn test_app_token_failure_is_an_error() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/application_token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = service
        .is_data_plug_active(&common::token(), "facebook")
        .await
        .unwrap_err();
    assert_eq!(err, HatApiError::TokenExpired);
}

#[tokio::test]
async fn test_unconfigured_plug_resolved_from_directory() {
    let (server, service) = common::setup_hat_mock().await;
    mount_app_token(&server, "twitter", "app-tw").await;

    Mock::given(method("GET"))
        .and(path("/api/dataplugs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "twitter", "url": format!("{}/twitter-plug", server.uri()) }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/twitter-plug/api/status"))
        .and(header("x-auth-token", "app-tw"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let active = service
        .is_data_plug_active(&common::token(), "twitter")
        .await
        .unwrap();
    assert!(active.value);
}

#[tokio::test]
async fn test_unknown_plug_is_not_found() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/dataplugs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let err = service
        .is_data_plug_active(&common::token(), "myspace")
        .await
        .unwrap_err();
    assert!(matches!(err, HatApiError::NotFound(_)));
}

#[tokio::test]
async fn test_claim_offer_with_user_claim() {
    let (server, service) = common::setup_hat_mock().await;
    mount_app_token(&server, "MarketSquare", "app-ms").await;

    Mock::given(method("GET"))
        .and(path(offer_path("userClaim")))
        .and(header("x-auth-token", "app-ms"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    service
        .claim_offer(&common::token(), DEFAULT_OFFER_ID)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_claim_offer_falls_back_to_claim() {
    let (server, service) = common::setup_hat_mock().await;
    mount_app_token(&server, "MarketSquare", "app-ms").await;

    Mock::given(method("GET"))
        .and(path(offer_path("userClaim")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(offer_path("claim")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    service
        .claim_offer(&common::token(), DEFAULT_OFFER_ID)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_already_claimed_offer() {
    let (server, service) = common::setup_hat_mock().await;
    mount_app_token(&server, "MarketSquare", "app-ms").await;

    Mock::given(method("GET"))
        .and(path(offer_path("userClaim")))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "Bad Request",
            "message": "Offer already claimed"
        })))
        .mount(&server)
        .await;

    let err = service
        .claim_offer(&common::token(), DEFAULT_OFFER_ID)
        .await
        .unwrap_err();
    assert_eq!(err, HatApiError::OfferAlreadyClaimed);
}

#[tokio::test]
async fn test_other_claim_failure_is_server_error() {
    let (server, service) = common::setup_hat_mock().await;
    mount_app_token(&server, "MarketSquare", "app-ms").await;

    Mock::given(method("GET"))
        .and(path(offer_path("userClaim")))
        .respond_with(ResponseTemplate::new(400).set_body_string("Offer expired"))
        .mount(&server)
        .await;

    let err = service
        .claim_offer(&common::token(), DEFAULT_OFFER_ID)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HatApiError::Server {
            status: 400,
            message: "Offer expired".into()
        }
    );
}
