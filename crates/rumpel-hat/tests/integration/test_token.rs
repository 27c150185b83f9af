//! Token validation against `/users/access_token/validate`

use rumpel_core::ports::{HatApiError, HatService, TokenStatus};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_valid_token_with_bearer_header() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/access_token/validate"))
        .and(header("authorization", common::bearer(common::TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Authenticated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = service.validate_token(&common::token()).await.unwrap();

    assert_eq!(result.value, TokenStatus::Valid);
    assert!(result.renewed_token.is_none());
}

#[tokio::test]
async fn test_validation_returns_renewed_token() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/access_token/validate"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-auth-token", "renewed-token"))
        .mount(&server)
        .await;

    let result = service.validate_token(&common::token()).await.unwrap();

    assert_eq!(result.value, TokenStatus::Valid);
    assert_eq!(result.renewed_token.unwrap().secret(), "renewed-token");
}

#[tokio::test]
async fn test_rejected_token_is_expired_not_error() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/access_token/validate"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Token expired"))
        .mount(&server)
        .await;

    let result = service.validate_token(&common::token()).await.unwrap();

    assert_eq!(result.value, TokenStatus::Expired);
}

#[tokio::test]
async fn test_server_error_is_reported_once() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/access_token/validate"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = service.validate_token(&common::token()).await.unwrap_err();

    assert_eq!(
        err,
        HatApiError::Server {
            status: 503,
            message: "Service Unavailable".into()
        }
    );
}
