//! Token acquisition against a mocked auth endpoint.

mod common;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::*;
use personio_extract::{RefreshCadence, TapError, TokenProvider};

fn provider(mock: &MockPersonioServer, cadence: RefreshCadence) -> TokenProvider {
    TokenProvider::new(
        reqwest::Client::new(),
        format!("{}/auth", mock.base_url()),
        CLIENT_ID,
        SecretString::new(CLIENT_SECRET.to_string()),
        cadence,
    )
}

#[tokio::test]
async fn test_authenticate_returns_token() {
    let mock = MockPersonioServer::new().await;
    mock.mock_auth("fresh-token").await;

    let tokens = provider(&mock, RefreshCadence::PerPage);
    let token = tokens.authenticate().await.unwrap();

    assert_eq!(token.expose(), "fresh-token");
    assert_eq!(tokens.requests_issued(), 1);
}

#[tokio::test]
async fn test_rejected_credentials_are_an_auth_error() {
    let mock = MockPersonioServer::new().await;
    mock.mock_auth_failure("Wrong credentials").await;

    let tokens = provider(&mock, RefreshCadence::PerPage);
    match tokens.authenticate().await {
        Err(TapError::Auth { message }) => assert_eq!(message, "Wrong credentials"),
        other => panic!("expected Auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_auth_response_is_an_auth_error() {
    let mock = MockPersonioServer::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock.server)
        .await;

    let tokens = provider(&mock, RefreshCadence::PerPage);
    let err = tokens.authenticate().await.unwrap_err();
    assert!(matches!(err, TapError::Auth { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_success_without_token_is_an_auth_error() {
    let mock = MockPersonioServer::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {}})))
        .mount(&mock.server)
        .await;

    let tokens = provider(&mock, RefreshCadence::PerPage);
    assert!(matches!(
        tokens.authenticate().await,
        Err(TapError::Auth { .. })
    ));
}

#[tokio::test]
async fn test_per_page_cadence_always_requests() {
    let mock = MockPersonioServer::new().await;
    mock.mock_auth("tok").await;

    let tokens = provider(&mock, RefreshCadence::PerPage);
    tokens.token().await.unwrap();
    tokens.token().await.unwrap();

    assert_eq!(mock.auth_requests().await, 2);
}

#[tokio::test]
async fn test_once_cadence_caches_until_invalidated() {
    let mock = MockPersonioServer::new().await;
    mock.mock_auth("tok").await;

    let tokens = provider(&mock, RefreshCadence::Once);
    tokens.token().await.unwrap();
    tokens.token().await.unwrap();
    assert_eq!(mock.auth_requests().await, 1);

    tokens.invalidate().await;
    tokens.token().await.unwrap();
    assert_eq!(mock.auth_requests().await, 2);
}
