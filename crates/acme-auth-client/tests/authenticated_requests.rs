mod common;

use acme_auth_client::{AuthError, AuthenticatedClient, LoginRequest, SessionPhase};
use acme_token_store::TokenStore;
use common::*;
use httpmock::prelude::*;
use serde_json::json;

async fn logged_in_client(server: &MockServer) -> AuthenticatedClient {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(200).json_body(auth_body("A", "B"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/me");
            then.status(200).json_body(user_body());
        })
        .await;

    let session = session(server, TokenStore::in_memory());
    session
        .login(&LoginRequest::new("ada@example.com", "hunter22"))
        .await
        .unwrap();

    AuthenticatedClient::new(session, reqwest::Client::new())
}

#[tokio::test]
async fn test_unauthorized_response_refreshes_once_and_retries() {
    let server = MockServer::start_async().await;
    let client = logged_in_client(&server).await;

    let stale = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/tickets")
                .header("Authorization", "Bearer A");
            then.status(401);
        })
        .await;
    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/auth/refresh")
                .json_body(json!({"refreshToken": "B"}));
            then.status(200).json_body(auth_body("C", "B"));
        })
        .await;
    let fresh = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/tickets")
                .header("Authorization", "Bearer C");
            then.status(200).json_body(json!([{"id": 1}]));
        })
        .await;

    let request = client
        .request(reqwest::Method::GET, server.url("/api/tickets"))
        .build()
        .unwrap();
    let response = client.fetch(request).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(stale.hits_async().await, 1);
    assert_eq!(refresh.hits_async().await, 1);
    assert_eq!(fresh.hits_async().await, 1);
    assert_eq!(client.session().access_token().as_deref(), Some("C"));
    assert_eq!(
        client.session().tokens().get_access_token().as_deref(),
        Some("C")
    );
}

#[tokio::test]
async fn test_second_unauthorized_response_is_returned() {
    let server = MockServer::start_async().await;
    let client = logged_in_client(&server).await;

    let tickets = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tickets");
            then.status(401);
        })
        .await;
    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/refresh");
            then.status(200).json_body(auth_body("C", "B"));
        })
        .await;

    let request = client
        .request(reqwest::Method::GET, server.url("/api/tickets"))
        .build()
        .unwrap();
    let response = client.fetch(request).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(tickets.hits_async().await, 2);
    assert_eq!(refresh.hits_async().await, 1);
    // The refresh itself worked, so the session survives.
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn test_failed_refresh_expires_session() {
    let server = MockServer::start_async().await;
    let client = logged_in_client(&server).await;

    let tickets = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tickets");
            then.status(401);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/refresh");
            then.status(401)
                .json_body(error_body("UNAUTHORIZED", "Refresh token expired"));
        })
        .await;

    let request = client
        .request(reqwest::Method::GET, server.url("/api/tickets"))
        .build()
        .unwrap();
    let err = client.fetch(request).await.unwrap_err();

    assert!(matches!(err, AuthError::SessionExpired));
    assert_eq!(
        err.to_string(),
        "Your session has expired. Please log in again."
    );
    assert_eq!(tickets.hits_async().await, 1);
    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().phase(), SessionPhase::Anonymous);
    assert_eq!(client.session().tokens().get_access_token(), None);
    assert_eq!(client.session().tokens().get_refresh_token(), None);
}

#[tokio::test]
async fn test_json_retries_post_with_same_body() {
    let server = MockServer::start_async().await;
    let client = logged_in_client(&server).await;

    let stale = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/tickets")
                .header("Authorization", "Bearer A")
                .json_body(json!({"title": "Printer on fire"}));
            then.status(401);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/refresh");
            then.status(200).json_body(auth_body("C", "B"));
        })
        .await;
    let fresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/tickets")
                .header("Authorization", "Bearer C")
                .json_body(json!({"title": "Printer on fire"}));
            then.status(201).json_body(json!({"id": 7}));
        })
        .await;

    let created: serde_json::Value = client
        .post_json(server.url("/api/tickets"), &json!({"title": "Printer on fire"}))
        .await
        .unwrap();

    assert_eq!(created, json!({"id": 7}));
    stale.assert_async().await;
    fresh.assert_async().await;
}

#[tokio::test]
async fn test_json_unauthorized_after_retry_is_an_api_error() {
    let server = MockServer::start_async().await;
    let client = logged_in_client(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/admin");
            then.status(401)
                .json_body(error_body("UNAUTHORIZED", "Admin only"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/refresh");
            then.status(200).json_body(auth_body("C", "B"));
        })
        .await;

    let err = client
        .get_json::<serde_json::Value>(server.url("/api/admin"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.api_error().unwrap().message, "Admin only");
}
