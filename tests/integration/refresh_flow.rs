//! Integration tests for coordinated token refresh

use super::*;
use futures::future::join_all;
use serde_json::json;
use session_client_integration::RequestDescriptor;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::Mock;

async fn mount_refresh(server: &MockServer, response: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(body_json(json!({"refreshToken": "r1"})))
        .respond_with(response.set_delay(Duration::from_millis(200)))
        .expect(expected)
        .mount(server)
        .await;
}

/// Items answer with data for the new token and 401 for anything else.
async fn mount_items(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex("^/items/[0-9]+$"))
        .and(header("authorization", "Bearer new"))
        .respond_with(success_response(json!({"ok": true})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex("^/items/[0-9]+$"))
        .respond_with(error_response(401, json!({"message": "jwt expired"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = setup_mock_server().await;
    mount_refresh(
        &server,
        success_response(json!({"accessToken": "new", "refreshToken": "r2"})),
        1,
    )
    .await;
    mount_items(&server).await;

    let client = create_signed_in_client(&server, "old", "r1").await;

    let paths: Vec<String> = (0..3).map(|i| format!("/items/{}", i)).collect();
    let results = join_all(paths.iter().map(|p| client.get(p))).await;

    for result in results {
        let response = result.expect("request should succeed after refresh");
        assert_eq!(response.data["ok"], true);
    }

    let session = client.session().await.unwrap();
    assert_eq!(session, SessionTokens::new("new", "r2"));
    assert_eq!(client.refresh_stats().succeeded, 1);

    let received = server.received_requests().await.unwrap();
    let replays = received
        .iter()
        .filter(|r| {
            r.headers
                .get("authorization")
                .map(|v| v.as_bytes() == b"Bearer new")
                .unwrap_or(false)
        })
        .count();
    assert_eq!(replays, 3);
}

#[tokio::test]
async fn test_failed_refresh_rejects_all_queued_requests() {
    let server = setup_mock_server().await;
    mount_refresh(
        &server,
        error_response(401, json!({"message": "Refresh token expired"})),
        1,
    )
    .await;
    mount_items(&server).await;

    let client = create_signed_in_client(&server, "old", "r1").await;

    let paths: Vec<String> = (0..3).map(|i| format!("/items/{}", i)).collect();
    let results = join_all(paths.iter().map(|p| client.get(p))).await;

    for result in results {
        let error = result.expect_err("request should fail with the refresh error");
        assert_eq!(error.status, 401);
        assert_eq!(error.message_text(), "Refresh token expired");
    }

    assert!(!client.coordinator().is_refreshing());
    assert_eq!(client.coordinator().pending_len(), 0);
    assert_eq!(client.refresh_stats().failed, 1);
    // Tokens stay in place; clearing them is the caller's call.
    assert_eq!(client.session().await.unwrap(), SessionTokens::new("old", "r1"));
}

#[tokio::test]
async fn test_replayed_request_is_not_refreshed_twice() {
    let server = setup_mock_server().await;
    mount_refresh(&server, success_response(json!({"accessToken": "new"})), 1).await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(error_response(401, json!({"message": "still unauthorized"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = create_signed_in_client(&server, "old", "r1").await;

    let error = client.get("/me").await.unwrap_err();
    assert_eq!(error.status, 401);
    assert_eq!(error.message_text(), "still unauthorized");
    assert_eq!(client.refresh_stats().succeeded, 1);
}

#[tokio::test]
async fn test_skip_auth_request_never_refreshes() {
    let server = setup_mock_server().await;
    mount_refresh(&server, success_response(json!({"accessToken": "new"})), 0).await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(error_response(401, json!({"message": "Invalid credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_signed_in_client(&server, "old", "r1").await;

    let error = client
        .request(
            RequestDescriptor::post("/auth/login")
                .json(json!({"password": "x"}))
                .skip_auth(),
        )
        .await
        .unwrap_err();

    assert_eq!(error.status, 401);
    assert_eq!(error.message_text(), "Invalid credentials");

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_exchange() {
    let server = setup_mock_server().await;
    mount_refresh(&server, success_response(json!({"accessToken": "new"})), 0).await;
    mount_items(&server).await;

    let client = create_client(&server);
    client
        .set_session(&SessionTokens {
            access_token: Some("old".to_string()),
            refresh_token: None,
        })
        .await
        .unwrap();

    let error = client.get("/items/1").await.unwrap_err();
    assert_eq!(error.status, 401);
    assert_eq!(error.message_text(), "jwt expired");
}

#[tokio::test]
async fn test_sign_in_then_refresh_with_file_store() {
    let server = setup_mock_server().await;
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(success_response(json!({
            "accessToken": "old",
            "refreshToken": "r1",
            "user": {"id": 42}
        })))
        .mount(&server)
        .await;
    mount_refresh(&server, success_response(json!({"data": {"accessToken": "new"}})), 1).await;
    mount_items(&server).await;

    let config = client_config().base_url(server.uri()).build().unwrap();
    let client = ApiClient::with_components(
        config,
        session_client_integration::ReqwestHttpTransport::new().unwrap(),
        session_client_integration::FileCredentialStore::new(&store_path),
    );

    client
        .sign_in(RequestDescriptor::post("/auth/login").json(json!({"email": "a@b.c"})))
        .await
        .unwrap();
    assert_eq!(client.cached_user().await.unwrap(), Some(json!({"id": 42})));

    let response = client.get("/items/7").await.unwrap();
    assert_eq!(response.status, 200);

    let persisted: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    assert_eq!(persisted["accessToken"], "new");
    assert_eq!(persisted["refreshToken"], "r1");
}
