//! Integration tests using WireMock
//!
//! These tests drive the client through the real reqwest transport against a
//! mock HTTP server, covering token refresh, request encoding and error shapes.

mod errors;
mod refresh_flow;
mod requests;

use session_client_integration::{client_config, ApiClient, SessionTokens};
use wiremock::{MockServer, ResponseTemplate};

/// Helper to create a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Helper to create a client pointing at the mock server
pub fn create_client(server: &MockServer) -> ApiClient {
    let config = client_config()
        .base_url(server.uri())
        .build()
        .expect("Failed to build config");
    ApiClient::new(config).expect("Failed to build client")
}

/// Helper to create a client with a stored session
pub async fn create_signed_in_client(server: &MockServer, access: &str, refresh: &str) -> ApiClient {
    let client = create_client(server);
    client
        .set_session(&SessionTokens::new(access, refresh))
        .await
        .expect("Failed to store session");
    client
}

/// Helper to create error response templates
pub fn error_response(status: u16, error_body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(error_body)
}

/// Helper to create success response templates
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}
