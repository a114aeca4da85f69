//! Integration tests for error normalization

use super::*;
use serde_json::json;
use session_client_integration::{GENERIC_ERROR_MESSAGE, SERVICE_UNAVAILABLE_STATUS};
use wiremock::matchers::{method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_message_error_keeps_server_fields() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/orders/9"))
        .respond_with(error_response(
            404,
            json!({"message": "Order not found", "code": "ORDER_MISSING", "status": 999}),
        ))
        .mount(&server)
        .await;

    let client = create_signed_in_client(&server, "a1", "r1").await;
    let error = client.get("/orders/9").await.unwrap_err();

    assert_eq!(error.status, 404);
    assert_eq!(error.message_text(), "Order not found");
    assert_eq!(error.field("code"), Some(&json!("ORDER_MISSING")));
    assert_eq!(error.field("status"), None);
}

#[tokio::test]
async fn test_validation_errors_surface_as_field_errors() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(error_response(
            422,
            json!({"errors": [{"msg": "Email is invalid", "param": "email"}]}),
        ))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let error = client.post("/users", json!({"email": "nope"})).await.unwrap_err();

    assert_eq!(error.status, 422);
    let errors = error.message.field_errors().expect("field errors");
    assert_eq!(errors[0]["param"], "email");
    assert_eq!(error.message_text(), "Email is invalid");
}

#[tokio::test]
async fn test_unparseable_error_body_is_generic() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let error = client.get("/broken").await.unwrap_err();

    assert_eq!(error.status, 500);
    assert_eq!(error.message_text(), GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_unreachable_server_is_service_unavailable() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = client_config()
        .base_url(format!("http://127.0.0.1:{}", port))
        .build()
        .unwrap();
    let client = ApiClient::new(config).unwrap();

    let error = client.get("/anything").await.unwrap_err();

    assert_eq!(error.status, SERVICE_UNAVAILABLE_STATUS);
    assert_eq!(error.message_text(), GENERIC_ERROR_MESSAGE);
    assert_eq!(client.refresh_stats().failed, 0);
}

#[tokio::test]
async fn test_error_serializes_to_uniform_shape() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(error_response(429, json!({"message": "Slow down", "retryAfter": 30})))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let error = client.get("/limited").await.unwrap_err();

    assert_eq!(
        serde_json::to_value(&error).unwrap(),
        json!({"message": "Slow down", "status": 429, "retryAfter": 30})
    );
}
