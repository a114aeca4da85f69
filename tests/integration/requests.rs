//! Integration tests for request encoding

use super::*;
use serde_json::json;
use session_client_integration::{FormField, RequestDescriptor};
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::Mock;

#[tokio::test]
async fn test_json_request_with_token_and_query() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/places"))
        .and(query_param("lang", "en"))
        .and(header("authorization", "Bearer a1"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "Harbor", "rating": 4})))
        .respond_with(success_response(json!({"id": "p1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_signed_in_client(&server, "a1", "r1").await;

    let response = client
        .request(
            RequestDescriptor::post("/places")
                .param("lang", "en")
                .json(json!({"name": "Harbor", "rating": 4})),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.data["id"], "p1");
}

#[tokio::test]
async fn test_unauthenticated_request_without_session() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(success_response(json!([1, 2, 3])))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let response = client.get("/public").await.unwrap();
    assert_eq!(response.data, json!([1, 2, 3]));

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_form_data_request_is_multipart() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("Sunset"))
        .and(body_string_contains("filename=\"photo.jpg\""))
        .and(body_string_contains("JPEGDATA"))
        .respond_with(success_response(json!({"uploaded": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_signed_in_client(&server, "a1", "r1").await;

    let response = client
        .request(RequestDescriptor::post("/uploads").form(vec![
            FormField::text("title", "Sunset"),
            FormField::file(
                "photo",
                "photo.jpg",
                Some("image/jpeg".to_string()),
                b"JPEGDATA".to_vec(),
            ),
        ]))
        .await
        .unwrap();

    assert_eq!(response.data["uploaded"], true);
}

#[tokio::test]
async fn test_json_body_flagged_as_form_data() {
    let server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path("/profile"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"nickname\""))
        .and(body_string_contains("name=\"tags\""))
        .respond_with(success_response(json!({"saved": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_signed_in_client(&server, "a1", "r1").await;

    client
        .request(
            RequestDescriptor::put("/profile")
                .json(json!({"nickname": "ada", "tags": ["a", "b"], "bio": null}))
                .form_data(),
        )
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains(r#"["a","b"]"#));
    assert!(!body.contains("name=\"bio\""));
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = setup_mock_server().await;

    Mock::given(method("DELETE"))
        .and(path("/places/p1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = create_signed_in_client(&server, "a1", "r1").await;
    let response = client.delete("/places/p1").await.unwrap();

    assert_eq!(response.status, 204);
    assert!(response.data.is_null());
}
