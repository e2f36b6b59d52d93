//! Heartbeat API integration tests.
//!
//! Run with: `cargo test -p hygiene-api --test heartbeat_test`

use axum_test::TestServer;
use hygiene_api::setup::routes::setup_routes;

fn server() -> TestServer {
    TestServer::new(setup_routes()).unwrap()
}

#[tokio::test]
async fn test_heartbeat_returns_heart() {
    let server = server();

    let response = server.get("/v1/heartbeat").await;

    response.assert_status_ok();
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("application/json"));
    let body: serde_json::Value = response.json();
    assert_eq!(body, serde_json::json!("❤"));
}

#[tokio::test]
async fn test_heartbeat_requires_version_prefix() {
    let server = server();

    let response = server.get("/heartbeat").expect_failure().await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_heartbeat_rejects_other_methods() {
    let server = server();

    let response = server.post("/v1/heartbeat").expect_failure().await;

    assert_eq!(response.status_code(), 405);
}
