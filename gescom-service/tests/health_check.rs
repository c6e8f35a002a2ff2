mod common;

use common::TestApp;

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "gescom-service");

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ready");

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn metrics_endpoint_returns_prometheus_format() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body = response.text().await.expect("Failed to get response body");
    assert!(
        body.is_empty() || body.contains('#') || body.contains('_'),
        "Unexpected metrics format: {}",
        body
    );

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn protected_routes_reject_missing_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/clients", app.api))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);

    app.cleanup().await;
}
