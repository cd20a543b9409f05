//! Integration tests for health and metrics endpoints.

mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use admin_console_api::middleware::REQUEST_ID_HEADER;
use common::{create_test_app, get_request, parse_response_body, seeded_store};

#[tokio::test]
async fn test_health_check_memory_store() {
    let app = create_test_app(seeded_store().await).await;

    let response = app.router.oneshot(get_request("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["connected"], true);
}

#[tokio::test]
async fn test_liveness() {
    let app = create_test_app(seeded_store().await).await;

    let response = app.router.oneshot(get_request("/api/health/live")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_test_app(seeded_store().await).await;

    let response = app
        .router
        .oneshot(get_request("/api/admin/v1/nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
