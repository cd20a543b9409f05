//! Integration tests for the subscription lifecycle endpoints.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use domain::models::{Plan, PlanStatus, Profile, UserType};
use domain::store::Table;
use persistence::{FailureRule, StoreOp};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use common::{
    admin, create_test_app, empty_request, get_request, json_request, parse_response_body, plan,
    profile, seeded_store, TestApp,
};

struct Fixture {
    app: TestApp,
    user: Profile,
    pro: Plan,
    enterprise: Plan,
}

async fn setup() -> Fixture {
    let store = seeded_store().await;
    let user = profile(UserType::Business, Utc::now());
    let pro = plan("pro", 29.0);
    let enterprise = plan("enterprise", 99.0);
    let mut legacy = plan("legacy", 5.0);
    legacy.status = PlanStatus::Inactive;

    store.seed(Table::Profiles, &[user.clone()]).await.unwrap();
    store
        .seed(Table::Plans, &[pro.clone(), enterprise.clone(), legacy])
        .await
        .unwrap();

    Fixture {
        app: create_test_app(store).await,
        user,
        pro,
        enterprise,
    }
}

fn subscription_uri(user_id: Uuid) -> String {
    admin(&format!("/users/{}/subscription", user_id))
}

async fn assign(f: &Fixture, plan_id: Uuid) -> axum::response::Response {
    f.app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &subscription_uri(f.user.id),
            json!({"plan_id": plan_id}),
        ))
        .await
        .unwrap()
}

// ============================================================================
// Assign
// ============================================================================

#[tokio::test]
async fn test_assign_plan() {
    let f = setup().await;

    let response = assign(&f, f.pro.id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["plan_id"], f.pro.id.to_string());
    assert_eq!(body["status"], "active");
    assert!(body["cancelled_at"].is_null());

    let response = f
        .app
        .router
        .clone()
        .oneshot(get_request(&subscription_uri(f.user.id)))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["subscription"]["plan_id"], f.pro.id.to_string());

    let response = f
        .app
        .router
        .oneshot(get_request(&admin(&format!("/users/{}", f.user.id))))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["plan_id"], f.pro.id.to_string());
}

#[tokio::test]
async fn test_reassign_cancels_previous() {
    let f = setup().await;

    assert_eq!(assign(&f, f.pro.id).await.status(), StatusCode::CREATED);
    assert_eq!(assign(&f, f.enterprise.id).await.status(), StatusCode::CREATED);

    let response = f
        .app
        .router
        .clone()
        .oneshot(get_request(&admin(&format!(
            "/users/{}/subscriptions",
            f.user.id
        ))))
        .await
        .unwrap();
    let history = parse_response_body(response).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);

    let active: Vec<_> = history.iter().filter(|s| s["status"] == "active").collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["plan_id"], f.enterprise.id.to_string());

    let cancelled = history
        .iter()
        .find(|s| s["plan_id"] == f.pro.id.to_string())
        .unwrap();
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["cancelled_at"].is_string());

    let response = f
        .app
        .router
        .oneshot(get_request(&admin(&format!("/users/{}", f.user.id))))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["plan_id"], f.enterprise.id.to_string());
}

#[tokio::test]
async fn test_assign_inactive_plan_rejected() {
    let f = setup().await;
    let legacy = f
        .app
        .store
        .rows(Table::Plans)
        .await
        .into_iter()
        .find(|p| p["slug"] == "legacy")
        .unwrap();
    let legacy_id: Uuid = legacy["id"].as_str().unwrap().parse().unwrap();

    let response = assign(&f, legacy_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(f.app.store.rows(Table::Subscriptions).await.is_empty());
}

#[tokio::test]
async fn test_assign_unknown_plan_or_user() {
    let f = setup().await;

    let response = assign(&f, Uuid::new_v4()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = f
        .app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &subscription_uri(Uuid::new_v4()),
            json!({"plan_id": f.pro.id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_assign_leaves_previous_subscription() {
    let f = setup().await;
    assert_eq!(assign(&f, f.pro.id).await.status(), StatusCode::CREATED);

    f.app.store.fail_on(
        FailureRule::table(Table::Profiles)
            .op(StoreOp::Update)
            .key(f.user.id.to_string()),
    );
    let response = assign(&f, f.enterprise.id).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    f.app.store.clear_failures();

    let subscriptions = f.app.store.rows(Table::Subscriptions).await;
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0]["status"], "active");
    assert_eq!(subscriptions[0]["plan_id"], f.pro.id.to_string());
}

// ============================================================================
// Cancel
// ============================================================================

#[tokio::test]
async fn test_cancel_twice() {
    let f = setup().await;
    assert_eq!(assign(&f, f.pro.id).await.status(), StatusCode::CREATED);

    let response = f
        .app
        .router
        .clone()
        .oneshot(empty_request(Method::DELETE, &subscription_uri(f.user.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["cancelled"]["status"], "cancelled");
    assert_eq!(body["cancelled"]["plan_id"], f.pro.id.to_string());

    // Second cancel is a no-op
    let response = f
        .app
        .router
        .clone()
        .oneshot(empty_request(Method::DELETE, &subscription_uri(f.user.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert!(body["cancelled"].is_null());

    let response = f
        .app
        .router
        .oneshot(get_request(&admin(&format!("/users/{}", f.user.id))))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert!(body["plan_id"].is_null());
}

#[tokio::test]
async fn test_plan_delete_blocked_by_subscribers() {
    let f = setup().await;
    assert_eq!(assign(&f, f.pro.id).await.status(), StatusCode::CREATED);
    let plan_uri = admin(&format!("/plans/{}", f.pro.id));

    let response = f
        .app
        .router
        .clone()
        .oneshot(empty_request(Method::DELETE, &plan_uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    f.app
        .router
        .clone()
        .oneshot(empty_request(Method::DELETE, &subscription_uri(f.user.id)))
        .await
        .unwrap();

    let response = f
        .app
        .router
        .oneshot(empty_request(Method::DELETE, &plan_uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_deleting_subscribed_user_drops_subscription() {
    let f = setup().await;
    assert_eq!(assign(&f, f.pro.id).await.status(), StatusCode::CREATED);

    let response = f
        .app
        .router
        .clone()
        .oneshot(empty_request(Method::DELETE, &admin(&format!("/users/{}", f.user.id))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(f.app.store.rows(Table::Subscriptions).await.is_empty());

    let response = f
        .app
        .router
        .clone()
        .oneshot(get_request(&admin("/stats")))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["total_users"], 0);
    assert_eq!(body["total_revenue"], 0.0);

    let response = f
        .app
        .router
        .oneshot(empty_request(Method::DELETE, &admin(&format!("/plans/{}", f.pro.id))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
