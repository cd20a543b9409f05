//! Common test utilities for integration tests.
//!
//! Builds the full router over an in-memory store so handlers, services and
//! the store boundary are exercised together without a database.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use domain::models::{
    BillingCycle, Order, Plan, PlanStatus, PlatformModule, Profile, ModuleStatus, SettingKind,
    SettingValue, SystemSetting, UserType,
};
use domain::store::Table;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use persistence::MemoryStore;
use serde_json::Value;
use uuid::Uuid;

use admin_console_api::{
    app::{create_app, AppState},
    config::Config,
};

pub const ADMIN_PREFIX: &str = "/api/admin/v1";

/// Router plus a handle on the store behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

/// Test configuration built from embedded defaults.
pub fn test_config() -> Config {
    Config::load_for_test(&[]).expect("Failed to build test config")
}

/// Build the app over `store`, loading whatever settings it holds.
pub async fn create_test_app(store: Arc<MemoryStore>) -> TestApp {
    let state = AppState::build(test_config(), store.clone(), None)
        .await
        .expect("Failed to build app state");
    TestApp {
        router: create_app(state),
        store,
    }
}

/// A store seeded with the default settings and nothing else.
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(Table::SystemSettings, &default_settings())
        .await
        .expect("Failed to seed settings");
    store
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn profile(user_type: UserType, created_at: DateTime<Utc>) -> Profile {
    let mut profile = Profile::new(
        Name().fake::<String>(),
        SafeEmail().fake::<String>(),
        user_type,
    );
    profile.created_at = created_at;
    profile.updated_at = created_at;
    profile
}

/// `count` personal profiles created one minute apart, newest last.
pub fn profiles(count: usize) -> Vec<Profile> {
    let start = Utc::now() - Duration::days(30);
    (0..count)
        .map(|i| profile(UserType::Personal, start + Duration::minutes(i as i64)))
        .collect()
}

pub fn plan(slug: &str, price: f64) -> Plan {
    let now = Utc::now();
    Plan {
        id: Uuid::new_v4(),
        name: slug.to_uppercase(),
        slug: slug.to_string(),
        price,
        billing_cycle: BillingCycle::Monthly,
        features: vec![],
        modules_included: vec![],
        max_storage_gb: 10,
        is_highlighted: false,
        status: PlanStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

pub fn module(slug: &str, sort_order: i32) -> PlatformModule {
    let now = Utc::now();
    PlatformModule {
        id: Uuid::new_v4(),
        name: slug.to_uppercase(),
        slug: slug.to_string(),
        description: None,
        icon: None,
        color: None,
        status: ModuleStatus::Active,
        sort_order,
        created_at: now,
        updated_at: now,
    }
}

pub fn order(buyer: &str, total: f64, created_at: DateTime<Utc>) -> Order {
    Order {
        id: Uuid::new_v4(),
        buyer_name: buyer.to_string(),
        total,
        created_at,
    }
}

fn setting(key: &str, value: SettingValue, kind: SettingKind, category: &str) -> SystemSetting {
    SystemSetting {
        key: key.to_string(),
        value,
        kind,
        category: category.to_string(),
        description: None,
        updated_at: Utc::now() - Duration::days(1),
    }
}

pub fn default_settings() -> Vec<SystemSetting> {
    vec![
        setting(
            "maintenance_mode",
            SettingValue::Toggle(false),
            SettingKind::Toggle,
            "general",
        ),
        setting(
            "site_name",
            SettingValue::Text("Admin Console".into()),
            SettingKind::Text,
            "general",
        ),
        setting(
            "session_timeout_minutes",
            SettingValue::Number(30),
            SettingKind::Number,
            "security",
        ),
        setting(
            "allow_signups",
            SettingValue::Toggle(true),
            SettingKind::Toggle,
            "security",
        ),
        setting(
            "default_theme",
            SettingValue::Text("light".into()),
            SettingKind::Select {
                options: vec!["light".into(), "dark".into()],
            },
            "appearance",
        ),
    ]
}

// ============================================================================
// Requests
// ============================================================================

/// Create a request with a JSON body.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Create a body-less request.
pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    empty_request(Method::GET, uri)
}

/// Prefix a path with the admin API root.
pub fn admin(path: &str) -> String {
    format!("{}{}", ADMIN_PREFIX, path)
}

/// Parse response body as JSON.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}
