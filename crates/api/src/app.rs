use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use chrono::Duration as ChronoDuration;
use domain::services::{
    ActivityFeed, ModuleService, PlanService, SettingsStore, StatsAggregator, SubscriptionManager,
    UserDirectory,
};
use domain::store::Store;
use domain::AdminResult;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, request_id};
use crate::routes::{activity, health, modules, plans, settings, stats, subscriptions, users};

/// Shared handler state: one instance of every admin service over the same
/// store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Present when backed by Postgres; drives the health probe.
    pub pool: Option<PgPool>,
    pub users: UserDirectory,
    pub plans: PlanService,
    pub modules: ModuleService,
    pub subscriptions: SubscriptionManager,
    pub stats: StatsAggregator,
    pub activity: ActivityFeed,
    /// Pending edits are process-wide; the lock serializes stage and commit.
    pub settings: Arc<Mutex<SettingsStore>>,
}

impl AppState {
    /// Build every service and load committed settings.
    pub async fn build(
        config: Config,
        store: Arc<dyn Store>,
        pool: Option<PgPool>,
    ) -> AdminResult<Self> {
        let admin = &config.admin;
        let settings = SettingsStore::load(store.clone())
            .await?
            .with_saved_flash(ChronoDuration::seconds(admin.saved_flash_secs));

        Ok(Self {
            users: UserDirectory::new(store.clone())
                .with_page_limits(admin.default_page_size, admin.max_page_size),
            plans: PlanService::new(store.clone()),
            modules: ModuleService::new(store.clone()),
            subscriptions: SubscriptionManager::new(store.clone()),
            stats: StatsAggregator::new(store.clone()),
            activity: ActivityFeed::new(store, admin.feed_limits()),
            settings: Arc::new(Mutex::new(settings)),
            pool,
            config: Arc::new(config),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/stats", get(stats::get_stats))
        .route("/activity", get(activity::recent_activity))
        // User directory
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/status", put(users::set_user_status))
        .route("/users/:id/modules/:slug", put(users::set_user_module))
        // Subscriptions
        .route(
            "/users/:id/subscription",
            get(subscriptions::get_subscription)
                .post(subscriptions::assign_plan)
                .delete(subscriptions::cancel_subscription),
        )
        .route("/users/:id/subscriptions", get(subscriptions::subscription_history))
        // Plan catalog
        .route("/plans", get(plans::list_plans).post(plans::create_plan))
        .route(
            "/plans/:id",
            get(plans::get_plan)
                .put(plans::update_plan)
                .delete(plans::delete_plan),
        )
        // Module catalog
        .route("/modules", get(modules::list_modules).post(modules::create_module))
        .route(
            "/modules/:id",
            get(modules::get_module)
                .put(modules::update_module)
                .delete(modules::delete_module),
        )
        .route("/modules/:id/status", put(modules::set_module_status))
        // Settings
        .route("/settings", get(settings::get_settings))
        .route(
            "/settings/:key",
            put(settings::stage_change).delete(settings::discard_change),
        )
        .route("/settings/commit", post(settings::commit_changes))
        .route("/settings/discard", post(settings::discard_all))
        .route("/settings/reload", post(settings::reload_settings));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .nest("/api/admin/v1", admin_routes)
        .merge(public_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .with_state(state)
}
