use axum::{
    Router,
    middleware::{self},
    routing::get,
};
use sqlx::PgPool;
use std::sync::Arc;
use tenancy_core::{SchemaNameMapper, StartupReport};
use tower_http::cors::{Any, CorsLayer};

// Re-export or declare modules needed by public items
pub mod application;
pub mod config;

use application::{
    health::{handle_health, handle_liveness, handle_readiness, handle_startup},
    middleware::{correlation_id, tenant_context},
    tenant::{handle_current_tenant, handle_tenant_schema},
};

// Holds shared dependencies. Nothing request-specific lives here.
#[derive(Clone)]
pub struct AppState {
    pub mapper: Arc<SchemaNameMapper>,
    pub startup: Option<Arc<StartupReport>>, // None until startup validation has passed
    pub pg_pool: Option<PgPool>,             // Optional; tenant routes skip search_path binding without it
}

impl AppState {
    pub fn new(mapper: SchemaNameMapper, startup: Option<StartupReport>, pg_pool: Option<PgPool>) -> Self {
        Self {
            mapper: Arc::new(mapper),
            startup: startup.map(Arc::new),
            pg_pool,
        }
    }
}

// Function to create the main Axum router with state
pub fn create_app(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/tenant/current", get(handle_current_tenant))
        .route("/tenants/{tenant_id}/schema", get(handle_tenant_schema))
        // Every API request gets its own freshly built TenantContext
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            tenant_context,
        ));

    let health_routes = Router::new()
        .route("/", get(handle_health))
        .route("/live", get(handle_liveness))
        .route("/ready", get(handle_readiness))
        .route("/started", get(handle_startup));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes)
        .nest("/q/health", health_routes)
        .layer(middleware::from_fn(correlation_id))
        .layer(cors)
        .with_state(app_state)
}
