use axum::{
    Json,
    extract::{Extension, Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenancy_core::{
    Resolution, TenantContext, TenantResolver,
    adapters::postgres_search_path::{bind_search_path, current_search_path},
};
use tracing::debug;

use crate::AppState;
use super::ApplicationError;

/// Roles allowed to look up the schema of an arbitrary tenant.
///
/// Roles come from the `x-user-roles` header, so this gate only means
/// something behind an authenticating proxy that strips the identity headers
/// from inbound traffic and sets them itself.
pub const SCHEMA_ADMIN_ROLES: &[&str] = &["admin", "platform-admin"];

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentTenantResponse {
    pub schema: String,
    pub resolved_from: String,
    pub tenant_id: Option<String>,
    pub tenant_slug: Option<String>,
    pub user_id: Option<String>,
    pub roles: Vec<String>,
    pub context_created_at: DateTime<Utc>,
    /// Effective search_path after binding, when a database is configured
    pub search_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantSchemaResponse {
    pub tenant_id: String,
    pub schema: String,
    pub tenant_slug: Option<String>,
    pub is_tenant_schema: bool,
}

/// Resolves the schema this request's data access would run against.
pub async fn handle_current_tenant(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> Result<Json<CurrentTenantResponse>, ApplicationError> {
    let resolver = TenantResolver::for_context(&app_state.mapper, &ctx);
    let resolution = resolver.resolve();

    let search_path = match &app_state.pg_pool {
        Some(pool) => {
            // Bound per transaction, never reused across operations
            let mut tx = pool.begin().await?;
            bind_search_path(&mut tx, &resolver).await?;
            let path = current_search_path(&mut tx).await?;
            tx.rollback().await?;
            Some(path)
        }
        None => None,
    };

    let resolved_from = match &resolution {
        Resolution::Tenant { .. } => "tenant",
        Resolution::Default { .. } => "default",
    };
    debug!(schema = %resolution.schema(), resolved_from, "Current tenant resolved");

    Ok(Json(CurrentTenantResponse {
        schema: resolution.into_schema(),
        resolved_from: resolved_from.to_string(),
        tenant_id: ctx.tenant_id().map(str::to_string),
        tenant_slug: ctx.tenant_slug().map(str::to_string),
        user_id: ctx.user_id().map(str::to_string),
        roles: ctx.roles().iter().cloned().collect(),
        context_created_at: ctx.created_at(),
        search_path,
    }))
}

/// Maps an arbitrary tenant id to its schema name. Admin only.
pub async fn handle_tenant_schema(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantSchemaResponse>, ApplicationError> {
    if !ctx.has_any_role(SCHEMA_ADMIN_ROLES) {
        return Err(ApplicationError::Forbidden(
            "schema lookup requires an admin role".into(),
        ));
    }

    let mapper = &app_state.mapper;
    let schema = mapper.map_tenant_to_schema(&tenant_id)?;
    let tenant_slug = mapper
        .extract_tenant_slug(schema.as_str())
        .map(str::to_string);
    let is_tenant_schema = mapper.is_tenant_schema(schema.as_str());

    Ok(Json(TenantSchemaResponse {
        tenant_id,
        schema: schema.into_string(),
        tenant_slug,
        is_tenant_schema,
    }))
}
