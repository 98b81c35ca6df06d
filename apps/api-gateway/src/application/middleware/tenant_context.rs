use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tenancy_core::{SchemaNameMapper, TenantContext};
use tracing::debug;

use crate::AppState;
use crate::application::ApplicationError;

// Identity headers set by the authenticating edge in front of this service
pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// Middleware that builds a fresh [`TenantContext`] for every request.
///
/// The context lives in the request's extensions and is dropped with the
/// request, so nothing can carry over to the next request served by the same
/// worker.
pub async fn tenant_context(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApplicationError> {
    let context = build_tenant_context(&app_state.mapper, req.headers())?;
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// Populates a new context from the identity headers.
///
/// No tenant header leaves the context uninitialized. A tenant header that is
/// present but blank, or a blank user header, is rejected.
pub fn build_tenant_context(
    mapper: &SchemaNameMapper,
    headers: &HeaderMap,
) -> Result<TenantContext, ApplicationError> {
    let mut context = TenantContext::new();

    if let Some(tenant_id) = header_str(headers, TENANT_ID_HEADER)? {
        let tenant_id = tenant_id.trim();
        let schema = mapper.map_tenant_to_schema(tenant_id)?;
        let slug = mapper.extract_tenant_slug(schema.as_str()).ok_or_else(|| {
            ApplicationError::Internal(format!("Mapped schema '{}' has no tenant slug", schema))
        })?;
        context.set_tenant(tenant_id, schema.as_str(), slug)?;
        debug!(tenant_id = %tenant_id, schema = %schema, "Tenant context established");
    }

    let user_id = header_str(headers, USER_ID_HEADER)?;
    let roles: Vec<&str> = header_str(headers, USER_ROLES_HEADER)?
        .map(|raw| raw.split(',').map(str::trim).collect())
        .unwrap_or_default();
    context.set_user(user_id, roles)?;

    Ok(context)
}

// `HeaderValue::to_str` only admits visible ASCII; identity headers may carry
// any UTF-8 and the mapper normalizes the rest.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApplicationError> {
    match headers.get(name) {
        Some(value) => std::str::from_utf8(value.as_bytes())
            .map(Some)
            .map_err(|_| ApplicationError::BadRequest(format!("{} header is not valid UTF-8", name))),
        None => Ok(None),
    }
}
