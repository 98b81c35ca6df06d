// Request-scoped plumbing: correlation ids and per-request tenant context
mod correlation;
mod tenant_context;

pub use correlation::{CORRELATION_ID_HEADER, CorrelationId, correlation_id};
pub use tenant_context::{
    TENANT_ID_HEADER, USER_ID_HEADER, USER_ROLES_HEADER, build_tenant_context, tenant_context,
};
