// Schema-per-tenant identifier resolution.
//
// Declare modules
pub mod adapters;
pub mod config;
pub mod context;
pub mod resolver;
pub mod schema;
pub mod validator;

pub use config::TenancyConfig;
pub use context::{TenantContext, TenantIdentity, TenantScope};
pub use resolver::{FallbackReason, Resolution, TenantResolver, TenantSource};
pub use schema::{SchemaName, SchemaNameMapper};
pub use validator::{ConfigurationValidator, StartupReport};

/// Identifier pattern shared by every schema name: `^[a-z_][a-z0-9_]*$`.
pub(crate) fn is_schema_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// Common error type for the tenancy library
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TenancyError {
    /// Caller-supplied identity data was missing or blank.
    #[error("{field} cannot be null or empty")]
    Validation { field: &'static str },
    /// The naming contract is inconsistent. Only raised during startup.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Internal fault while resolving the current tenant. Never leaves the resolver.
    #[error("Tenant resolution failed: {0}")]
    Resolution(String),
}

impl TenancyError {
    pub(crate) fn validation(field: &'static str) -> Self {
        TenancyError::Validation { field }
    }
}

/// Rejects `None`, empty and whitespace-only values, naming the offending field.
pub(crate) fn require_not_blank<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, TenancyError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TenancyError::validation(field)),
    }
}
