use crate::{is_schema_identifier, TenancyError};
use std::env;

pub const DEFAULT_TENANT_SCHEMA_PREFIX: &str = "store_";
pub const DEFAULT_CONTROL_SCHEMA: &str = "mcp";
/// PostgreSQL NAMEDATALEN - 1.
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 63;

pub const ENV_SCHEMA_PREFIX: &str = "TENANCY_SCHEMA_PREFIX";
pub const ENV_DEFAULT_SCHEMA: &str = "TENANCY_DEFAULT_SCHEMA";
pub const ENV_MAX_IDENTIFIER_LENGTH: &str = "TENANCY_MAX_IDENTIFIER_LENGTH";

/// Naming contract between tenants and physical database schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyConfig {
    pub tenant_schema_prefix: String,
    pub default_schema: String,
    pub max_identifier_length: usize,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            tenant_schema_prefix: DEFAULT_TENANT_SCHEMA_PREFIX.to_string(),
            default_schema: DEFAULT_CONTROL_SCHEMA.to_string(),
            max_identifier_length: DEFAULT_MAX_IDENTIFIER_LENGTH,
        }
    }
}

impl TenancyConfig {
    /// Reads overrides from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, TenancyError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Split out so tests don't have to mutate the process environment
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, TenancyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(prefix) = lookup(ENV_SCHEMA_PREFIX) {
            config.tenant_schema_prefix = prefix.trim().to_string();
        }
        if let Some(schema) = lookup(ENV_DEFAULT_SCHEMA) {
            config.default_schema = schema.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_IDENTIFIER_LENGTH) {
            config.max_identifier_length = raw.trim().parse().map_err(|e| {
                TenancyError::Configuration(format!(
                    "{} must be a positive integer, got '{}': {}",
                    ENV_MAX_IDENTIFIER_LENGTH, raw, e
                ))
            })?;
        }
        Ok(config)
    }

    /// Checks that the contract itself is coherent, before any name is produced from it.
    pub fn validate(&self) -> Result<(), TenancyError> {
        if !is_schema_identifier(&self.tenant_schema_prefix) {
            return Err(TenancyError::Configuration(format!(
                "Tenant schema prefix '{}' is not a valid identifier prefix",
                self.tenant_schema_prefix
            )));
        }
        if !is_schema_identifier(&self.default_schema) {
            return Err(TenancyError::Configuration(format!(
                "Default schema '{}' is not a valid identifier",
                self.default_schema
            )));
        }
        if self.default_schema.starts_with(&self.tenant_schema_prefix) {
            return Err(TenancyError::Configuration(format!(
                "Default schema '{}' must not start with the tenant prefix '{}'",
                self.default_schema, self.tenant_schema_prefix
            )));
        }
        if self.default_schema.len() > self.max_identifier_length {
            return Err(TenancyError::Configuration(format!(
                "Default schema '{}' exceeds the maximum identifier length of {}",
                self.default_schema, self.max_identifier_length
            )));
        }
        // At least one slug character has to fit after the prefix
        if self.tenant_schema_prefix.len() >= self.max_identifier_length {
            return Err(TenancyError::Configuration(format!(
                "Tenant schema prefix '{}' leaves no room for a slug within {} characters",
                self.tenant_schema_prefix, self.max_identifier_length
            )));
        }
        Ok(())
    }
}
