use crate::{
    config::TenancyConfig,
    is_schema_identifier,
    schema::{SchemaName, SchemaNameMapper},
    TenancyError,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Tenant ids exercised at startup. Covers the awkward shapes: separators,
/// mixed case, leading digits, punctuation only, single char, overlong.
pub const REPRESENTATIVE_TENANT_IDS: &[&str] = &[
    "acme-corp",
    "Test Store 123",
    "Mixed-Case_Tenant",
    "special_chars_!@#",
    "!@#$%^&*()",
    "123numeric",
    "a",
    "very_long_tenant_identifier_that_exceeds_normal_limits_and_should_be_truncated_properly",
];

/// Outcome of a successful startup validation.
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub default_schema: SchemaName,
    pub tenant_schema_prefix: String,
    pub max_identifier_length: usize,
    /// (tenant id, produced schema) pairs that were checked
    pub checked: Vec<(String, SchemaName)>,
    pub validated_at: DateTime<Utc>,
}

/// Startup check of the naming contract. Any error it returns is fatal.
#[derive(Debug, Clone)]
pub struct ConfigurationValidator {
    mapper: SchemaNameMapper,
}

impl ConfigurationValidator {
    pub fn new(mapper: SchemaNameMapper) -> Self {
        Self { mapper }
    }

    pub fn from_config(config: &TenancyConfig) -> Result<Self, TenancyError> {
        Ok(Self::new(SchemaNameMapper::new(config)?))
    }

    pub fn mapper(&self) -> &SchemaNameMapper {
        &self.mapper
    }

    /// Maps every representative tenant id and checks each produced name.
    pub fn validate_startup(&self) -> Result<StartupReport, TenancyError> {
        info!("Validating multi-tenancy configuration...");

        let report = self.validate_schema_naming().inspect_err(|e| {
            error!(error = %e, "Multi-tenancy configuration validation failed");
        })?;

        self.log_configuration_summary();
        info!("Multi-tenancy configuration validation completed successfully");
        Ok(report)
    }

    pub fn validate_schema_name(&self, name: &str) -> Result<(), TenancyError> {
        if name.trim().is_empty() {
            return Err(TenancyError::Configuration(
                "Schema name cannot be null or empty".into(),
            ));
        }

        let max = self.mapper.max_identifier_length();
        if name.len() > max {
            return Err(TenancyError::Configuration(format!(
                "Schema name '{}' exceeds the maximum identifier length of {} characters",
                name, max
            )));
        }

        if !is_schema_identifier(name) {
            return Err(TenancyError::Configuration(format!(
                "Schema name '{}' contains invalid characters",
                name
            )));
        }

        if self.mapper.default_schema() == name {
            return Ok(());
        }

        // A tenant schema needs a non-empty slug that does not end in '_'
        if !self.mapper.is_tenant_schema(name) || name.ends_with('_') {
            return Err(TenancyError::Configuration(format!(
                "Schema name '{}' does not follow naming convention",
                name
            )));
        }

        Ok(())
    }

    fn validate_schema_naming(&self) -> Result<StartupReport, TenancyError> {
        debug!("Validating schema naming conventions...");

        let default_schema = self.mapper.default_schema();
        self.validate_schema_name(default_schema.as_str())?;

        let mut checked = Vec::with_capacity(REPRESENTATIVE_TENANT_IDS.len());
        for tenant_id in REPRESENTATIVE_TENANT_IDS {
            let schema = self
                .mapper
                .map_tenant_to_schema(tenant_id)
                .map_err(|e| TenancyError::Configuration(format!(
                    "Mapping representative tenant id '{}' failed: {}",
                    tenant_id, e
                )))?;

            if let Err(e) = self.validate_schema_name(schema.as_str()) {
                warn!(tenant_id = %tenant_id, error = %e, "Schema naming validation failed");
                return Err(e);
            }
            debug!(tenant_id = %tenant_id, schema = %schema, "Schema naming validation passed");
            checked.push((tenant_id.to_string(), schema));
        }

        Ok(StartupReport {
            default_schema,
            tenant_schema_prefix: self.mapper.tenant_schema_prefix().to_string(),
            max_identifier_length: self.mapper.max_identifier_length(),
            checked,
            validated_at: Utc::now(),
        })
    }

    fn log_configuration_summary(&self) {
        let prefix = self.mapper.tenant_schema_prefix();
        info!("Multi-tenancy configuration summary:");
        info!("  - Default schema: {}", self.mapper.default_schema());
        info!("  - Tenant schema prefix: {}", prefix);
        info!("  - Schema naming convention: {}<tenant_slug>", prefix);
        info!("  - Maximum identifier length: {}", self.mapper.max_identifier_length());
        info!("  - Tenant resolution: per-request TenantContext");
    }
}
