use crate::{config::TenancyConfig, require_not_blank, TenancyError};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Prepended to slugs that would otherwise start with a digit.
pub const DIGIT_MARKER: &str = "t_";
/// Used when nothing identifier-safe survives normalization.
pub const FALLBACK_SLUG: &str = "tenant";

// --- SchemaName ---

/// A database schema name that satisfies the naming contract.
///
/// Only [`SchemaNameMapper`] hands these out, either by mapping a tenant id or
/// as the reserved default schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SchemaName(String);

impl SchemaName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SchemaName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SchemaName> for String {
    fn from(name: SchemaName) -> Self {
        name.0
    }
}

impl PartialEq<&str> for SchemaName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// --- Mapper ---

/// Deterministic tenant id -> schema name mapping.
///
/// The mapping is lossy: `"acme-corp"`, `"Acme Corp"` and `"acme_corp"` all
/// land on `store_acme_corp`. Nothing here detects that; uniqueness has to be
/// enforced by whoever allocates tenant ids.
#[derive(Debug, Clone)]
pub struct SchemaNameMapper {
    prefix: String,
    default_schema: String,
    max_identifier_length: usize,
}

impl Default for SchemaNameMapper {
    fn default() -> Self {
        let config = TenancyConfig::default();
        Self {
            prefix: config.tenant_schema_prefix,
            default_schema: config.default_schema,
            max_identifier_length: config.max_identifier_length,
        }
    }
}

impl SchemaNameMapper {
    pub fn new(config: &TenancyConfig) -> Result<Self, TenancyError> {
        config.validate()?;
        Ok(Self {
            prefix: config.tenant_schema_prefix.clone(),
            default_schema: config.default_schema.clone(),
            max_identifier_length: config.max_identifier_length,
        })
    }

    pub fn tenant_schema_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    /// The reserved control schema, used whenever no tenant is resolved.
    pub fn default_schema(&self) -> SchemaName {
        SchemaName(self.default_schema.clone())
    }

    pub fn map_tenant_to_schema(&self, tenant_id: &str) -> Result<SchemaName, TenancyError> {
        let tenant_id = require_not_blank(Some(tenant_id), "tenantId")?;

        let slug = self.normalize_slug(tenant_id);
        let schema = SchemaName(format!("{}{}", self.prefix, slug));

        debug!(tenant_id = %tenant_id, schema = %schema, "Mapped tenant id to schema");
        Ok(schema)
    }

    /// True iff `name` carries the tenant prefix followed by at least one character.
    pub fn is_tenant_schema(&self, name: &str) -> bool {
        name.len() > self.prefix.len() && name.starts_with(&self.prefix)
    }

    pub fn extract_tenant_slug<'a>(&self, name: &'a str) -> Option<&'a str> {
        if self.is_tenant_schema(name) {
            name.strip_prefix(self.prefix.as_str())
        } else {
            None
        }
    }

    fn normalize_slug(&self, tenant_id: &str) -> String {
        let mut slug = String::with_capacity(tenant_id.len());
        for c in tenant_id.trim().chars().flat_map(char::to_lowercase) {
            let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            };
            // Collapse runs of '_' as we go
            if c == '_' && slug.ends_with('_') {
                continue;
            }
            slug.push(c);
        }

        let mut slug = slug.trim_matches('_').to_string();
        if slug.starts_with(|c: char| c.is_ascii_digit()) {
            slug.insert_str(0, DIGIT_MARKER);
        }
        if slug.is_empty() {
            slug.push_str(FALLBACK_SLUG);
        }

        // Slug is pure ASCII at this point, so byte offsets are char boundaries
        let max_slug_length = self.max_identifier_length - self.prefix.len();
        if slug.len() > max_slug_length {
            slug.truncate(max_slug_length);
            let kept = slug.trim_end_matches('_').len();
            slug.truncate(kept);
        }
        slug
    }
}
