use crate::{require_not_blank, TenancyError};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};

// --- Identity ---

/// Resolved tenant identity. Either fully present in a context or absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantIdentity {
    tenant_id: String,
    schema_name: String,
    tenant_slug: String,
}

impl TenantIdentity {
    /// All three values must be non-blank. The error names the first offending field.
    pub fn new<'a>(
        tenant_id: impl Into<Option<&'a str>>,
        schema_name: impl Into<Option<&'a str>>,
        tenant_slug: impl Into<Option<&'a str>>,
    ) -> Result<Self, TenancyError> {
        let tenant_id = require_not_blank(tenant_id.into(), "tenantId")?;
        let schema_name = require_not_blank(schema_name.into(), "schemaName")?;
        let tenant_slug = require_not_blank(tenant_slug.into(), "tenantSlug")?;

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            schema_name: schema_name.to_string(),
            tenant_slug: tenant_slug.to_string(),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn tenant_slug(&self) -> &str {
        &self.tenant_slug
    }
}

// --- Context ---

/// Identity and roles for exactly one request.
///
/// The hosting framework creates one per request and hands it down the
/// request path; it is never stored in a global or thread-local. Drop it (or
/// [`clear`](Self::clear) it) when the request ends.
#[derive(Debug, Clone)]
pub struct TenantContext {
    identity: Option<TenantIdentity>,
    user_id: Option<String>,
    roles: BTreeSet<String>,
    created_at: DateTime<Utc>,
}

impl Default for TenantContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantContext {
    pub fn new() -> Self {
        Self {
            identity: None,
            user_id: None,
            roles: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the tenant identity. All three values must be non-blank; on error
    /// the previous identity (if any) is left untouched.
    pub fn set_tenant<'a>(
        &mut self,
        tenant_id: impl Into<Option<&'a str>>,
        schema_name: impl Into<Option<&'a str>>,
        tenant_slug: impl Into<Option<&'a str>>,
    ) -> Result<(), TenancyError> {
        self.identity = Some(TenantIdentity::new(tenant_id, schema_name, tenant_slug)?);
        Ok(())
    }

    /// Replaces the user and the whole role set. Blank role names are dropped.
    pub fn set_user<I, S>(&mut self, user_id: Option<&str>, roles: I) -> Result<(), TenancyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Absent user is fine, a present-but-blank one is a caller bug
        let user_id = match user_id {
            Some(id) => Some(require_not_blank(Some(id), "userId")?.to_string()),
            None => None,
        };

        self.user_id = user_id;
        self.roles = roles
            .into_iter()
            .filter(|r| !r.as_ref().trim().is_empty())
            .map(|r| r.as_ref().to_string())
            .collect();
        Ok(())
    }

    /// Like [`set_tenant`](Self::set_tenant), but the returned guard clears the
    /// context when it goes out of scope, on every exit path.
    pub fn scoped<'a>(
        &'a mut self,
        tenant_id: &str,
        schema_name: &str,
        tenant_slug: &str,
    ) -> Result<TenantScope<'a>, TenancyError> {
        self.set_tenant(tenant_id, schema_name, tenant_slug)?;
        Ok(TenantScope { context: self })
    }

    pub fn is_initialized(&self) -> bool {
        self.identity.is_some()
    }

    pub fn tenant(&self) -> Option<&TenantIdentity> {
        self.identity.as_ref()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.identity.as_ref().map(TenantIdentity::tenant_id)
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.identity.as_ref().map(TenantIdentity::schema_name)
    }

    pub fn tenant_slug(&self) -> Option<&str> {
        self.identity.as_ref().map(TenantIdentity::tenant_slug)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Read-only view of the role set.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        !role.trim().is_empty() && self.roles.contains(role)
    }

    pub fn has_any_role<I, S>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles.into_iter().any(|r| self.has_role(r.as_ref()))
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Back to the uninitialized state. `created_at` is kept.
    pub fn clear(&mut self) {
        self.identity = None;
        self.user_id = None;
        self.roles.clear();
    }
}

impl fmt::Display for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TenantContext{{tenant_id={:?}, schema_name={:?}, tenant_slug={:?}, user_id={:?}, roles={:?}, created_at={}}}",
            self.tenant_id(),
            self.schema_name(),
            self.tenant_slug(),
            self.user_id(),
            self.roles,
            self.created_at.to_rfc3339()
        )
    }
}

// --- Scope guard ---

/// Clears the borrowed context on drop.
#[derive(Debug)]
pub struct TenantScope<'a> {
    context: &'a mut TenantContext,
}

impl Deref for TenantScope<'_> {
    type Target = TenantContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for TenantScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for TenantScope<'_> {
    fn drop(&mut self) {
        self.context.clear();
    }
}
