use crate::{
    context::{TenantContext, TenantIdentity},
    schema::{SchemaName, SchemaNameMapper},
    TenancyError,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

// --- Port ---

/// Anything the resolver can ask for the current request's tenant.
///
/// [`TenantContext`] is the production implementation; tests plug in doubles.
pub trait TenantSource: Send + Sync {
    /// `Ok(None)` when the request carries no tenant.
    fn current_tenant(&self) -> Result<Option<TenantIdentity>, TenancyError>;
}

impl TenantSource for TenantContext {
    fn current_tenant(&self) -> Result<Option<TenantIdentity>, TenancyError> {
        Ok(self.tenant().cloned())
    }
}

// --- Outcome ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No context was attached to the resolver.
    NoContext,
    /// A context exists but no tenant was set on it.
    Uninitialized,
    /// The source failed; the error has already been logged.
    Failed(TenancyError),
}

/// Result of one resolution. Both arms carry a usable schema name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Tenant { schema: String, tenant_id: String },
    Default { schema: SchemaName, reason: FallbackReason },
}

impl Resolution {
    pub fn schema(&self) -> &str {
        match self {
            Resolution::Tenant { schema, .. } => schema,
            Resolution::Default { schema, .. } => schema.as_str(),
        }
    }

    pub fn into_schema(self) -> String {
        match self {
            Resolution::Tenant { schema, .. } => schema,
            Resolution::Default { schema, .. } => schema.into_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Default { .. })
    }
}

// --- Resolver ---

/// Read path called by the data layer before every schema-sensitive operation.
///
/// Resolution never fails: anything short of an initialized context yields the
/// default schema.
pub struct TenantResolver<'a> {
    source: Option<&'a dyn TenantSource>,
    default_schema: SchemaName,
}

impl<'a> TenantResolver<'a> {
    pub fn new(mapper: &SchemaNameMapper, source: Option<&'a dyn TenantSource>) -> Self {
        Self {
            source,
            default_schema: mapper.default_schema(),
        }
    }

    pub fn for_context(mapper: &SchemaNameMapper, context: &'a TenantContext) -> Self {
        Self::new(mapper, Some(context))
    }

    pub fn resolve(&self) -> Resolution {
        let Some(source) = self.source else {
            debug!(schema = %self.default_schema, "No tenant context found, using default schema");
            return self.fallback(FallbackReason::NoContext);
        };

        // A misbehaving source must not take the caller down with it
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.current_tenant()))
            .unwrap_or_else(|payload| Err(TenancyError::Resolution(panic_message(payload))));

        match outcome {
            Ok(Some(identity)) => {
                debug!(
                    schema = %identity.schema_name(),
                    tenant_id = %identity.tenant_id(),
                    "Resolved tenant schema"
                );
                Resolution::Tenant {
                    schema: identity.schema_name().to_string(),
                    tenant_id: identity.tenant_id().to_string(),
                }
            }
            Ok(None) => {
                debug!(schema = %self.default_schema, "Tenant context not initialized, using default schema");
                self.fallback(FallbackReason::Uninitialized)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    schema = %self.default_schema,
                    "Error resolving tenant identifier, falling back to default schema"
                );
                self.fallback(FallbackReason::Failed(e))
            }
        }
    }

    pub fn resolve_current_tenant_identifier(&self) -> String {
        self.resolve().into_schema()
    }

    /// Always `false`: an identifier resolved earlier must not be reused after
    /// a tenant switch, every operation resolves again.
    pub fn validate_existing_current_sessions(&self) -> bool {
        false
    }

    fn fallback(&self, reason: FallbackReason) -> Resolution {
        Resolution::Default {
            schema: self.default_schema.clone(),
            reason,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "tenant source panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FailingSource;

    impl TenantSource for FailingSource {
        fn current_tenant(&self) -> Result<Option<TenantIdentity>, TenancyError> {
            Err(TenancyError::Resolution("context store unavailable".into()))
        }
    }

    struct PanickingSource;

    impl TenantSource for PanickingSource {
        fn current_tenant(&self) -> Result<Option<TenantIdentity>, TenancyError> {
            panic!("getter exploded")
        }
    }

    fn acme() -> TenantContext {
        let mut ctx = TenantContext::new();
        ctx.set_tenant("acme-corp", "store_acme_corp", "acme_corp")
            .unwrap();
        ctx
    }

    #[test]
    fn test_resolves_initialized_context() {
        let mapper = SchemaNameMapper::default();
        let ctx = acme();
        let resolver = TenantResolver::for_context(&mapper, &ctx);

        assert_eq!(resolver.resolve_current_tenant_identifier(), "store_acme_corp");
        assert_eq!(
            resolver.resolve(),
            Resolution::Tenant {
                schema: "store_acme_corp".into(),
                tenant_id: "acme-corp".into(),
            }
        );
    }

    #[test]
    fn test_uninitialized_context_falls_back() {
        let mapper = SchemaNameMapper::default();
        let ctx = TenantContext::new();
        let resolver = TenantResolver::for_context(&mapper, &ctx);

        let resolution = resolver.resolve();
        assert!(resolution.is_fallback());
        assert_eq!(resolution.schema(), "mcp");
        assert!(matches!(
            resolution,
            Resolution::Default { reason: FallbackReason::Uninitialized, .. }
        ));
    }

    #[test]
    fn test_missing_context_falls_back() {
        let mapper = SchemaNameMapper::default();
        let resolver = TenantResolver::new(&mapper, None);
        assert_eq!(resolver.resolve_current_tenant_identifier(), "mcp");
        assert!(matches!(
            resolver.resolve(),
            Resolution::Default { reason: FallbackReason::NoContext, .. }
        ));
    }

    #[test]
    fn test_failing_source_falls_back() {
        let mapper = SchemaNameMapper::default();
        let source = FailingSource;
        let resolver = TenantResolver::new(&mapper, Some(&source));

        match resolver.resolve() {
            Resolution::Default { schema, reason: FallbackReason::Failed(e) } => {
                assert_eq!(schema, "mcp");
                assert!(e.to_string().contains("context store unavailable"));
            }
            other => panic!("Expected failed fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_panicking_source_falls_back() {
        let mapper = SchemaNameMapper::default();
        let source = PanickingSource;
        let resolver = TenantResolver::new(&mapper, Some(&source));

        assert_eq!(resolver.resolve_current_tenant_identifier(), "mcp");
        match resolver.resolve() {
            Resolution::Default { reason: FallbackReason::Failed(TenancyError::Resolution(msg)), .. } => {
                assert!(msg.contains("getter exploded"));
            }
            other => panic!("Expected failed fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_follows_context_changes() {
        let mapper = SchemaNameMapper::default();
        let mut ctx = acme();
        assert_eq!(
            TenantResolver::for_context(&mapper, &ctx).resolve_current_tenant_identifier(),
            "store_acme_corp"
        );

        ctx.set_tenant("globex", "store_globex", "globex").unwrap();
        assert_eq!(
            TenantResolver::for_context(&mapper, &ctx).resolve_current_tenant_identifier(),
            "store_globex"
        );

        ctx.clear();
        assert_eq!(
            TenantResolver::for_context(&mapper, &ctx).resolve_current_tenant_identifier(),
            "mcp"
        );
    }

    #[test]
    fn test_custom_default_schema() {
        let config = crate::TenancyConfig {
            default_schema: "control".into(),
            ..Default::default()
        };
        let mapper = SchemaNameMapper::new(&config).unwrap();
        let resolver = TenantResolver::new(&mapper, None);
        assert_eq!(resolver.resolve_current_tenant_identifier(), "control");
    }

    #[test]
    fn test_never_validates_existing_sessions() {
        let mapper = SchemaNameMapper::default();
        let ctx = acme();
        assert!(!TenantResolver::for_context(&mapper, &ctx).validate_existing_current_sessions());
        assert!(!TenantResolver::new(&mapper, None).validate_existing_current_sessions());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interleaved_requests_stay_isolated() {
        let mapper = Arc::new(SchemaNameMapper::default());

        let mut first = TenantContext::new();
        let schema = mapper.map_tenant_to_schema("acme-corp").unwrap();
        first.set_tenant("acme-corp", schema.as_str(), "acme_corp").unwrap();

        let mut second = TenantContext::new();
        let schema = mapper.map_tenant_to_schema("globex").unwrap();
        second.set_tenant("globex", schema.as_str(), "globex").unwrap();

        let mut handles = Vec::new();
        for (ctx, expected) in [(first, "store_acme_corp"), (second, "store_globex")] {
            let mapper = mapper.clone();
            let ctx = Arc::new(ctx);
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let resolved = TenantResolver::for_context(&mapper, &ctx)
                        .resolve_current_tenant_identifier();
                    assert_eq!(resolved, expected);
                    tokio::task::yield_now().await;
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
