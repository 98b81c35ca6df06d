use crate::resolver::TenantResolver;
use sqlx::PgConnection;
use tracing::debug;

/// Quotes a schema name for use inside a `search_path` value.
pub fn quote_identifier(schema: &str) -> String {
    format!("\"{}\"", schema.replace('"', "\"\""))
}

/// Resolves the current tenant and points the transaction's `search_path` at it.
///
/// Uses `set_config(.., is_local => true)`, so call it on a connection inside a
/// transaction: the setting is dropped at commit or rollback and a pooled
/// connection never carries a tenant over to the next borrower. Call it again
/// before every schema-sensitive operation; a previous binding is never reused.
///
/// Returns the schema that was bound.
pub async fn bind_search_path(
    conn: &mut PgConnection,
    resolver: &TenantResolver<'_>,
) -> Result<String, sqlx::Error> {
    let schema = resolver.resolve_current_tenant_identifier();

    sqlx::query("SELECT set_config('search_path', $1, true)")
        .bind(quote_identifier(&schema))
        .execute(&mut *conn)
        .await?;

    debug!(schema = %schema, "Bound search_path for current transaction");
    Ok(schema)
}

/// The `search_path` currently in effect on `conn`.
pub async fn current_search_path(conn: &mut PgConnection) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT current_setting('search_path')")
        .fetch_one(&mut *conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("store_acme_corp"), "\"store_acme_corp\"");
        assert_eq!(quote_identifier("mcp"), "\"mcp\"");
        // Never produced by the mapper, but quoting must still hold
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
