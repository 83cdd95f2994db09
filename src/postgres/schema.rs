// ABOUTME: Destination schema introspection via pg_catalog
// ABOUTME: Resolves column names and driver types for parameter binding

use crate::utils::validate_identifier;
use anyhow::{bail, Context, Result};
use tokio_postgres::types::Type;
use tokio_postgres::Transaction;

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub ty: Type,
}

/// Get the columns of a destination table with their driver types.
///
/// Types come from `atttypid` resolved through [`Type::from_oid`], so the
/// result can drive binary parameter binding directly. Columns are returned
/// in attribute order, but callers look them up by name: the source table's
/// column order defines the insert statement.
///
/// # Errors
///
/// Fails if the table does not exist in the destination (the spec'd
/// per-table failure for a missing destination table) or if a column uses a
/// type this tool cannot bind.
pub async fn table_columns(
    tx: &Transaction<'_>,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnInfo>> {
    validate_identifier(table).context("Invalid table name for destination introspection")?;

    let rows = tx
        .query(
            "SELECT a.attname, a.atttypid
             FROM pg_catalog.pg_attribute a
             JOIN pg_catalog.pg_class c ON a.attrelid = c.oid
             JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
             WHERE n.nspname = $1
               AND c.relname = $2
               AND a.attnum > 0
               AND NOT a.attisdropped
             ORDER BY a.attnum",
            &[&schema, &table],
        )
        .await
        .with_context(|| format!("Failed to get columns for table '{}'.'{}'", schema, table))?;

    if rows.is_empty() {
        bail!(
            "Table \"{}\" not found in destination database (schema '{}'). \
             The destination schema must already exist; this tool does not create it.",
            table,
            schema
        );
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.get(0);
        let oid: u32 = row.get(1);
        let ty = Type::from_oid(oid).with_context(|| {
            format!(
                "Column \"{}\".\"{}\" has a type (oid {}) this tool cannot bind",
                table, name, oid
            )
        })?;
        columns.push(ColumnInfo { name, ty });
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::connect;

    // NOTE: Requires a real PostgreSQL instance; skipped unless TEST_TARGET_URL is set
    #[tokio::test]
    #[ignore]
    async fn test_table_columns_roundtrip() {
        let url = std::env::var("TEST_TARGET_URL").unwrap();
        let mut client = connect(&url).await.unwrap();

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS column_probe (
                    id TEXT PRIMARY KEY,
                    qty INTEGER,
                    at TIMESTAMPTZ
                )",
                &[],
            )
            .await
            .unwrap();

        let tx = client.transaction().await.unwrap();
        let columns = table_columns(&tx, "public", "column_probe").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].ty, Type::TEXT);
        assert_eq!(columns[1].ty, Type::INT4);
        assert_eq!(columns[2].ty, Type::TIMESTAMPTZ);

        client
            .execute("DROP TABLE column_probe", &[])
            .await
            .unwrap();
    }

    // NOTE: Requires a real PostgreSQL instance; skipped unless TEST_TARGET_URL is set
    #[tokio::test]
    #[ignore]
    async fn test_missing_table_errors() {
        let url = std::env::var("TEST_TARGET_URL").unwrap();
        let mut client = connect(&url).await.unwrap();

        let tx = client.transaction().await.unwrap();
        let result = table_columns(&tx, "public", "definitely_not_here").await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not found in destination"));
    }
}
