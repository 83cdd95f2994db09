// ABOUTME: SQLite source introspection and data reading
// ABOUTME: Derives column lists from schema metadata and materializes table rows

use crate::utils::{quote_ident, validate_identifier};
use anyhow::{bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::Connection;

/// Get the column names of a source table, in schema order.
///
/// Columns come from `PRAGMA table_info`, not from fetched rows, so the
/// derived list is correct even when the table is empty and cannot be skewed
/// by NULL-only leading rows. The returned order defines both the order of
/// values extracted from every row and the column list of the destination
/// insert statement.
///
/// # Errors
///
/// Fails if the table does not exist in the source database.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    validate_identifier(table).context("Invalid table name for column introspection")?;

    // Identifier is validated above
    let query = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = stmt_with_context(conn, &query, table)?;

    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("Failed to query columns of table '{}'", table))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect columns of table '{}'", table))?;

    if columns.is_empty() {
        bail!("Table '{}' not found in source database", table);
    }

    tracing::debug!(
        "Table '{}' has {} columns: {:?}",
        table,
        columns.len(),
        columns
    );

    Ok(columns)
}

/// Read all rows of a source table into memory.
///
/// Each row is a positional vector of values in `columns` order, ready to be
/// zipped with the destination column types. The whole table is materialized
/// at once; these migrations move small application databases, not warehouses.
pub fn read_rows(conn: &Connection, table: &str, columns: &[String]) -> Result<Vec<Vec<Value>>> {
    validate_identifier(table).context("Invalid table name for data reading")?;
    for column in columns {
        validate_identifier(column)
            .with_context(|| format!("Invalid column name in table '{}'", table))?;
    }

    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!("SELECT {} FROM {}", column_list, quote_ident(table));

    let mut stmt = stmt_with_context(conn, &query, table)?;

    let rows = stmt
        .query_map([], |row| {
            (0..columns.len())
                .map(|idx| row.get::<_, Value>(idx))
                .collect::<Result<Vec<_>, _>>()
        })
        .with_context(|| format!("Failed to query rows from table '{}'", table))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect rows from table '{}'", table))?;

    tracing::debug!("Read {} rows from table '{}'", rows.len(), table);

    Ok(rows)
}

fn stmt_with_context<'c>(
    conn: &'c Connection,
    query: &str,
    table: &str,
) -> Result<rusqlite::Statement<'c>> {
    conn.prepare(query)
        .with_context(|| format!("Failed to prepare statement for table '{}'", table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"Product\" (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                price REAL,
                stock INTEGER
            );
            CREATE TABLE \"SystemLog\" (
                id TEXT PRIMARY KEY,
                message TEXT
            );
            INSERT INTO \"Product\" VALUES
                ('p1', 'Cable', 9.99, 12),
                ('p2', 'Charger', 24.50, NULL);
            ",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_table_columns_in_schema_order() {
        let conn = test_db();
        let columns = table_columns(&conn, "Product").unwrap();
        assert_eq!(columns, vec!["id", "name", "price", "stock"]);
    }

    #[test]
    fn test_table_columns_for_empty_table() {
        // Schema introspection works with zero rows
        let conn = test_db();
        let columns = table_columns(&conn, "SystemLog").unwrap();
        assert_eq!(columns, vec!["id", "message"]);
    }

    #[test]
    fn test_table_columns_missing_table() {
        let conn = test_db();
        let result = table_columns(&conn, "Missing");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not found in source"));
    }

    #[test]
    fn test_table_columns_rejects_injection() {
        let conn = test_db();
        assert!(table_columns(&conn, "Product; DROP TABLE Product;").is_err());
    }

    #[test]
    fn test_read_rows_positional_order() {
        let conn = test_db();
        let columns = table_columns(&conn, "Product").unwrap();
        let rows = read_rows(&conn, "Product", &columns).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[0][0], Value::Text("p1".into()));
        assert_eq!(rows[0][2], Value::Real(9.99));
        assert_eq!(rows[1][3], Value::Null);
    }

    #[test]
    fn test_read_rows_empty_table() {
        let conn = test_db();
        let columns = table_columns(&conn, "SystemLog").unwrap();
        let rows = read_rows(&conn, "SystemLog", &columns).unwrap();
        assert!(rows.is_empty());
    }
}
