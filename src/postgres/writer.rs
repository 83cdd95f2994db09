// ABOUTME: Conflict-skipping batch inserts into the destination database
// ABOUTME: Builds multi-row parameterized INSERT ... ON CONFLICT DO NOTHING statements

use crate::sqlite::converter::PgValue;
use crate::utils::quote_ident;
use anyhow::{Context, Result};
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;

/// PostgreSQL caps a statement at 65535 bind parameters; stay under it with
/// headroom and cap the row count per statement regardless of width.
const MAX_PARAMS_PER_STATEMENT: usize = 60_000;
const MAX_ROWS_PER_STATEMENT: usize = 1_000;

/// Insert rows into a destination table, silently skipping rows that collide
/// with an existing unique or primary key (`ON CONFLICT DO NOTHING`).
///
/// Rows are positional and must match `columns` in length and order. The
/// whole set is submitted in as few statements as the parameter limit
/// allows, all inside the caller's transaction.
///
/// Returns the number of rows actually inserted; the difference from
/// `rows.len()` is the number of conflict-skipped rows.
pub async fn insert_skip_conflicts(
    tx: &Transaction<'_>,
    table: &str,
    columns: &[String],
    rows: &[Vec<PgValue>],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let rows_per_batch = (MAX_PARAMS_PER_STATEMENT / columns.len())
        .clamp(1, MAX_ROWS_PER_STATEMENT);

    tracing::debug!(
        "Inserting {} rows into \"{}\" ({} per statement)",
        rows.len(),
        table,
        rows_per_batch
    );

    let mut inserted = 0u64;

    for (batch_num, chunk) in rows.chunks(rows_per_batch).enumerate() {
        let sql = build_insert_sql(table, columns, chunk.len());

        let params: Vec<&(dyn ToSql + Sync)> = chunk
            .iter()
            .flat_map(|row| row.iter().map(|v| v as &(dyn ToSql + Sync)))
            .collect();

        inserted += tx.execute(&sql, &params).await.with_context(|| {
            format!(
                "Failed to insert batch {} ({} rows) into \"{}\"",
                batch_num,
                chunk.len(),
                table
            )
        })?;
    }

    Ok(inserted)
}

/// Build the multi-row insert statement:
/// `INSERT INTO "t" ("c1", "c2") VALUES ($1, $2), ($3, $4) ON CONFLICT DO NOTHING`.
///
/// Identifiers must already be validated; they are quoted here.
fn build_insert_sql(table: &str, columns: &[String], row_count: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut value_groups = Vec::with_capacity(row_count);
    for row_idx in 0..row_count {
        let base = row_idx * columns.len();
        let placeholders: Vec<String> =
            (1..=columns.len()).map(|i| format!("${}", base + i)).collect();
        value_groups.push(format!("({})", placeholders.join(", ")));
    }

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT DO NOTHING",
        quote_ident(table),
        column_list,
        value_groups.join(", ")
    )
}
