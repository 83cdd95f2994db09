// ABOUTME: The per-table copy loop: read all rows, convert, batch-insert with conflict skip
// ABOUTME: Runs the whole migration inside one destination transaction

use crate::config::MigrationConfig;
use crate::migration::report::{MigrationReport, TableReport, TableStatus};
use crate::postgres;
use crate::sqlite;
use crate::sqlite::converter::{to_pg_value, PgValue};
use anyhow::{Context, Result};
use tokio_postgres::Transaction;

/// Destination schema holding the application tables.
const DEST_SCHEMA: &str = "public";

/// Run the migration described by `config`.
///
/// Tables are processed strictly in configured order, single-threaded. All
/// inserts happen inside one destination transaction committed after the
/// last table: either every table's rows land together or none do. The
/// first per-table failure stops the run, marks the remaining tables as not
/// attempted, and rolls back.
///
/// Connection-level failures (source file unopenable, destination
/// unreachable) return `Err` before any table is touched; per-table
/// failures are reported in the returned [`MigrationReport`].
pub async fn run(config: &MigrationConfig) -> Result<MigrationReport> {
    config.validate()?;

    let source = sqlite::open_readonly(&config.source)
        .context("Failed to open source SQLite database")?;
    let mut client = postgres::connect(&config.target)
        .await
        .context("Failed to connect to destination PostgreSQL database")?;

    let tx = client
        .transaction()
        .await
        .context("Failed to open destination transaction")?;

    let mut tables = Vec::with_capacity(config.tables.len());
    let mut failed = false;

    let mut iter = config.tables.iter();
    for table in iter.by_ref() {
        tracing::info!("Migrating table \"{}\"...", table);

        match copy_table(&source, &tx, table).await {
            Ok(status) => tables.push(TableReport {
                table: table.clone(),
                status,
            }),
            Err(e) => {
                tables.push(TableReport {
                    table: table.clone(),
                    status: TableStatus::Failed {
                        reason: format!("{:#}", e),
                    },
                });
                failed = true;
                break;
            }
        }
    }

    // Tables after the failing one are never attempted
    for table in iter {
        tables.push(TableReport {
            table: table.clone(),
            status: TableStatus::NotAttempted,
        });
    }

    let committed = if failed {
        tx.rollback()
            .await
            .context("Failed to roll back destination transaction")?;
        false
    } else {
        tx.commit()
            .await
            .context("Failed to commit destination transaction")?;
        true
    };

    Ok(MigrationReport { tables, committed })
}

/// Copy one table: derive columns from the source schema, read every row,
/// convert against the destination column types, and batch-insert with
/// conflict skip. Empty tables short-circuit before the destination is
/// consulted.
async fn copy_table(
    source: &rusqlite::Connection,
    tx: &Transaction<'_>,
    table: &str,
) -> Result<TableStatus> {
    let columns = sqlite::reader::table_columns(source, table)?;
    let rows = sqlite::reader::read_rows(source, table, &columns)?;

    if rows.is_empty() {
        tracing::info!("Table \"{}\" is empty, skipping", table);
        return Ok(TableStatus::Empty);
    }

    let dest_columns = postgres::schema::table_columns(tx, DEST_SCHEMA, table).await?;

    // Source column order drives the insert; each source column must exist
    // in the destination under the same name
    let types: Vec<tokio_postgres::types::Type> = columns
        .iter()
        .map(|name| {
            dest_columns
                .iter()
                .find(|c| &c.name == name)
                .map(|c| c.ty.clone())
                .with_context(|| {
                    format!(
                        "Column \"{}\" of table \"{}\" does not exist in the destination",
                        name, table
                    )
                })
        })
        .collect::<Result<_>>()?;

    let mut converted: Vec<Vec<PgValue>> = Vec::with_capacity(rows.len());
    for (row_num, row) in rows.iter().enumerate() {
        let pg_row = row
            .iter()
            .zip(columns.iter())
            .zip(types.iter())
            .map(|((value, column), ty)| {
                to_pg_value(value, ty).with_context(|| {
                    format!(
                        "Row {} of table \"{}\", column \"{}\"",
                        row_num + 1,
                        table,
                        column
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        converted.push(pg_row);
    }

    let rows_read = converted.len();
    let rows_inserted =
        postgres::writer::insert_skip_conflicts(tx, table, &columns, &converted).await?;
    let rows_skipped = rows_read as u64 - rows_inserted;

    tracing::info!(
        "Inserted {} of {} rows into \"{}\" ({} already present)",
        rows_inserted,
        rows_read,
        table,
        rows_skipped
    );

    Ok(TableStatus::Copied {
        rows_read,
        rows_inserted,
        rows_skipped,
    })
}
