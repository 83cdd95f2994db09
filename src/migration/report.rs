// ABOUTME: Structured per-table migration outcomes aggregated into a run report
// ABOUTME: Replaces print-only error reporting with inspectable results

use std::fmt;

/// Outcome of one table's copy attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TableStatus {
    /// Rows were read and submitted; conflicts with existing keys were skipped.
    Copied {
        rows_read: usize,
        rows_inserted: u64,
        rows_skipped: u64,
    },
    /// The source table had zero rows; no insert was attempted.
    Empty,
    /// Reading, converting, or inserting this table failed; the run stopped here.
    Failed { reason: String },
    /// An earlier table failed before this one was reached.
    NotAttempted,
}

#[derive(Debug, Clone)]
pub struct TableReport {
    pub table: String,
    pub status: TableStatus,
}

/// Final report for a migration run.
///
/// `committed` is true only when every table succeeded and the single
/// run-wide transaction was committed; otherwise nothing was written to the
/// destination.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub tables: Vec<TableReport>,
    pub committed: bool,
}

impl MigrationReport {
    pub fn succeeded(&self) -> bool {
        self.committed
    }

    /// The table that stopped the run, if any.
    pub fn failure(&self) -> Option<&TableReport> {
        self.tables
            .iter()
            .find(|t| matches!(t.status, TableStatus::Failed { .. }))
    }

    pub fn total_rows_inserted(&self) -> u64 {
        self.tables
            .iter()
            .map(|t| match t.status {
                TableStatus::Copied { rows_inserted, .. } => rows_inserted,
                _ => 0,
            })
            .sum()
    }

    /// Log one line per table plus a final summary, mirroring the
    /// line-oriented console contract of the migration.
    pub fn log(&self) {
        for entry in &self.tables {
            match &entry.status {
                TableStatus::Copied {
                    rows_read,
                    rows_inserted,
                    rows_skipped,
                } => tracing::info!(
                    "Table \"{}\": {} rows read, {} inserted, {} already present",
                    entry.table,
                    rows_read,
                    rows_inserted,
                    rows_skipped
                ),
                TableStatus::Empty => {
                    tracing::info!("Table \"{}\": empty, nothing to copy", entry.table)
                }
                TableStatus::Failed { reason } => {
                    tracing::error!("Table \"{}\": failed: {}", entry.table, reason)
                }
                TableStatus::NotAttempted => {
                    tracing::warn!("Table \"{}\": not attempted", entry.table)
                }
            }
        }

        if self.committed {
            tracing::info!(
                "Migration completed successfully: {} rows inserted across {} tables",
                self.total_rows_inserted(),
                self.tables.len()
            );
        } else {
            tracing::error!("Migration aborted: transaction rolled back, no data was committed");
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Copied {
                rows_read,
                rows_inserted,
                rows_skipped,
            } => write!(
                f,
                "copied ({} read, {} inserted, {} skipped)",
                rows_read, rows_inserted, rows_skipped
            ),
            TableStatus::Empty => write!(f, "empty"),
            TableStatus::Failed { reason } => write!(f, "failed: {}", reason),
            TableStatus::NotAttempted => write!(f, "not attempted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copied(table: &str, read: usize, inserted: u64) -> TableReport {
        TableReport {
            table: table.to_string(),
            status: TableStatus::Copied {
                rows_read: read,
                rows_inserted: inserted,
                rows_skipped: read as u64 - inserted,
            },
        }
    }

    #[test]
    fn successful_report() {
        let report = MigrationReport {
            tables: vec![
                copied("User", 3, 3),
                TableReport {
                    table: "SystemLog".into(),
                    status: TableStatus::Empty,
                },
            ],
            committed: true,
        };

        assert!(report.succeeded());
        assert!(report.failure().is_none());
        assert_eq!(report.total_rows_inserted(), 3);
    }

    #[test]
    fn failed_report_names_the_offender() {
        let report = MigrationReport {
            tables: vec![
                copied("User", 3, 3),
                TableReport {
                    table: "Product".into(),
                    status: TableStatus::Failed {
                        reason: "relation does not exist".into(),
                    },
                },
                TableReport {
                    table: "Transaction".into(),
                    status: TableStatus::NotAttempted,
                },
            ],
            committed: false,
        };

        assert!(!report.succeeded());
        assert_eq!(report.failure().unwrap().table, "Product");
        // Rolled back, so inserted counts are informational only
        assert_eq!(report.total_rows_inserted(), 3);
    }

    #[test]
    fn status_display() {
        let status = TableStatus::Copied {
            rows_read: 5,
            rows_inserted: 4,
            rows_skipped: 1,
        };
        assert_eq!(status.to_string(), "copied (5 read, 4 inserted, 1 skipped)");
        assert_eq!(TableStatus::Empty.to_string(), "empty");
    }
}
