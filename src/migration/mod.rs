// ABOUTME: The migration core: per-table copy loop and structured outcome report
// ABOUTME: Exports run() and the report types consumed by the CLI and tests

pub mod copy;
pub mod report;

pub use copy::run;
pub use report::{MigrationReport, TableReport, TableStatus};
