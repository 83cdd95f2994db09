// ABOUTME: SQLite source database access for migration to PostgreSQL
// ABOUTME: Provides file path validation and read-only connections

pub mod converter;
pub mod reader;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Validate a SQLite file path before opening it.
///
/// Canonicalizes the path (resolving symlinks and relative components, which
/// also verifies the file exists), requires a regular file, and requires a
/// `.db`, `.sqlite`, or `.sqlite3` extension.
pub fn validate_sqlite_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        bail!("SQLite file path cannot be empty");
    }

    let canonical = PathBuf::from(path).canonicalize().with_context(|| {
        format!(
            "Failed to resolve SQLite file path '{}'. \
             File may not exist or may not be readable.",
            path
        )
    })?;

    if !canonical.is_file() {
        bail!("Path '{}' is not a regular file (may be a directory)", path);
    }

    let ext = canonical
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if !["db", "sqlite", "sqlite3"].contains(&ext) {
        bail!(
            "Invalid SQLite file extension for '{}'. Must be .db, .sqlite, or .sqlite3",
            path
        );
    }

    tracing::debug!("Validated SQLite path: {}", canonical.display());

    Ok(canonical)
}

/// Open a SQLite database in read-only mode.
///
/// The source is never written to: the connection is opened with
/// `SQLITE_OPEN_READ_ONLY` and sanity-checked with a version query so a
/// corrupted file fails here rather than mid-table.
pub fn open_readonly(path: &str) -> Result<rusqlite::Connection> {
    let canonical = validate_sqlite_path(path)?;

    tracing::info!("Opening SQLite database: {}", canonical.display());

    let conn = rusqlite::Connection::open_with_flags(
        &canonical,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    )
    .with_context(|| format!("Failed to open SQLite database: {}", canonical.display()))?;

    let _version: String = conn
        .query_row("SELECT sqlite_version()", [], |row| row.get(0))
        .context("Failed to query SQLite version (database may be corrupted)")?;

    Ok(conn)
}
