// ABOUTME: SQLite to PostgreSQL value coercion driven by destination column types
// ABOUTME: Wraps converted values in a PgValue enum that implements ToSql

use anyhow::{bail, Context, Result};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Value as SqliteValue;
use tokio_postgres::types::{IsNull, ToSql, Type};

/// A converted value ready to bind as a PostgreSQL statement parameter.
///
/// tokio-postgres writes binary parameters, so the variant must match the
/// destination column's wire width (an i64 cannot be bound to an INT4
/// column). [`to_pg_value`] picks the variant from the destination type;
/// the `ToSql` impl then delegates to the wrapped concrete type.
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::Text(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Timestamp(v) => v.to_sql(ty, out),
            PgValue::TimestampTz(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        // Type compatibility is enforced by to_pg_value
        true
    }

    postgres_types::to_sql_checked!();
}

/// Convert one SQLite value for a destination column of the given type.
///
/// SQLite's dynamic typing means a column read as INTEGER may target a
/// boolean, timestamp, or text destination column; the destination type
/// decides. Prisma-created SQLite files store booleans as 0/1 integers and
/// `DateTime` as epoch milliseconds or ISO-8601 text, all of which are
/// handled here. A combination with no sound coercion is an error so a
/// mismatched schema fails the table instead of writing garbage.
pub fn to_pg_value(value: &SqliteValue, target: &Type) -> Result<PgValue> {
    match value {
        SqliteValue::Null => Ok(PgValue::Null),
        SqliteValue::Integer(i) => integer_to_pg(*i, target),
        SqliteValue::Real(f) => real_to_pg(*f, target),
        SqliteValue::Text(s) => text_to_pg(s, target),
        SqliteValue::Blob(b) => blob_to_pg(b, target),
    }
}

fn integer_to_pg(i: i64, target: &Type) -> Result<PgValue> {
    match *target {
        Type::BOOL => Ok(PgValue::Bool(i != 0)),
        Type::INT2 => {
            let v = i16::try_from(i)
                .with_context(|| format!("Integer {} out of range for smallint column", i))?;
            Ok(PgValue::Int16(v))
        }
        Type::INT4 => {
            let v = i32::try_from(i)
                .with_context(|| format!("Integer {} out of range for integer column", i))?;
            Ok(PgValue::Int32(v))
        }
        Type::INT8 => Ok(PgValue::Int64(i)),
        Type::FLOAT4 => Ok(PgValue::Float32(i as f32)),
        Type::FLOAT8 => Ok(PgValue::Float64(i as f64)),
        Type::TIMESTAMP => Ok(PgValue::Timestamp(millis_to_datetime(i)?.naive_utc())),
        Type::TIMESTAMPTZ => Ok(PgValue::TimestampTz(millis_to_datetime(i)?)),
        Type::DATE => Ok(PgValue::Date(millis_to_datetime(i)?.date_naive())),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => Ok(PgValue::Text(i.to_string())),
        _ => bail!(
            "Cannot convert SQLite INTEGER value to destination type '{}'",
            target
        ),
    }
}

fn real_to_pg(f: f64, target: &Type) -> Result<PgValue> {
    match *target {
        Type::FLOAT4 => Ok(PgValue::Float32(f as f32)),
        Type::FLOAT8 => Ok(PgValue::Float64(f)),
        Type::INT2 | Type::INT4 | Type::INT8 if f.fract() == 0.0 => integer_to_pg(f as i64, target),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => Ok(PgValue::Text(f.to_string())),
        _ => bail!(
            "Cannot convert SQLite REAL value {} to destination type '{}'",
            f,
            target
        ),
    }
}

fn text_to_pg(s: &str, target: &Type) -> Result<PgValue> {
    match *target {
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => Ok(PgValue::Text(s.to_string())),
        Type::BOOL => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(PgValue::Bool(true)),
            "false" | "f" | "0" => Ok(PgValue::Bool(false)),
            other => bail!("Cannot parse '{}' as boolean", other),
        },
        Type::INT2 => Ok(PgValue::Int16(parse_scalar(s, "smallint")?)),
        Type::INT4 => Ok(PgValue::Int32(parse_scalar(s, "integer")?)),
        Type::INT8 => Ok(PgValue::Int64(parse_scalar(s, "bigint")?)),
        Type::FLOAT4 => Ok(PgValue::Float32(parse_scalar(s, "real")?)),
        Type::FLOAT8 => Ok(PgValue::Float64(parse_scalar(s, "double precision")?)),
        Type::JSON | Type::JSONB => {
            let v = serde_json::from_str(s)
                .with_context(|| format!("Cannot parse '{}' as JSON", truncate(s)))?;
            Ok(PgValue::Json(v))
        }
        Type::DATE => {
            let d = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Cannot parse '{}' as date", truncate(s)))?;
            Ok(PgValue::Date(d))
        }
        Type::TIMESTAMP => Ok(PgValue::Timestamp(parse_timestamp(s)?.naive_utc())),
        Type::TIMESTAMPTZ => Ok(PgValue::TimestampTz(parse_timestamp(s)?)),
        Type::BYTEA => Ok(PgValue::Bytes(s.as_bytes().to_vec())),
        _ => bail!(
            "Cannot convert SQLite TEXT value to destination type '{}'",
            target
        ),
    }
}

fn blob_to_pg(b: &[u8], target: &Type) -> Result<PgValue> {
    match *target {
        Type::BYTEA => Ok(PgValue::Bytes(b.to_vec())),
        Type::TEXT | Type::VARCHAR => {
            let s = String::from_utf8(b.to_vec())
                .context("BLOB destined for a text column is not valid UTF-8")?;
            Ok(PgValue::Text(s))
        }
        _ => bail!(
            "Cannot convert SQLite BLOB value to destination type '{}'",
            target
        ),
    }
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .with_context(|| format!("Integer {} is not a valid epoch-millisecond timestamp", ms))
}

/// Parse the timestamp encodings seen in SQLite text columns: RFC 3339
/// first, then the space/`T`-separated naive forms (fraction optional),
/// then a bare date at midnight. Naive values are taken as UTC.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    match naive {
        Some(dt) => Ok(DateTime::from_naive_utc_and_offset(dt, Utc)),
        None => bail!("Cannot parse '{}' as timestamp", truncate(s)),
    }
}

fn parse_scalar<T: std::str::FromStr>(s: &str, kind: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Cannot parse '{}' as {}", truncate(s), kind))
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(40) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
