// ABOUTME: PostgreSQL destination access: connection, schema introspection, writes
// ABOUTME: Re-exports the connect helper used by the migrator and tests

pub mod connection;
pub mod schema;
pub mod writer;

pub use connection::connect;
