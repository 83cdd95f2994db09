// ABOUTME: Library module for sqlite-pg-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod config;
pub mod migration;
pub mod postgres;
pub mod sqlite;
pub mod utils;
