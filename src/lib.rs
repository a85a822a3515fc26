// ABOUTME: Library crate for pg-table-backup
// ABOUTME: Exposes the backup engine, CLI commands, and connection helpers

pub mod backup;
pub mod commands;
pub mod error;
pub mod postgres;
pub mod progress;
pub mod utils;
