// ABOUTME: Export command - snapshot selected tables into a backup artifact
// ABOUTME: Validates inputs, connects, and delegates to the export executor

use crate::backup;
use crate::postgres;
use crate::utils;
use anyhow::{bail, Result};
use std::path::Path;

pub async fn export(
    connection: &str,
    file: &str,
    tables: &[String],
    skip_blobs: bool,
) -> Result<()> {
    utils::validate_connection_string(connection)?;
    if tables.is_empty() {
        bail!("No tables specified. Pass --tables with a comma-separated list of table names.");
    }

    tracing::info!("Connecting to database...");
    let client = postgres::connect_with_retry(connection).await?;
    tracing::info!("✓ Connected");

    let doc = backup::export(&client, Path::new(file), tables, !skip_blobs).await?;
    tracing::info!(
        "✅ Export complete: {} tables, {} records",
        doc.tables.len(),
        doc.total_records()
    );

    Ok(())
}
