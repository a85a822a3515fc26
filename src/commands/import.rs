// ABOUTME: Import command - restore a backup artifact into a live database
// ABOUTME: Parses field mappings, connects, runs the import, and reports failures

use crate::backup::{self, ImportReport};
use crate::postgres;
use crate::utils;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

pub async fn import(
    connection: &str,
    file: &str,
    map: &[String],
    clobber: bool,
) -> Result<ImportReport> {
    utils::validate_connection_string(connection)?;
    let mappings = parse_mappings(map)?;

    tracing::info!("Connecting to database...");
    let client = postgres::connect_with_retry(connection).await?;
    tracing::info!("✓ Connected");

    let report = backup::import(&client, Path::new(file), &mappings, clobber).await?;

    if report.is_clean() {
        tracing::info!("✅ Import complete: {} rows inserted", report.total_inserted());
    } else {
        tracing::warn!(
            "⚠ Import finished with {} failed records ({} rows inserted)",
            report.failures.len(),
            report.total_inserted()
        );
        for failure in &report.failures {
            tracing::warn!(
                "  {} record {}: {}",
                failure.table,
                failure.record,
                failure.reason
            );
        }
    }

    Ok(report)
}

/// Parse `dest_column=source_field` pairs into a destination-keyed map.
fn parse_mappings(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut mappings = HashMap::new();

    for pair in pairs {
        let (dest, source) = pair.split_once('=').with_context(|| {
            format!(
                "Invalid mapping '{}'. Expected format: dest_column=source_field",
                pair
            )
        })?;
        let dest = dest.trim();
        let source = source.trim();
        if dest.is_empty() || source.is_empty() {
            bail!(
                "Invalid mapping '{}'. Both column names must be non-empty.",
                pair
            );
        }
        if mappings
            .insert(dest.to_string(), source.to_string())
            .is_some()
        {
            bail!("Duplicate mapping for destination column '{}'", dest);
        }
    }

    Ok(mappings)
}
