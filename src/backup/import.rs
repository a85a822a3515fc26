// ABOUTME: Import executor that restores a backup artifact into a live database
// ABOUTME: Orders tables by foreign keys, clears clobbered tables, inserts row by row

use crate::backup::blob::BlobStore;
use crate::backup::codec::{decode_field, missing_field_default, ColumnKind, SqlValue};
use crate::backup::deps::foreign_key_graph;
use crate::backup::document::{BackupDocument, Record};
use crate::backup::schema::{inspect_table, ColumnInfo, TableSchema};
use crate::backup::toposort::topological_sort;
use crate::error::BackupError;
use crate::progress::Progress;
use crate::utils::{quote_ident, quote_table};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

/// Per-table insert tally for a completed import.
#[derive(Debug, Clone)]
pub struct TableImport {
    pub table: String,
    pub inserted: usize,
    pub total: usize,
}

/// One record that could not be restored.
///
/// `record` is the zero-based position within the table's record list, which
/// is stable across runs of the same artifact.
#[derive(Debug, Clone)]
pub struct RowFailure {
    pub table: String,
    pub record: usize,
    pub reason: String,
}

/// Outcome of an import run.
///
/// An import that reaches the end is a success at the run level even when
/// individual records failed; callers inspect `failures` to decide how loudly
/// to complain.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub tables: Vec<TableImport>,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.inserted).sum()
    }
}

/// Restore an artifact into the connected database.
///
/// `mappings` renames fields on the way in: destination column name to source
/// field name. With `clobber` set, every participating table is emptied first,
/// dependents before the tables they reference; inserts then run in the
/// opposite order so foreign keys are satisfied as rows land.
///
/// Fatal conditions (unreadable artifact, cyclic foreign keys, failed clobber
/// delete, unreadable destination schema) abort the run. A record that fails
/// to decode or insert is logged, recorded in the report, and skipped; the
/// run continues with the next record.
pub async fn import(
    client: &Client,
    artifact: &Path,
    mappings: &HashMap<String, String>,
    clobber: bool,
) -> Result<ImportReport> {
    let doc = BackupDocument::load(artifact)?;
    let blobs = BlobStore::new(artifact, true);

    let tables = doc.table_names();
    let graph = foreign_key_graph(client, &tables).await?;
    let delete_order = topological_sort(&tables, |t| graph.get(t).cloned().unwrap_or_default())
        .map_err(|e| BackupError::CyclicDependency(e.remaining))?;

    if clobber {
        for table in &delete_order {
            let sql = format!("DELETE FROM {}", quote_table(table));
            let deleted = client
                .execute(&sql, &[])
                .await
                .with_context(|| format!("Failed to clear table '{}'", table))?;
            tracing::info!("✓ {} - deleted {} rows", table, deleted);
        }
    }

    let mut report = ImportReport::default();
    // Inserts go in the opposite direction: referenced tables first.
    for table in delete_order.iter().rev() {
        let backup = match doc.tables.iter().find(|t| &t.name == table) {
            Some(backup) => backup,
            None => continue,
        };
        let schema = inspect_table(client, table).await?;

        let mut inserted = 0;
        let mut progress = Progress::new();
        for (index, record) in backup.records.iter().enumerate() {
            match insert_record(client, &schema, record, mappings, &blobs).await {
                Ok(true) => inserted += 1,
                Ok(false) => {
                    tracing::warn!(
                        "⚠ {} - record {} maps to no destination columns; skipped",
                        table,
                        index
                    );
                }
                Err(e) => {
                    tracing::warn!("⚠ {} - record {} failed: {}", table, index, e);
                    report.failures.push(RowFailure {
                        table: table.clone(),
                        record: index,
                        reason: e.to_string(),
                    });
                }
            }
            progress.update(|| {
                format!(
                    "{} - imported {} of {} rows",
                    table,
                    inserted,
                    backup.records.len()
                )
            });
        }

        tracing::info!(
            "✓ {} - inserted {} of {} rows",
            table,
            inserted,
            backup.records.len()
        );
        report.tables.push(TableImport {
            table: table.clone(),
            inserted,
            total: backup.records.len(),
        });
    }

    Ok(report)
}

/// One destination column paired with its decoded value and the source
/// column kind the artifact captured at export time.
struct PlannedValue<'a> {
    column: &'a ColumnInfo,
    source_kind: Option<ColumnKind>,
    value: SqlValue,
}

/// Insert one record. Returns `Ok(false)` when the record contributes no
/// columns to the destination at all (nothing to insert, nothing failed).
async fn insert_record(
    client: &Client,
    schema: &TableSchema,
    record: &Record,
    mappings: &HashMap<String, String>,
    blobs: &BlobStore,
) -> Result<bool, BackupError> {
    let planned = plan_columns(schema, record, mappings, blobs)?;
    if planned.is_empty() {
        return Ok(false);
    }

    let sql = insert_sql(&schema.table, &planned);
    let types: Vec<_> = planned.iter().map(|p| p.value.param_type()).collect();

    let statement = client
        .prepare_typed(&sql, &types)
        .await
        .map_err(|e| BackupError::RowWrite {
            table: schema.table.clone(),
            source: e,
        })?;

    let params: Vec<&(dyn ToSql + Sync)> = planned
        .iter()
        .map(|p| &p.value as &(dyn ToSql + Sync))
        .collect();
    client
        .execute(&statement, &params)
        .await
        .map_err(|e| BackupError::RowWrite {
            table: schema.table.clone(),
            source: e,
        })?;

    Ok(true)
}

/// Pair destination columns with decoded values for one record.
///
/// Matching is driven by the destination schema: each destination column
/// pulls its value from the source field of the same name (or its mapped
/// name). A column with no source field takes its kind's default, or is
/// omitted from the insert when no default applies. Source fields with no
/// destination column are ignored.
fn plan_columns<'a>(
    schema: &'a TableSchema,
    record: &Record,
    mappings: &HashMap<String, String>,
    blobs: &BlobStore,
) -> Result<Vec<PlannedValue<'a>>, BackupError> {
    let mut planned = Vec::new();

    for column in &schema.columns {
        let source_name = mappings
            .get(&column.name)
            .map(String::as_str)
            .unwrap_or(&column.name);

        match record.field(source_name) {
            Some(field) => planned.push(PlannedValue {
                column,
                source_kind: field.type_tag,
                value: decode_field(field, blobs)?,
            }),
            None => {
                if let Some(default) = missing_field_default(column.kind) {
                    planned.push(PlannedValue {
                        column,
                        source_kind: None,
                        value: default,
                    });
                }
            }
        }
    }

    Ok(planned)
}

/// Build the parameterized insert statement for a set of planned values.
fn insert_sql(table: &str, planned: &[PlannedValue]) -> String {
    let names: Vec<String> = planned
        .iter()
        .map(|p| quote_ident(&p.column.name))
        .collect();
    let placeholders: Vec<String> = planned
        .iter()
        .enumerate()
        .map(|(i, p)| cast_expression(i, p))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_table(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Cast expression for one placeholder.
///
/// A textual value whose captured source kind differs from the destination
/// column's kind is converted in two steps: text to the source type, then
/// source type to the destination type. A float8-rendered "3.14" lands in an
/// int4 column by rounding through float8, and a bool-rendered "t" lands in
/// an integer flag column, where a direct text-to-destination cast would
/// fail the destination's input parse. Values that already carry a native
/// wire type, and values whose source kind matches the destination, take a
/// single cast to the destination type.
fn cast_expression(index: usize, planned: &PlannedValue) -> String {
    let param = format!("${}", index + 1);
    let dest = quote_ident(&planned.column.native_type);

    if matches!(planned.value, SqlValue::Text(_)) {
        if let Some(kind) = planned.source_kind {
            if kind != planned.column.kind && kind != ColumnKind::Text {
                if let Some(source) = kind.type_name() {
                    return format!(
                        "CAST(CAST({} AS {}) AS {})",
                        param,
                        quote_ident(source),
                        dest
                    );
                }
            }
        }
    }

    format!("CAST({} AS {})", param, dest)
}
