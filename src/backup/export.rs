// ABOUTME: Export executor that snapshots tables into a backup artifact
// ABOUTME: Streams each table row-by-row, encoding values through the codec

use crate::backup::blob::BlobStore;
use crate::backup::codec::{encode_binary_field, encode_text_field};
use crate::backup::document::{BackupDocument, Record, TableBackup};
use crate::backup::schema::{inspect_table, TableSchema};
use crate::progress::Progress;
use crate::utils::{quote_ident, quote_table};
use anyhow::{Context, Result};
use futures::{pin_mut, TryStreamExt};
use std::path::Path;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};

/// Export the given tables into an artifact at `artifact`.
///
/// Tables are snapshotted in the order supplied. Any failure is fatal for the
/// whole export and nothing is written: the artifact only appears on disk
/// after every table has been fully read, so a half-written backup can never
/// be mistaken for a complete one. Blob side-files are the exception; some
/// may exist beside the artifact path after a failed run.
pub async fn export(
    client: &Client,
    artifact: &Path,
    tables: &[String],
    include_blobs: bool,
) -> Result<BackupDocument> {
    let blobs = BlobStore::new(artifact, include_blobs);
    let mut doc = BackupDocument::new();

    for table in tables {
        let backup = export_table(client, table, &blobs).await?;
        tracing::info!("✓ {} - exported {} rows", table, backup.records.len());
        doc.tables.push(backup);
    }

    doc.save(artifact)?;
    tracing::info!(
        "✅ Backup written to {} ({} rows across {} tables)",
        artifact.display(),
        doc.total_records(),
        doc.tables.len()
    );

    Ok(doc)
}

async fn export_table(client: &Client, table: &str, blobs: &BlobStore) -> Result<TableBackup> {
    let schema = inspect_table(client, table).await?;
    let sql = select_projection(&schema);

    let stream = client
        .query_raw(&sql, slice_iter(&[]))
        .await
        .with_context(|| format!("Failed to read rows from table '{}'", table))?;
    pin_mut!(stream);

    let mut records = Vec::new();
    let mut progress = Progress::new();
    while let Some(row) = stream
        .try_next()
        .await
        .with_context(|| format!("Failed while streaming rows from table '{}'", table))?
    {
        records.push(encode_row(&row, &schema, blobs)?);
        progress.update(|| format!("{} - exported {} rows", table, records.len()));
    }

    Ok(TableBackup {
        name: table.to_string(),
        records,
    })
}

/// Build the export projection for a table.
///
/// Non-binary columns are cast to text on the server so every value arrives
/// in the server's canonical rendering; binary columns come over raw and are
/// externalized by the codec.
fn select_projection(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|column| {
            let ident = quote_ident(&column.name);
            if column.kind.is_binary() {
                ident
            } else {
                format!("{}::text AS {}", ident, ident)
            }
        })
        .collect();

    format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_table(&schema.table)
    )
}

fn encode_row(row: &Row, schema: &TableSchema, blobs: &BlobStore) -> Result<Record> {
    let mut fields = Vec::with_capacity(schema.columns.len());

    for (index, column) in schema.columns.iter().enumerate() {
        let field = if column.kind.is_binary() {
            let bytes: Option<Vec<u8>> = row
                .try_get(index)
                .with_context(|| format!("Failed to read binary column '{}'", column.name))?;
            encode_binary_field(&column.name, bytes.as_deref(), blobs)?
        } else {
            let text: Option<String> = row
                .try_get(index)
                .with_context(|| format!("Failed to read column '{}'", column.name))?;
            encode_text_field(&column.name, column.kind, text)
        };
        fields.push(field);
    }

    Ok(Record { fields })
}

fn slice_iter<'a>(
    params: &'a [&'a (dyn ToSql + Sync)],
) -> impl ExactSizeIterator<Item = &'a dyn ToSql> + 'a {
    params.iter().map(|p| *p as _)
}
