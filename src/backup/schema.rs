// ABOUTME: Live table schema introspection for export and import planning
// ABOUTME: Combines driver column metadata with information_schema size facets

use crate::backup::codec::ColumnKind;
use crate::error::BackupError;
use crate::utils::{quote_table, split_table};
use tokio_postgres::Client;

/// Metadata for one column of a live table.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    /// The server's own name for the type, e.g. "int4" or "timestamptz".
    /// Used verbatim in cast expressions so the server resolves the type.
    pub native_type: String,
    pub kind: ColumnKind,
    /// Declared character length for bounded text columns.
    pub display_size: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
}

/// The inspected shape of one table at a point in time.
///
/// Export inspects the source table to build its projection; import inspects
/// the destination table so field mapping is driven by what the destination
/// actually has, not by what the artifact remembers.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_binary_columns(&self) -> bool {
        self.columns.iter().any(|c| c.kind.is_binary())
    }
}

/// Inspect a table's columns on the live connection.
///
/// Preparing a zero-row select gives authoritative column names and wire
/// types straight from the server; a follow-up catalog query fills in the
/// declared length, precision, and scale facets. A table that cannot be
/// prepared against (missing, no privileges) is a [`BackupError::Schema`],
/// which callers treat as fatal for the table.
pub async fn inspect_table(client: &Client, table: &str) -> Result<TableSchema, BackupError> {
    let probe = format!("SELECT * FROM {} LIMIT 0", quote_table(table));
    let statement = client
        .prepare(&probe)
        .await
        .map_err(|e| BackupError::Schema {
            table: table.to_string(),
            source: e,
        })?;

    let mut columns: Vec<ColumnInfo> = statement
        .columns()
        .iter()
        .map(|col| ColumnInfo {
            name: col.name().to_string(),
            native_type: col.type_().name().to_string(),
            kind: ColumnKind::from_type(col.type_()),
            display_size: None,
            precision: None,
            scale: None,
        })
        .collect();

    let (schema, name) = split_table(table);
    let rows = client
        .query(
            "SELECT column_name,
                    character_maximum_length::int4,
                    numeric_precision::int4,
                    numeric_scale::int4
             FROM information_schema.columns
             WHERE table_schema = $1 AND table_name = $2",
            &[&schema, &name],
        )
        .await
        .map_err(|e| BackupError::Schema {
            table: table.to_string(),
            source: e,
        })?;

    for row in rows {
        let column_name: String = row.get(0);
        if let Some(info) = columns.iter_mut().find(|c| c.name == column_name) {
            info.display_size = row.get(1);
            info.precision = row.get(2);
            info.scale = row.get(3);
        }
    }

    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}
