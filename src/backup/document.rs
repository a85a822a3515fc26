// ABOUTME: Serde model for the backup artifact (tables, records, fields)
// ABOUTME: Handles artifact persistence with format version checking

use crate::backup::codec::ColumnKind;
use crate::error::BackupError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current artifact format version ("MAJOR.MINOR").
///
/// Readers reject documents with a newer version and accept older ones; fields
/// added in later minor revisions must carry serde defaults so old artifacts
/// keep loading.
pub const FORMAT_VERSION: &str = "1.0";

/// The persisted backup artifact: an ordered sequence of tables, each holding
/// an ordered sequence of records.
///
/// Built once per export and fully materialized before being written; loaded
/// once per import, read-only, and discarded after the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub tables: Vec<TableBackup>,
}

impl BackupDocument {
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            tables: Vec::new(),
        }
    }

    /// Load and validate an artifact from disk.
    ///
    /// Unreadable files, malformed JSON, and documents from a newer format
    /// version all surface as [`BackupError::ArtifactFormat`] — fatal for the
    /// run, per the import contract.
    pub fn load(path: &Path) -> Result<Self, BackupError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| BackupError::ArtifactFormat(format!("{}: {}", path.display(), e)))?;
        let doc: Self = serde_json::from_str(&raw)
            .map_err(|e| BackupError::ArtifactFormat(e.to_string()))?;
        check_version(&doc.version)?;
        Ok(doc)
    }

    /// Write the artifact as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize artifact")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write artifact to {}", path.display()))?;
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|t| t.records.len()).sum()
    }
}

impl Default for BackupDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject artifacts written by a newer version of the tool.
fn check_version(version: &str) -> Result<(), BackupError> {
    fn parse(v: &str) -> Option<(u64, u64)> {
        let mut parts = v.splitn(2, '.');
        let major: u64 = parts.next()?.parse().ok()?;
        let minor: u64 = parts.next().unwrap_or("0").parse().ok()?;
        Some((major, minor))
    }

    let (doc_major, doc_minor) = parse(version).unwrap_or((u64::MAX, u64::MAX));
    let (our_major, our_minor) = parse(FORMAT_VERSION).unwrap_or((1, 0));

    if doc_major > our_major || (doc_major == our_major && doc_minor > our_minor) {
        return Err(BackupError::ArtifactFormat(format!(
            "artifact format version '{}' is newer than the supported '{}'",
            version, FORMAT_VERSION
        )));
    }

    Ok(())
}

/// One table's worth of exported records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableBackup {
    pub name: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// An ordered sequence of fields. Order is immaterial for lookup but preserved
/// for readability of the persisted artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Record {
    /// First field with the given name, if any.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single named, typed, nullable value.
///
/// `type_tag` is the *source* column kind at export time, independent of what
/// the destination schema looks like at import time — this is what enables
/// schema-drifted restores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<ColumnKind>,
    pub value: FieldValue,
}

/// A field's payload: canonical text, a null marker, or a reference to a blob
/// side-file stored beside the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Text(String),
    Blob(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_document() -> BackupDocument {
        let mut doc = BackupDocument::new();
        doc.tables.push(TableBackup {
            name: "customers".to_string(),
            records: vec![Record {
                fields: vec![
                    Field {
                        name: "id".to_string(),
                        type_tag: Some(ColumnKind::Uuid),
                        value: FieldValue::Text(
                            "6d1a7a2e-0c6f-4b1e-9a7e-000000000001".to_string(),
                        ),
                    },
                    Field {
                        name: "name".to_string(),
                        type_tag: Some(ColumnKind::Text),
                        value: FieldValue::Text("Alice".to_string()),
                    },
                    Field {
                        name: "notes".to_string(),
                        type_tag: Some(ColumnKind::Text),
                        value: FieldValue::Null,
                    },
                ],
            }],
        });
        doc
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let doc = sample_document();
        doc.save(&path).unwrap();

        let loaded = BackupDocument::load(&path).unwrap();
        assert_eq!(loaded.version, FORMAT_VERSION);
        assert_eq!(loaded.tables.len(), 1);
        assert_eq!(loaded.tables[0].name, "customers");
        assert_eq!(loaded.tables[0].records[0].fields.len(), 3);
    }

    #[test]
    fn test_field_order_is_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");

        sample_document().save(&path).unwrap();
        let loaded = BackupDocument::load(&path).unwrap();

        let names: Vec<&str> = loaded.tables[0].records[0]
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "name", "notes"]);
    }

    #[test]
    fn test_field_lookup_by_name() {
        let doc = sample_document();
        let record = &doc.tables[0].records[0];
        assert!(record.field("name").is_some());
        assert!(record.field("nonexistent").is_none());
        assert!(record.field("notes").unwrap().value.is_null());
    }

    #[test]
    fn test_load_missing_file_is_artifact_error() {
        let result = BackupDocument::load(Path::new("/nonexistent/backup.json"));
        assert!(matches!(result, Err(BackupError::ArtifactFormat(_))));
    }

    #[test]
    fn test_load_malformed_json_is_artifact_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs::write(&path, "not json {{{").unwrap();

        let result = BackupDocument::load(&path);
        assert!(matches!(result, Err(BackupError::ArtifactFormat(_))));
    }

    #[test]
    fn test_load_rejects_newer_format_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs::write(
            &path,
            r#"{"version": "99.0", "exported_at": "2026-01-01T00:00:00Z", "tables": []}"#,
        )
        .unwrap();

        let result = BackupDocument::load(&path);
        assert!(matches!(result, Err(BackupError::ArtifactFormat(_))));
    }

    #[test]
    fn test_load_rejects_newer_minor_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs::write(
            &path,
            r#"{"version": "1.999", "exported_at": "2026-01-01T00:00:00Z", "tables": []}"#,
        )
        .unwrap();

        assert!(BackupDocument::load(&path).is_err());
    }

    #[test]
    fn test_unknown_document_fields_are_ignored() {
        // A 1.x artifact from a later minor revision may carry fields this
        // reader does not know about; they must not break loading.
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs::write(
            &path,
            r#"{
                "version": "1.0",
                "exported_at": "2026-01-01T00:00:00Z",
                "future_field": {"anything": true},
                "tables": [
                    {"name": "t", "records": [], "compression": "none"}
                ]
            }"#,
        )
        .unwrap();

        let doc = BackupDocument::load(&path).unwrap();
        assert_eq!(doc.tables[0].name, "t");
    }

    #[test]
    fn test_missing_records_defaults_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs::write(
            &path,
            r#"{
                "version": "1.0",
                "exported_at": "2026-01-01T00:00:00Z",
                "tables": [{"name": "empty_table"}]
            }"#,
        )
        .unwrap();

        let doc = BackupDocument::load(&path).unwrap();
        assert!(doc.tables[0].records.is_empty());
    }

    #[test]
    fn test_total_records() {
        let doc = sample_document();
        assert_eq!(doc.total_records(), 1);
        assert_eq!(doc.table_names(), vec!["customers"]);
    }
}
