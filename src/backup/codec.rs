// ABOUTME: Record codec converting database values to tagged artifact fields and back
// ABOUTME: Owns the closed column-kind enumeration and the missing-field default policy

use crate::backup::blob::BlobStore;
use crate::backup::document::{Field, FieldValue};
use crate::error::BackupError;
use anyhow::Result;
use bytes::BytesMut;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use uuid::Uuid;

/// Closed enumeration of supported native column kinds.
///
/// Each kind selects a codec rule; anything the engine has no special handling
/// for falls into `Other` and rides the generic text path. The serialized tag
/// names are part of the artifact format — renaming a variant is a format
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Bytea,
    Json,
    /// Any kind this reader does not recognize, including tags written by a
    /// later minor format revision.
    #[serde(other)]
    Other,
}

impl ColumnKind {
    /// Map a live wire type to its codec kind.
    pub fn from_type(ty: &Type) -> Self {
        match ty.name() {
            "bool" => ColumnKind::Bool,
            "int2" => ColumnKind::Int2,
            "int4" => ColumnKind::Int4,
            "int8" => ColumnKind::Int8,
            "float4" => ColumnKind::Float4,
            "float8" => ColumnKind::Float8,
            "numeric" => ColumnKind::Numeric,
            "text" | "varchar" | "bpchar" | "char" | "name" | "citext" => ColumnKind::Text,
            "uuid" => ColumnKind::Uuid,
            "date" => ColumnKind::Date,
            "time" | "timetz" => ColumnKind::Time,
            "timestamp" => ColumnKind::Timestamp,
            "timestamptz" => ColumnKind::TimestampTz,
            "bytea" => ColumnKind::Bytea,
            "json" | "jsonb" => ColumnKind::Json,
            _ => ColumnKind::Other,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ColumnKind::Bytea)
    }

    /// The server-side type name for this kind, used when a textual value
    /// must be converted through its source type. `Other` covers many server
    /// types, so it has no name of its own.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            ColumnKind::Bool => Some("bool"),
            ColumnKind::Int2 => Some("int2"),
            ColumnKind::Int4 => Some("int4"),
            ColumnKind::Int8 => Some("int8"),
            ColumnKind::Float4 => Some("float4"),
            ColumnKind::Float8 => Some("float8"),
            ColumnKind::Numeric => Some("numeric"),
            ColumnKind::Text => Some("text"),
            ColumnKind::Uuid => Some("uuid"),
            ColumnKind::Date => Some("date"),
            ColumnKind::Time => Some("time"),
            ColumnKind::Timestamp => Some("timestamp"),
            ColumnKind::TimestampTz => Some("timestamptz"),
            ColumnKind::Bytea => Some("bytea"),
            ColumnKind::Json => Some("json"),
            ColumnKind::Other => None,
        }
    }
}

/// A decoded value ready to be bound as an insert parameter.
///
/// Most kinds stay textual and are cast server-side to the destination
/// column's declared type, so cross-type coercions follow the database's own
/// conversion rules. Only the kinds with decode rules of their own (uuid,
/// bytea) and the default-policy values get native variants.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Text(String),
    Uuid(Uuid),
    TimestampTz(chrono::DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// The wire type this value is declared as when preparing a statement.
    pub fn param_type(&self) -> Type {
        match self {
            SqlValue::Null | SqlValue::Text(_) => Type::TEXT,
            SqlValue::Bool(_) => Type::BOOL,
            SqlValue::Uuid(_) => Type::UUID,
            SqlValue::TimestampTz(_) => Type::TIMESTAMPTZ,
            SqlValue::Bytes(_) => Type::BYTEA,
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql(ty, out),
            SqlValue::Text(v) => v.to_sql(ty, out),
            SqlValue::Uuid(v) => v.to_sql(ty, out),
            SqlValue::TimestampTz(v) => v.to_sql(ty, out),
            SqlValue::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Statements are prepared with the exact types from `param_type`, so
        // every variant is bound against a type it delegates to correctly.
        true
    }

    to_sql_checked!();
}

/// Encode one non-binary column value as an artifact field.
///
/// `value` is the canonical server-rendered text of the source value (the
/// export projection casts every non-binary column to text), so no
/// locale-dependent formatting happens on this side of the wire.
pub fn encode_text_field(name: &str, kind: ColumnKind, value: Option<String>) -> Field {
    Field {
        name: name.to_string(),
        type_tag: Some(kind),
        value: match value {
            None => FieldValue::Null,
            Some(text) => FieldValue::Text(text),
        },
    }
}

/// Encode one binary column value, externalizing it through the blob store.
///
/// With blob export disabled the field gets an empty text marker and a
/// warning is surfaced; the value is otherwise unrepresented in the artifact.
pub fn encode_binary_field(name: &str, value: Option<&[u8]>, blobs: &BlobStore) -> Result<Field> {
    let value = match value {
        None => FieldValue::Null,
        Some(bytes) => match blobs.write(bytes)? {
            Some(file) => FieldValue::Blob(file),
            None => {
                tracing::warn!(
                    "Blob export disabled; binary field '{}' written as empty marker",
                    name
                );
                FieldValue::Text(String::new())
            }
        },
    };

    Ok(Field {
        name: name.to_string(),
        type_tag: Some(ColumnKind::Bytea),
        value,
    })
}

/// Decode an artifact field into an insert parameter.
///
/// Rules, in priority order:
/// 1. null marker decodes to SQL NULL regardless of tag;
/// 2. uuid-tagged values must parse in canonical hyphenated-hex form —
///    malformed input is a [`BackupError::FieldDecode`], fatal for the record;
/// 3. bytea-tagged values resolve their blob reference, substituting a
///    zero-length byte sequence (with a warning) when the side-file is
///    missing or unreadable;
/// 4. everything else stays text; at insert time the statement converts it
///    through its captured source type first when that kind differs from the
///    destination column's, so cross-kind coercions follow the server's cast
///    rules between the two types.
pub fn decode_field(field: &Field, blobs: &BlobStore) -> Result<SqlValue, BackupError> {
    match (&field.value, field.type_tag) {
        (FieldValue::Null, _) => Ok(SqlValue::Null),

        (value, Some(ColumnKind::Uuid)) => {
            let text = raw_text(value);
            let parsed = Uuid::parse_str(text).map_err(|e| BackupError::FieldDecode {
                field: field.name.clone(),
                reason: format!("invalid uuid '{}': {}", text, e),
            })?;
            Ok(SqlValue::Uuid(parsed))
        }

        (FieldValue::Text(text), Some(ColumnKind::Bytea)) if text.is_empty() => {
            Ok(SqlValue::Bytes(Vec::new()))
        }
        (FieldValue::Text(reference) | FieldValue::Blob(reference), Some(ColumnKind::Bytea)) => {
            match blobs.read(reference) {
                Ok(bytes) => Ok(SqlValue::Bytes(bytes)),
                Err(e) => {
                    tracing::warn!("{}; substituting zero-length value", e);
                    Ok(SqlValue::Bytes(Vec::new()))
                }
            }
        }

        (FieldValue::Text(text), _) => Ok(SqlValue::Text(text.clone())),
        // A blob reference under a non-binary tag: pass the reference through
        // as text rather than guessing at intent.
        (FieldValue::Blob(reference), _) => Ok(SqlValue::Text(reference.clone())),
    }
}

fn raw_text(value: &FieldValue) -> &str {
    match value {
        FieldValue::Text(t) | FieldValue::Blob(t) => t,
        FieldValue::Null => "",
    }
}

/// Default applied when a destination column has no corresponding field in
/// the source record (schema drift between backup time and restore time).
///
/// Boolean-like columns default to false, date/time columns to the current
/// timestamp at import time, unique-identifier columns to the all-zero
/// identifier. Every other kind returns `None` and is omitted from the insert
/// entirely, deferring to the column's own database-side default or
/// nullability.
pub fn missing_field_default(kind: ColumnKind) -> Option<SqlValue> {
    match kind {
        ColumnKind::Bool => Some(SqlValue::Bool(false)),
        ColumnKind::Date | ColumnKind::Time | ColumnKind::Timestamp | ColumnKind::TimestampTz => {
            Some(SqlValue::TimestampTz(Utc::now()))
        }
        ColumnKind::Uuid => Some(SqlValue::Uuid(Uuid::nil())),
        _ => None,
    }
}
