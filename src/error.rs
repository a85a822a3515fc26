// ABOUTME: Error taxonomy for the backup/restore engine
// ABOUTME: Distinguishes fatal errors from per-field and per-row recoverable failures

use thiserror::Error;

/// Errors raised by the backup engine.
///
/// Fatality is decided by the caller, not the variant, but by convention:
/// `Schema`, `CyclicDependency` and `ArtifactFormat` abort the current run;
/// `BlobRead` is recovered locally with a zero-length substitute; `FieldDecode`
/// and `RowWrite` are collected per record and reported at the end of an import.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Table or column metadata could not be read from the live database.
    #[error("schema for table '{table}' is unavailable: {source}")]
    Schema {
        table: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// The foreign-key graph contains a cycle, so no valid processing order exists.
    #[error("cyclic dependency between tables: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    /// The backup artifact is unreadable, malformed, or from a newer format version.
    #[error("malformed backup artifact: {0}")]
    ArtifactFormat(String),

    /// A referenced blob side-file is missing or unreadable.
    #[error("blob file '{file}' could not be read: {reason}")]
    BlobRead { file: String, reason: String },

    /// A field value could not be converted to the expected type.
    #[error("field '{field}' could not be decoded: {reason}")]
    FieldDecode { field: String, reason: String },

    /// A single-row insert was rejected by the database.
    #[error("row insert into '{table}' failed: {source}")]
    RowWrite {
        table: String,
        #[source]
        source: tokio_postgres::Error,
    },
}
