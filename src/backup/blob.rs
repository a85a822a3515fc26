// ABOUTME: Externalized blob storage for large binary field values
// ABOUTME: Writes side-files beside the artifact and resolves references back

use crate::error::BackupError;
use crate::utils::sanitize_identifier;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File extension for externalized binary values.
const BLOB_EXTENSION: &str = "blob";

/// Blob side-file store, rooted at the artifact's directory.
///
/// Binary field values are not inlined into the artifact; each one becomes a
/// uniquely named sibling file, keeping the primary artifact small and
/// diff-friendly. Decoding re-reads files relative to the same directory.
pub struct BlobStore {
    dir: PathBuf,
    enabled: bool,
}

impl BlobStore {
    /// Create a store co-located with the given artifact path.
    pub fn new(artifact_path: &Path, enabled: bool) -> Self {
        let dir = artifact_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { dir, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Externalize one binary value.
    ///
    /// Returns the generated filename, or `None` when blob export is disabled
    /// (the caller writes an empty marker instead). The driver hands over
    /// each bytea value fully materialized, so this is a single whole-buffer
    /// write rather than a streamed copy.
    pub fn write(&self, bytes: &[u8]) -> Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }

        let name = format!("{}.{}", Uuid::new_v4(), BLOB_EXTENSION);
        let path = self.dir.join(&name);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write blob file {}", path.display()))?;

        Ok(Some(name))
    }

    /// Read back an externalized value by its stored filename.
    ///
    /// Names containing path separators are rejected: a reference must resolve
    /// to a sibling of the artifact, never outside its directory.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, BackupError> {
        if name.contains('/') || name.contains('\\') {
            return Err(BackupError::BlobRead {
                file: sanitize_identifier(name),
                reason: "blob reference must be a bare filename".to_string(),
            });
        }

        fs::read(self.dir.join(name)).map_err(|e| BackupError::BlobRead {
            file: sanitize_identifier(name),
            reason: e.to_string(),
        })
    }
}
