// ABOUTME: Backup engine: schema inspection, dependency ordering, codec, executors
// ABOUTME: Exports the artifact model and the export/import entry points

pub mod blob;
pub mod codec;
pub mod deps;
pub mod document;
pub mod export;
pub mod import;
pub mod schema;
pub mod toposort;

pub use document::{BackupDocument, FORMAT_VERSION};
pub use export::export;
pub use import::{import, ImportReport};
