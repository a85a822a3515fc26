// ABOUTME: Command implementations for the CLI surface
// ABOUTME: Exports the export and import commands

pub mod export;
pub mod import;

pub use export::export;
pub use import::import;
