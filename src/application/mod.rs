//! Application layer - use cases and orchestration.
//!
//! This layer pages through the API, flattens conversations into records
//! and writes the archive.

pub mod backup_service;
pub mod context;
pub mod discovery;
pub mod flattener;
pub mod formatter;
pub mod paginator;
pub mod parser;
pub mod writer;

pub use backup_service::BackupService;
pub use context::BackupOptions;
pub use formatter::{format_summary, format_workspaces_table};
