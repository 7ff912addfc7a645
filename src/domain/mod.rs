//! Domain layer - core types.
//!
//! This layer contains pure domain models, configuration and error types
//! without any I/O.

pub mod config;
pub mod error;
pub mod models;

pub use config::{ApiConfig, AppConfig};
pub use error::{AppError, Result};
pub use models::{
    BackupRecord, BackupSummary, CaptureIssue, Conversation, ConversationExport,
    ConversationKind, KindCounts, KindSummary, Member, MemberDirectory, Workspace,
};
