//! Per-run backup state.

use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};

use crate::domain::{
    CaptureIssue, ConversationExport, ConversationKind, MemberDirectory, Workspace,
};

/// What a run should capture and where it writes.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Workspace to back up; `None` auto-selects when there is only one.
    pub workspace_id: Option<String>,
    pub include_replies: bool,
    pub include_legacy: bool,
    /// Parent of the timestamped run directory.
    pub output_dir: PathBuf,
}

/// Everything a run accumulates, passed explicitly through the pipeline.
///
/// Built once per run; exports and issues only grow.
#[derive(Debug)]
pub struct BackupContext {
    pub workspace: Workspace,
    pub members: MemberDirectory,
    pub options: BackupOptions,
    pub started_at: DateTime<Utc>,
    /// Flattened conversations in capture order.
    pub exports: Vec<ConversationExport>,
    /// Resources that were only partially captured.
    pub issues: Vec<CaptureIssue>,
}

impl BackupContext {
    #[must_use]
    pub fn new(workspace: Workspace, members: MemberDirectory, options: BackupOptions) -> Self {
        Self {
            workspace,
            members,
            options,
            started_at: Utc::now(),
            exports: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Exports of one kind, in capture order.
    pub fn exports_of(&self, kind: ConversationKind) -> impl Iterator<Item = &ConversationExport> {
        self.exports
            .iter()
            .filter(move |e| e.conversation.kind == kind)
    }

    /// `<output_dir>/<workspace-name>_<YYYYmmdd_HHMMSS>`.
    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.options
            .output_dir
            .join(run_dir_name(&self.workspace.name, self.started_at))
    }
}

/// Directory name for a run, safe on every platform.
#[must_use]
pub fn run_dir_name(workspace_name: &str, started_at: DateTime<Utc>) -> String {
    let safe: String = workspace_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.is_empty() { "workspace" } else { safe.as_str() };
    let stamp = started_at.with_timezone(&Local).format("%Y%m%d_%H%M%S");
    format!("{safe}_{stamp}")
}
