//! Terminal output for backup results.
//!
//! Tables for workspaces and per-kind counts, plus a colored summary.

use std::path::Path;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{BackupSummary, CaptureIssue, Workspace};

/// Formats the workspaces the token can access.
pub fn format_workspaces_table(workspaces: &[Workspace]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Name"]);

    for workspace in workspaces {
        table.add_row(vec![workspace.id.as_str(), &truncate(&workspace.name, 40)]);
    }

    table.to_string()
}

/// Formats per-kind counts with a totals row.
pub fn format_counts_table(summary: &BackupSummary) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Kind", "Conversations", "Messages", "Replies", "Records"]);

    for entry in &summary.kinds {
        let c = &entry.counts;
        table.add_row(vec![
            entry.kind.to_string(),
            c.conversations.to_string(),
            c.messages.to_string(),
            c.replies.to_string(),
            c.records.to_string(),
        ]);
    }

    let t = &summary.totals;
    table.add_row(vec![
        "Total".to_string(),
        t.conversations.to_string(),
        t.messages.to_string(),
        t.replies.to_string(),
        t.records.to_string(),
    ]);

    table.to_string()
}

/// Formats the resources that were only partially captured.
pub fn format_issues(issues: &[CaptureIssue]) -> String {
    let mut out = format!(
        "{} {} resource(s) incomplete:",
        "⚠".yellow().bold(),
        issues.len()
    );
    for issue in issues {
        out.push_str(&format!("\n  - {}: {}", issue.resource.cyan(), issue.error));
    }
    out
}

/// Formats the end-of-run summary.
pub fn format_summary(summary: &BackupSummary, run_dir: &Path) -> String {
    let mut out = format!(
        "{}\n  Workspace: {} ({})\n  Replies: {}\n  Chat views: {}\n\n{}\n\n  Files: {}\n  Location: {}",
        "📦 Backup Summary".bold(),
        summary.workspace_name.cyan(),
        summary.workspace_id,
        on_off(summary.include_replies),
        on_off(summary.include_legacy),
        format_counts_table(summary),
        summary.files.len().to_string().cyan(),
        run_dir.display().to_string().green()
    );

    if summary.is_complete() {
        out.push_str(&format!("\n\n{} Backup complete", "✓".green().bold()));
    } else {
        out.push_str("\n\n");
        out.push_str(&format_issues(&summary.issues));
    }
    out
}

fn on_off(enabled: bool) -> colored::ColoredString {
    if enabled {
        "included".green()
    } else {
        "skipped".yellow()
    }
}

/// Truncates a string to max chars with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
