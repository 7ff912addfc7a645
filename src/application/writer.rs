//! Archive writer.
//!
//! Serializes a finished run to JSON and CSV files plus a summary. No
//! business logic lives here: everything written is already in the context.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::{
    AppError, BackupRecord, BackupSummary, ConversationExport, ConversationKind, KindCounts,
    KindSummary, Result,
};

use super::context::BackupContext;

/// File stem of the combined output.
pub const COMBINED_STEM: &str = "all_conversations";

/// Summary file name.
pub const SUMMARY_FILE: &str = "backup_summary.json";

/// CSV header, in [`CsvRow`] field order.
pub const CSV_COLUMNS: [&str; 17] = [
    "kind",
    "conversation_id",
    "conversation_name",
    "location",
    "message_id",
    "parent_message_id",
    "is_reply",
    "timestamp_ms",
    "date",
    "author_id",
    "author_name",
    "author_email",
    "text",
    "reply_count",
    "resolved",
    "reactions",
    "attachments",
];

/// One CSV row; `None` fields are written blank.
#[derive(Serialize)]
struct CsvRow<'a> {
    kind: ConversationKind,
    conversation_id: &'a str,
    conversation_name: &'a str,
    location: Option<&'a str>,
    message_id: &'a str,
    parent_message_id: Option<&'a str>,
    is_reply: bool,
    timestamp_ms: Option<i64>,
    date: &'a str,
    author_id: &'a str,
    author_name: &'a str,
    author_email: &'a str,
    text: &'a str,
    reply_count: u64,
    resolved: Option<bool>,
    reactions: &'a str,
    attachments: String,
}

impl<'a> From<&'a BackupRecord> for CsvRow<'a> {
    fn from(r: &'a BackupRecord) -> Self {
        Self {
            kind: r.kind,
            conversation_id: &r.conversation_id,
            conversation_name: &r.conversation_name,
            location: r.location.as_deref(),
            message_id: &r.message_id,
            parent_message_id: r.parent_message_id.as_deref(),
            is_reply: r.is_reply,
            timestamp_ms: r.timestamp_ms,
            date: &r.date,
            author_id: &r.author_id,
            author_name: &r.author_name,
            author_email: &r.author_email,
            text: &r.text,
            reply_count: r.reply_count,
            resolved: r.resolved,
            reactions: &r.reactions,
            attachments: r.attachments.join("; "),
        }
    }
}

/// Writes `value` as pretty-printed JSON.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create {}", path.display()), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(AppError::json_parse)?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), "Saved");
    Ok(())
}

/// Writes `records` as CSV with a header row, even when empty.
///
/// Returns the number of data rows.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_csv<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a BackupRecord>,
) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(AppError::csv)?;
    writer.write_record(CSV_COLUMNS).map_err(AppError::csv)?;

    let mut rows = 0;
    for record in records {
        writer.serialize(CsvRow::from(record)).map_err(AppError::csv)?;
        rows += 1;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), rows, "Saved");
    Ok(rows)
}

/// Writes `<stem>.json` and `<stem>.csv` for a set of exports.
fn write_set(
    dir: &Path,
    stem: &str,
    exports: &[&ConversationExport],
    files: &mut Vec<String>,
) -> Result<()> {
    let json_name = format!("{stem}.json");
    let csv_name = format!("{stem}.csv");

    write_json(&dir.join(&json_name), &exports)?;
    write_csv(&dir.join(&csv_name), exports.iter().flat_map(|e| &e.records))?;

    files.push(json_name);
    files.push(csv_name);
    Ok(())
}

/// Counts and issues of a run.
#[must_use]
pub fn build_summary(ctx: &BackupContext, files: Vec<String>) -> BackupSummary {
    let kinds = ConversationKind::ALL
        .into_iter()
        .map(|kind| KindSummary {
            kind,
            counts: KindCounts::tally(ctx.exports_of(kind)),
        })
        .collect();

    BackupSummary {
        workspace_id: ctx.workspace.id.clone(),
        workspace_name: ctx.workspace.name.clone(),
        backup_date: ctx.started_at,
        include_replies: ctx.options.include_replies,
        include_legacy: ctx.options.include_legacy,
        kinds,
        totals: KindCounts::tally(&ctx.exports),
        issues: ctx.issues.clone(),
        files,
    }
}

/// Writes the whole archive into `dir` and returns the summary.
///
/// The combined files and the summary are always written; per-kind files
/// only for kinds with at least one conversation.
///
/// # Errors
/// Returns error if the directory or any file cannot be written.
pub fn write_archive(dir: &Path, ctx: &BackupContext) -> Result<BackupSummary> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create directory {}", dir.display()), e))?;

    let mut files = Vec::new();
    let all: Vec<&ConversationExport> = ctx.exports.iter().collect();
    write_set(dir, COMBINED_STEM, &all, &mut files)?;

    for kind in ConversationKind::ALL {
        let group: Vec<&ConversationExport> = ctx.exports_of(kind).collect();
        if !group.is_empty() {
            write_set(dir, kind.file_stem(), &group, &mut files)?;
        }
    }

    files.push(SUMMARY_FILE.to_string());
    let summary = build_summary(ctx, files);
    write_json(&dir.join(SUMMARY_FILE), &summary)?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tempfile::tempdir;

    use super::*;
    use crate::application::context::BackupOptions;
    use crate::domain::{CaptureIssue, Conversation, MemberDirectory, Workspace};

    fn record(kind: ConversationKind, conv: &str, id: &str, parent: Option<&str>) -> BackupRecord {
        BackupRecord {
            kind,
            conversation_id: conv.into(),
            conversation_name: format!("#{conv}"),
            location: None,
            message_id: id.into(),
            parent_message_id: parent.map(String::from),
            is_reply: parent.is_some(),
            timestamp_ms: Some(0),
            date: "1970-01-01 00:00:00".into(),
            author_id: "1".into(),
            author_name: "alice".into(),
            author_email: String::new(),
            text: "hello, \"world\"".into(),
            reply_count: 0,
            resolved: None,
            reactions: String::new(),
            attachments: vec!["a.png".into(), "b.pdf".into()],
        }
    }

    fn export(kind: ConversationKind, id: &str, records: Vec<BackupRecord>) -> ConversationExport {
        ConversationExport::new(
            Conversation {
                id: id.into(),
                kind,
                name: format!("#{id}"),
                location: None,
                participants: Vec::new(),
                source: Value::Null,
            },
            records,
        )
    }

    fn context(dir: &Path) -> BackupContext {
        let mut ctx = BackupContext::new(
            Workspace {
                id: "9".into(),
                name: "Acme".into(),
            },
            MemberDirectory::new(),
            BackupOptions {
                workspace_id: None,
                include_replies: true,
                include_legacy: true,
                output_dir: dir.to_path_buf(),
            },
        );
        ctx.exports.push(export(
            ConversationKind::Channel,
            "c1",
            vec![
                record(ConversationKind::Channel, "c1", "m1", None),
                record(ConversationKind::Channel, "c1", "r1", Some("m1")),
            ],
        ));
        ctx.exports.push(export(
            ConversationKind::DirectMessage,
            "d1",
            vec![record(ConversationKind::DirectMessage, "d1", "m2", None)],
        ));
        ctx.issues.push(CaptureIssue {
            resource: "messages of #x".into(),
            error: "API error 404".into(),
        });
        ctx
    }

    fn csv_rows(path: &Path) -> Vec<csv::StringRecord> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap())
            .collect()
    }

    fn json_record_count(path: &Path) -> usize {
        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["records"].as_array().unwrap().len())
            .sum()
    }

    #[test]
    fn test_per_kind_files_only_for_present_kinds() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let summary = write_archive(dir.path(), &ctx).unwrap();

        assert!(dir.path().join("all_conversations.json").exists());
        assert!(dir.path().join("channels.csv").exists());
        assert!(dir.path().join("direct_messages.json").exists());
        assert!(!dir.path().join("group_dms.json").exists());
        assert!(!dir.path().join("chat_views.csv").exists());
        assert!(dir.path().join(SUMMARY_FILE).exists());
        assert_eq!(summary.files.len(), 7);
    }

    #[test]
    fn test_json_and_csv_counts_match_per_kind() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        write_archive(dir.path(), &ctx).unwrap();

        for stem in [COMBINED_STEM, "channels", "direct_messages"] {
            let rows = csv_rows(&dir.path().join(format!("{stem}.csv"))).len();
            let entries = json_record_count(&dir.path().join(format!("{stem}.json")));
            assert_eq!(rows, entries, "{stem}");
        }
        assert_eq!(csv_rows(&dir.path().join("all_conversations.csv")).len(), 3);
    }

    #[test]
    fn test_csv_header_and_blank_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let records = [record(ConversationKind::Channel, "c1", "m1", None)];

        assert_eq!(write_csv(&path, &records).unwrap(), 1);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_COLUMNS);

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "channel");
        assert_eq!(&row[3], ""); // location
        assert_eq!(&row[5], ""); // parent_message_id
        assert_eq!(&row[12], "hello, \"world\"");
        assert_eq!(&row[14], ""); // resolved
        assert_eq!(&row[16], "a.png; b.pdf");
    }

    #[test]
    fn test_empty_csv_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        assert_eq!(write_csv(&path, &[]).unwrap(), 0);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("kind,conversation_id,"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let summary = write_archive(dir.path(), &ctx).unwrap();

        assert_eq!(summary.totals.records, 3);
        assert_eq!(summary.totals.replies, 1);
        assert_eq!(summary.counts_for(ConversationKind::Channel).messages, 1);
        assert_eq!(summary.counts_for(ConversationKind::DirectMessage).conversations, 1);
        assert_eq!(summary.counts_for(ConversationKind::GroupDm), KindCounts::default());
        assert!(!summary.is_complete());

        let written: BackupSummary =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap())
                .unwrap();
        assert_eq!(written.totals, summary.totals);
        assert_eq!(written.issues.len(), 1);
    }
}
