//! Domain models for ClickUp chat data.
//!
//! These models represent the entities pulled from the ClickUp API and the
//! flattened, write-ready records produced from them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A ClickUp workspace (called a "team" by the v2 API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A workspace member, used to resolve DM names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Member {
    /// Display name (username, or initials when no username is set).
    pub name: String,
    /// Email address, possibly empty.
    #[serde(default)]
    pub email: String,
}

/// Member lookup keyed by user id.
pub type MemberDirectory = HashMap<String, Member>;

/// Kind of conversation a record originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Public or private group channel.
    Channel,
    /// One-on-one direct message.
    #[serde(rename = "dm")]
    DirectMessage,
    /// Multi-person private chat.
    GroupDm,
    /// Chat view from the legacy v2 API.
    LegacyView,
    /// v3 channel with a type this tool does not know.
    Other,
}

impl ConversationKind {
    /// All kinds in output order.
    pub const ALL: [Self; 5] = [
        Self::Channel,
        Self::DirectMessage,
        Self::GroupDm,
        Self::LegacyView,
        Self::Other,
    ];

    /// Maps the v3 channel `type` field.
    #[must_use]
    pub fn from_channel_type(channel_type: &str) -> Self {
        match channel_type {
            "CHANNEL" => Self::Channel,
            "DM" => Self::DirectMessage,
            "GROUP_DM" => Self::GroupDm,
            _ => Self::Other,
        }
    }

    /// File stem used for the per-kind output files.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::Channel => "channels",
            Self::DirectMessage => "direct_messages",
            Self::GroupDm => "group_dms",
            Self::LegacyView => "chat_views",
            Self::Other => "other_conversations",
        }
    }

    /// Whether messages of this kind can carry thread replies.
    #[must_use]
    pub const fn supports_threads(self) -> bool {
        !matches!(self, Self::LegacyView)
    }
}

impl std::fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel => write!(f, "Channels"),
            Self::DirectMessage => write!(f, "Direct Messages"),
            Self::GroupDm => write!(f, "Group DMs"),
            Self::LegacyView => write!(f, "Chat Views"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A channel, DM, group DM or legacy chat view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Channel or view identifier.
    pub id: String,
    /// Conversation kind.
    pub kind: ConversationKind,
    /// Resolved display name.
    pub name: String,
    /// Hierarchy path for legacy views (`Space: A > List: B`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Resolved participant names (DMs and group DMs).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<String>,
    /// Source object as returned by the API.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub source: Value,
}

/// Flattened, write-ready form of one message or reply.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub kind: ConversationKind,
    pub conversation_id: String,
    pub conversation_name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub message_id: String,
    /// Set only on replies; references a message in the same export.
    #[serde(default)]
    pub parent_message_id: Option<String>,
    pub is_reply: bool,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
    /// `timestamp_ms` rendered as UTC `%Y-%m-%d %H:%M:%S`.
    pub date: String,
    pub author_id: String,
    pub author_name: String,
    pub author_email: String,
    pub text: String,
    pub reply_count: u64,
    /// Legacy comments only.
    #[serde(default)]
    pub resolved: Option<bool>,
    /// JSON encoding of the reactions array, empty if none.
    pub reactions: String,
    pub attachments: Vec<String>,
}

/// One conversation and its flattened records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationExport {
    pub conversation: Conversation,
    pub message_count: usize,
    pub reply_count: usize,
    pub records: Vec<BackupRecord>,
}

impl ConversationExport {
    /// Builds an export, deriving the counts from the records.
    #[must_use]
    pub fn new(conversation: Conversation, records: Vec<BackupRecord>) -> Self {
        let reply_count = records.iter().filter(|r| r.is_reply).count();
        Self {
            conversation,
            message_count: records.len() - reply_count,
            reply_count,
            records,
        }
    }
}

/// A resource whose walk ended early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureIssue {
    /// What was being fetched (e.g. `messages of #general`).
    pub resource: String,
    /// Why it stopped.
    pub error: String,
}

/// Counts for one conversation kind (or the whole run).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub conversations: usize,
    pub messages: usize,
    pub replies: usize,
    pub records: usize,
}

impl KindCounts {
    /// Tallies the given exports.
    pub fn tally<'a>(exports: impl IntoIterator<Item = &'a ConversationExport>) -> Self {
        exports
            .into_iter()
            .fold(Self::default(), |mut acc, export| {
                acc.conversations += 1;
                acc.messages += export.message_count;
                acc.replies += export.reply_count;
                acc.records += export.records.len();
                acc
            })
    }
}

/// Counts for one kind inside the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSummary {
    pub kind: ConversationKind,
    #[serde(flatten)]
    pub counts: KindCounts,
}

/// Summary written next to the archive as `backup_summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSummary {
    pub workspace_id: String,
    pub workspace_name: String,
    pub backup_date: DateTime<Utc>,
    pub include_replies: bool,
    pub include_legacy: bool,
    /// Counts per kind, in output order.
    pub kinds: Vec<KindSummary>,
    pub totals: KindCounts,
    /// Resources that were only partially captured.
    pub issues: Vec<CaptureIssue>,
    /// Files written, relative to the run directory.
    pub files: Vec<String>,
}

impl BackupSummary {
    /// Whether every resource was captured completely.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
impl BackupSummary {
    /// Counts for a single kind.
    #[must_use]
    pub fn counts_for(&self, kind: ConversationKind) -> KindCounts {
        self.kinds
            .iter()
            .find(|k| k.kind == kind)
            .map(|k| k.counts.clone())
            .unwrap_or_default()
    }
}
