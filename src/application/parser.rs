//! JSON normalization for ClickUp payloads.
//!
//! Converts raw API objects (whose shape differs between v2 comments and v3
//! messages) into domain models.

use chrono::DateTime;
use serde_json::Value;

use crate::domain::{
    BackupRecord, Conversation, ConversationKind, Member, MemberDirectory, Workspace,
};

/// Timestamps above this are milliseconds, below it seconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// A chat view found during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatViewRef {
    pub view_id: String,
    pub view_name: String,
    /// `Space: A > Folder: B > List: C`.
    pub location: String,
    pub source: Value,
}

/// Reads an id that may be a string or a number.
pub fn value_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First field among `keys` that is present and not null.
fn first_of<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find(|v| !v.is_null())
}

/// First non-empty string or number among `keys`.
fn str_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| match value.get(*k)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Plain text from a string, an array of rich-text blocks or an object.
pub fn extract_text(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .map(|block| match block {
                Value::String(s) => s.clone(),
                Value::Object(_) => str_field(block, &["text"]),
                _ => String::new(),
            })
            .collect(),
        Value::Object(_) => first_of(content, &["text", "plain_text"])
            .and_then(Value::as_str)
            .map_or_else(|| content.to_string(), String::from),
        other => other.to_string(),
    }
}

/// Epoch milliseconds from a number or numeric string in seconds or ms.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if raw <= 0 {
        return None;
    }
    Some(if raw > MILLIS_THRESHOLD { raw } else { raw * 1000 })
}

/// Renders epoch milliseconds as UTC `%Y-%m-%d %H:%M:%S`.
pub fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// `reply_count` as number or numeric string; anything else is 0.
pub fn parse_reply_count(message: &Value) -> u64 {
    match message.get("reply_count") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Message author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Author from `creator`/`user` objects or scalar user ids, with names
/// filled from the member directory when the payload only carries an id.
pub fn parse_author(message: &Value, members: &MemberDirectory) -> Author {
    let mut author = Author::default();

    match first_of(message, &["creator", "user"]) {
        Some(user @ Value::Object(_)) => {
            author.id = str_field(user, &["id", "user_id"]);
            author.name = str_field(user, &["username", "name", "initials"]);
            author.email = str_field(user, &["email"]);
        }
        Some(scalar) => author.id = value_id(scalar).unwrap_or_default(),
        None => {}
    }
    if author.id.is_empty() {
        author.id = str_field(message, &["user_id"]);
    }

    if let Some(member) = members.get(&author.id) {
        if author.name.is_empty() {
            author.name.clone_from(&member.name);
        }
        if author.email.is_empty() {
            author.email.clone_from(&member.email);
        }
    }
    author
}

/// Attachment names, falling back to URLs.
pub fn parse_attachments(message: &Value) -> Vec<String> {
    message
        .get("attachments")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|a| match a {
                    Value::String(s) => s.clone(),
                    _ => str_field(a, &["name", "title", "url"]),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// JSON encoding of a non-empty `reactions` array, else empty.
pub fn parse_reactions(message: &Value) -> String {
    match message.get("reactions") {
        Some(Value::Array(items)) if !items.is_empty() => Value::Array(items.clone()).to_string(),
        _ => String::new(),
    }
}

/// Builds the record for a message or, when `parent` is set, a reply.
pub fn message_record(
    conversation: &Conversation,
    message: &Value,
    parent: Option<&str>,
    members: &MemberDirectory,
) -> BackupRecord {
    let author = parse_author(message, members);
    let timestamp_ms = first_of(message, &["date_created", "date"]).and_then(parse_timestamp);
    let text = first_of(message, &["content", "text", "comment", "comment_text"])
        .map(extract_text)
        .unwrap_or_default();

    BackupRecord {
        kind: conversation.kind,
        conversation_id: conversation.id.clone(),
        conversation_name: conversation.name.clone(),
        location: conversation.location.clone(),
        message_id: message.get("id").and_then(value_id).unwrap_or_default(),
        parent_message_id: parent.map(String::from),
        is_reply: parent.is_some(),
        timestamp_ms,
        date: format_timestamp(timestamp_ms),
        author_id: author.id,
        author_name: author.name,
        author_email: author.email,
        text,
        reply_count: parse_reply_count(message),
        resolved: message.get("resolved").and_then(Value::as_bool),
        reactions: parse_reactions(message),
        attachments: parse_attachments(message),
    }
}

/// Workspace from a v2 team object.
pub fn parse_workspace(team: &Value) -> Option<Workspace> {
    Some(Workspace {
        id: team.get("id").and_then(value_id)?,
        name: str_field(team, &["name"]),
    })
}

/// Member directory from a `GET /team/{id}` response.
pub fn parse_members(response: &Value) -> MemberDirectory {
    response
        .pointer("/team/members")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|m| {
                    let user = m.get("user")?;
                    let id = user.get("id").and_then(value_id)?;
                    let mut name = str_field(user, &["username", "initials"]);
                    if name.is_empty() {
                        name = "Unknown".into();
                    }
                    let email = str_field(user, &["email"]);
                    Some((id, Member { name, email }))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Participant names of a DM from `member_links` (or `members`).
fn participants(channel: &Value, members: &MemberDirectory) -> Vec<String> {
    first_of(channel, &["member_links", "members"])
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| first_of(link, &["user_id", "id"]).and_then(value_id))
                .filter_map(|uid| members.get(&uid).map(|m| m.name.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Conversation from a v3 channel object. `None` when it has no id.
pub fn parse_channel(channel: &Value, members: &MemberDirectory) -> Option<Conversation> {
    let id = channel.get("id").and_then(value_id)?;
    let kind = ConversationKind::from_channel_type(&str_field(channel, &["type"]));
    let raw_name = str_field(channel, &["name"]);

    let participants = match kind {
        ConversationKind::DirectMessage | ConversationKind::GroupDm => participants(channel, members),
        _ => Vec::new(),
    };

    let name = if kind == ConversationKind::Channel && !raw_name.is_empty() {
        raw_name
    } else if !participants.is_empty() {
        format!("DM: {}", participants.join(" & "))
    } else if !raw_name.is_empty() {
        raw_name
    } else {
        format!("channel-{id}")
    };

    Some(Conversation {
        id,
        kind,
        name,
        location: None,
        participants,
        source: channel.clone(),
    })
}

/// Conversation for a discovered legacy chat view.
pub fn view_conversation(view: &ChatViewRef) -> Conversation {
    Conversation {
        id: view.view_id.clone(),
        kind: ConversationKind::LegacyView,
        name: view.view_name.clone(),
        location: Some(view.location.clone()),
        participants: Vec::new(),
        source: view.source.clone(),
    }
}

/// Whether a v2 view object is a chat view.
pub fn is_chat_view(view: &Value) -> bool {
    view.get("type").and_then(Value::as_str) == Some("chat")
}

/// `ChatViewRef` from a v2 view object located at `location`.
pub fn parse_chat_view(view: &Value, location: &str) -> Option<ChatViewRef> {
    let view_id = view.get("id").and_then(value_id)?;
    let mut view_name = str_field(view, &["name"]);
    if view_name.is_empty() {
        view_name = "Unnamed".into();
    }
    Some(ChatViewRef {
        view_id,
        view_name,
        location: location.to_string(),
        source: view.clone(),
    })
}

/// Display name of a hierarchy node (space, folder, list).
pub fn node_name(node: &Value) -> String {
    str_field(node, &["name"])
}
