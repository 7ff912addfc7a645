//! Conversation flattening.
//!
//! Turns one conversation and its raw messages into ordered
//! [`BackupRecord`]s, each reply placed directly after its parent.

use serde_json::Value;

use crate::domain::{
    BackupRecord, CaptureIssue, Conversation, ConversationExport, MemberDirectory, Result,
};

use super::paginator::WalkOutcome;
use super::parser::{message_record, parse_reply_count};

/// Source of thread replies for a message.
pub trait ThreadSource {
    /// Walks the replies of `message_id` in `conversation`.
    fn replies(&self, conversation: &Conversation, message_id: &str) -> WalkOutcome;
}

/// Result of flattening one conversation.
#[derive(Debug)]
pub struct Flattened {
    pub export: ConversationExport,
    /// Reply walks that ended early.
    pub issues: Vec<CaptureIssue>,
}

/// Flattens conversations against a member directory.
pub struct Flattener<'a> {
    members: &'a MemberDirectory,
    include_replies: bool,
}

impl<'a> Flattener<'a> {
    #[must_use]
    pub const fn new(members: &'a MemberDirectory, include_replies: bool) -> Self {
        Self {
            members,
            include_replies,
        }
    }

    /// Flattens `messages` of `conversation`.
    ///
    /// Replies are requested only when reply fetching is enabled, the kind
    /// supports threads and the message reports `reply_count > 0`.
    ///
    /// # Errors
    /// Propagates a reply walk error that invalidates the whole run.
    pub fn flatten(
        &self,
        conversation: Conversation,
        messages: &[Value],
        threads: &impl ThreadSource,
    ) -> Result<Flattened> {
        let fetch_threads = self.include_replies && conversation.kind.supports_threads();
        let mut records = Vec::with_capacity(messages.len());
        let mut issues = Vec::new();

        for message in messages {
            let record = message_record(&conversation, message, None, self.members);
            let wants_replies =
                fetch_threads && !record.message_id.is_empty() && parse_reply_count(message) > 0;
            let parent_id = record.message_id.clone();
            records.push(record);

            if !wants_replies {
                continue;
            }

            let resource = format!("replies to message {parent_id} in {}", conversation.name);
            let replies = threads
                .replies(&conversation, &parent_id)
                .settle(&resource, &mut issues)?;
            if !replies.is_empty() {
                tracing::info!(
                    message = %parent_id,
                    replies = replies.len(),
                    "Thread fetched"
                );
            }
            records.extend(
                replies
                    .iter()
                    .map(|reply| message_record(&conversation, reply, Some(&parent_id), self.members)),
            );
        }

        Ok(Flattened {
            export: ConversationExport::new(conversation, records),
            issues,
        })
    }
}

/// Thread source for kinds or runs without replies.
pub struct NoThreads;

impl ThreadSource for NoThreads {
    fn replies(&self, _conversation: &Conversation, _message_id: &str) -> WalkOutcome {
        WalkOutcome::default()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::domain::{AppError, ConversationKind};

    /// Serves replies from a map and counts requests.
    #[derive(Default)]
    struct MapThreads {
        replies: HashMap<String, Vec<Value>>,
        requested: RefCell<Vec<String>>,
        fail_with: Option<u16>,
    }

    impl ThreadSource for MapThreads {
        fn replies(&self, _conversation: &Conversation, message_id: &str) -> WalkOutcome {
            self.requested.borrow_mut().push(message_id.to_string());
            let mut outcome =
                WalkOutcome::collect(vec![Ok(self.replies.get(message_id).cloned().unwrap_or_default())]);
            if let Some(status) = self.fail_with {
                outcome.error = Some(AppError::Unauthorized {
                    status,
                    message: "denied".into(),
                });
            }
            outcome
        }
    }

    fn conversation(kind: ConversationKind) -> Conversation {
        Conversation {
            id: "c1".into(),
            kind,
            name: "general".into(),
            location: None,
            participants: Vec::new(),
            source: Value::Null,
        }
    }

    fn messages() -> Vec<Value> {
        vec![
            json!({"id": "m1", "content": "first", "date": "1700000000000"}),
            json!({"id": "m2", "content": "second", "reply_count": 2}),
            json!({"id": "m3", "content": "third", "reply_count": "0"}),
        ]
    }

    fn threads() -> MapThreads {
        MapThreads {
            replies: HashMap::from([(
                "m2".to_string(),
                vec![json!({"id": "r1", "content": "a"}), json!({"id": "r2", "content": "b"})],
            )]),
            ..MapThreads::default()
        }
    }

    #[test]
    fn test_three_messages_two_replies_yield_five_records() {
        let members = MemberDirectory::new();
        let threads = threads();

        let flattened = Flattener::new(&members, true)
            .flatten(conversation(ConversationKind::Channel), &messages(), &threads)
            .unwrap();

        let ids: Vec<_> = flattened
            .export
            .records
            .iter()
            .map(|r| r.message_id.as_str())
            .collect();
        assert_eq!(ids, ["m1", "m2", "r1", "r2", "m3"]);
        assert_eq!(flattened.export.message_count, 3);
        assert_eq!(flattened.export.reply_count, 2);
        assert_eq!(*threads.requested.borrow(), ["m2"]);
    }

    #[test]
    fn test_reply_parents_exist() {
        let members = MemberDirectory::new();
        let flattened = Flattener::new(&members, true)
            .flatten(conversation(ConversationKind::GroupDm), &messages(), &threads())
            .unwrap();

        let records = &flattened.export.records;
        for reply in records.iter().filter(|r| r.is_reply) {
            let parent = reply.parent_message_id.as_deref().unwrap();
            assert!(records.iter().any(|r| !r.is_reply && r.message_id == parent));
            assert_eq!(reply.kind, ConversationKind::GroupDm);
        }
    }

    #[test]
    fn test_no_replies_never_fetches() {
        let members = MemberDirectory::new();
        let threads = threads();

        let flattened = Flattener::new(&members, false)
            .flatten(conversation(ConversationKind::Channel), &messages(), &threads)
            .unwrap();

        assert_eq!(flattened.export.records.len(), 3);
        assert!(threads.requested.borrow().is_empty());
    }

    #[test]
    fn test_legacy_views_have_no_threads() {
        let members = MemberDirectory::new();
        let threads = threads();

        let flattened = Flattener::new(&members, true)
            .flatten(conversation(ConversationKind::LegacyView), &messages(), &threads)
            .unwrap();

        assert_eq!(flattened.export.records.len(), 3);
        assert!(threads.requested.borrow().is_empty());
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let members = MemberDirectory::new();
        let flattener = Flattener::new(&members, true);

        let a = flattener
            .flatten(conversation(ConversationKind::Channel), &messages(), &threads())
            .unwrap();
        let b = flattener
            .flatten(conversation(ConversationKind::Channel), &messages(), &threads())
            .unwrap();

        assert_eq!(a.export.records, b.export.records);
        assert_eq!(
            serde_json::to_vec(&a.export).unwrap(),
            serde_json::to_vec(&b.export).unwrap()
        );
    }

    #[test]
    fn test_forbidden_thread_is_recorded() {
        let members = MemberDirectory::new();
        let threads = MapThreads {
            fail_with: Some(403),
            ..threads()
        };

        let flattened = Flattener::new(&members, true)
            .flatten(conversation(ConversationKind::Channel), &messages(), &threads)
            .unwrap();

        assert_eq!(flattened.export.records.len(), 5);
        assert_eq!(flattened.issues.len(), 1);
    }

    #[test]
    fn test_rejected_token_aborts() {
        let members = MemberDirectory::new();
        let threads = MapThreads {
            fail_with: Some(401),
            ..threads()
        };

        let result = Flattener::new(&members, true).flatten(
            conversation(ConversationKind::Channel),
            &messages(),
            &threads,
        );

        assert!(result.is_err());
    }
}
