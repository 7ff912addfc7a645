//! ClickUp endpoint catalog.
//!
//! Knows the URL, query and pagination style of every collection the
//! backup reads. v2 serves workspaces, members and legacy chat views; v3
//! serves chat channels, messages and thread replies.

use crate::domain::ApiConfig;

use super::http::Query;

/// Page size of the v2 view comment endpoint; a shorter page is the last.
pub const COMMENT_PAGE_SIZE: usize = 25;

/// How a collection signals its next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStrategy {
    /// Exactly one page.
    Single,
    /// `cursor=<next_cursor>` until the response carries no `next_cursor`.
    Cursor { limit: u32 },
    /// `start=<date>&start_id=<id>` of the last item, until a short page.
    Keyset { page_size: usize },
}

/// A paginated collection to walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Human-readable name used in logs and capture issues.
    pub resource: String,
    pub url: String,
    /// Query sent on every page.
    pub query: Query,
    /// Keys that may hold the item array, tried in order.
    pub items_keys: &'static [&'static str],
    pub strategy: PageStrategy,
}

impl PageRequest {
    /// Query for the first page.
    #[must_use]
    pub fn first_query(&self) -> Query {
        let mut query = self.query.clone();
        if let PageStrategy::Cursor { limit } = self.strategy {
            query.push(("limit".into(), limit.to_string()));
        }
        query
    }
}

/// Where a legacy view listing is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewParent<'a> {
    Space(&'a str),
    Folder(&'a str),
    List(&'a str),
}

/// Builds [`PageRequest`]s against configured base URLs.
#[derive(Debug, Clone)]
pub struct ClickUpEndpoints {
    v2: String,
    v3: String,
    page_limit: u32,
}

impl ClickUpEndpoints {
    #[must_use]
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            v2: config.base_url_v2.trim_end_matches('/').to_string(),
            v3: config.base_url_v3.trim_end_matches('/').to_string(),
            page_limit: config.page_limit,
        }
    }

    fn single(resource: String, url: String, query: Query, key: &'static [&'static str]) -> PageRequest {
        PageRequest {
            resource,
            url,
            query,
            items_keys: key,
            strategy: PageStrategy::Single,
        }
    }

    fn not_archived() -> Query {
        vec![("archived".into(), "false".into())]
    }

    /// Workspaces the token can access.
    #[must_use]
    pub fn teams(&self) -> PageRequest {
        Self::single(
            "workspaces".into(),
            format!("{}/team", self.v2),
            Vec::new(),
            &["teams"],
        )
    }

    /// Single workspace with its member list (`{"team": {"members": [...]}}`).
    #[must_use]
    pub fn team_url(&self, team_id: &str) -> String {
        format!("{}/team/{team_id}", self.v2)
    }

    #[must_use]
    pub fn spaces(&self, team_id: &str) -> PageRequest {
        Self::single(
            format!("spaces of workspace {team_id}"),
            format!("{}/team/{team_id}/space", self.v2),
            Self::not_archived(),
            &["spaces"],
        )
    }

    #[must_use]
    pub fn folders(&self, space_id: &str) -> PageRequest {
        Self::single(
            format!("folders of space {space_id}"),
            format!("{}/space/{space_id}/folder", self.v2),
            Self::not_archived(),
            &["folders"],
        )
    }

    #[must_use]
    pub fn folder_lists(&self, folder_id: &str) -> PageRequest {
        Self::single(
            format!("lists of folder {folder_id}"),
            format!("{}/folder/{folder_id}/list", self.v2),
            Self::not_archived(),
            &["lists"],
        )
    }

    #[must_use]
    pub fn folderless_lists(&self, space_id: &str) -> PageRequest {
        Self::single(
            format!("folderless lists of space {space_id}"),
            format!("{}/space/{space_id}/list", self.v2),
            Self::not_archived(),
            &["lists"],
        )
    }

    #[must_use]
    pub fn views(&self, parent: ViewParent<'_>) -> PageRequest {
        let (segment, id) = match parent {
            ViewParent::Space(id) => ("space", id),
            ViewParent::Folder(id) => ("folder", id),
            ViewParent::List(id) => ("list", id),
        };
        Self::single(
            format!("views of {segment} {id}"),
            format!("{}/{segment}/{id}/view", self.v2),
            Vec::new(),
            &["views"],
        )
    }

    /// Comments of a legacy chat view.
    #[must_use]
    pub fn view_comments(&self, view_id: &str, view_name: &str) -> PageRequest {
        PageRequest {
            resource: format!("comments of chat view {view_name}"),
            url: format!("{}/view/{view_id}/comment", self.v2),
            query: Vec::new(),
            items_keys: &["comments"],
            strategy: PageStrategy::Keyset {
                page_size: COMMENT_PAGE_SIZE,
            },
        }
    }

    /// Followed channels plus all DMs and group DMs.
    #[must_use]
    pub fn channels(&self, workspace_id: &str, include_closed: bool) -> PageRequest {
        PageRequest {
            resource: format!("channels (include_closed={include_closed})"),
            url: format!("{}/workspaces/{workspace_id}/chat/channels", self.v3),
            query: vec![
                ("is_follower".into(), "true".into()),
                ("include_closed".into(), include_closed.to_string()),
            ],
            items_keys: &["data"],
            strategy: PageStrategy::Cursor {
                limit: self.page_limit,
            },
        }
    }

    #[must_use]
    pub fn messages(&self, workspace_id: &str, channel_id: &str, channel_name: &str) -> PageRequest {
        PageRequest {
            resource: format!("messages of {channel_name}"),
            url: format!(
                "{}/workspaces/{workspace_id}/chat/channels/{channel_id}/messages",
                self.v3
            ),
            query: Vec::new(),
            items_keys: &["data", "messages"],
            strategy: PageStrategy::Cursor {
                limit: self.page_limit,
            },
        }
    }

    #[must_use]
    pub fn replies(&self, workspace_id: &str, channel_id: &str, message_id: &str) -> PageRequest {
        PageRequest {
            resource: format!("replies to message {message_id}"),
            url: format!(
                "{}/workspaces/{workspace_id}/chat/channels/{channel_id}/messages/{message_id}/replies",
                self.v3
            ),
            query: Vec::new(),
            items_keys: &["data", "replies"],
            strategy: PageStrategy::Cursor {
                limit: self.page_limit,
            },
        }
    }
}
