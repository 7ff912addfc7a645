//! Pagination walker.
//!
//! [`PageWalker`] lazily yields item batches of one collection;
//! [`WalkOutcome`] accumulates them, de-duplicating by id and keeping
//! partial results when the walk ends on an error.

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::{AppError, CaptureIssue, Result};
use crate::infrastructure::{ApiClient, PageRequest, PageStrategy, Query, Transport};

use super::parser::value_id;

/// Lazy sequence of item batches for one [`PageRequest`].
///
/// Finite and not restartable: once it returns `None` it stays exhausted.
/// Retries happen inside the client, so a rate-limited page is re-requested
/// with the same cursor.
pub struct PageWalker<'a, T> {
    client: &'a ApiClient<T>,
    request: PageRequest,
    next_query: Option<Query>,
    pages: usize,
}

impl<'a, T: Transport> PageWalker<'a, T> {
    #[must_use]
    pub fn new(client: &'a ApiClient<T>, request: PageRequest) -> Self {
        let next_query = Some(request.first_query());
        Self {
            client,
            request,
            next_query,
            pages: 0,
        }
    }

    /// Pages fetched so far.
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }
}

impl<T: Transport> Iterator for PageWalker<'_, T> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let query = self.next_query.take()?;

        // On error next_query stays None, which ends the walk.
        let body = match self.client.get_json(&self.request.url, &query) {
            Ok(body) => body,
            Err(err) => return Some(Err(err)),
        };
        self.pages += 1;

        let items = extract_items(&body, self.request.items_keys);
        self.next_query = next_query(&self.request, &body, items.as_ref().ok().map(Vec::as_slice));

        match items {
            Ok(items) => {
                tracing::debug!(
                    resource = %self.request.resource,
                    page = self.pages,
                    items = items.len(),
                    "Fetched page"
                );
                Some(Ok(items))
            }
            Err(message) => Some(Err(AppError::MalformedResponse {
                message: format!("{} page {}: {message}", self.request.resource, self.pages),
            })),
        }
    }
}

/// Items of a page. A body without any of `keys` is an empty page.
fn extract_items(body: &Value, keys: &[&str]) -> std::result::Result<Vec<Value>, String> {
    if !body.is_object() {
        return Err("response is not a JSON object".into());
    }
    match keys.iter().find_map(|k| body.get(*k).filter(|v| !v.is_null())) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(format!("`{}` is not an array", keys.join("` or `"))),
    }
}

/// Query of the page after `body`, or `None` when `body` was the last.
///
/// `items` is `None` when the page was malformed; a cursor can still be
/// followed then, a keyset cannot.
fn next_query(request: &PageRequest, body: &Value, items: Option<&[Value]>) -> Option<Query> {
    match request.strategy {
        PageStrategy::Single => None,
        PageStrategy::Cursor { limit } => {
            if items.is_some_and(<[Value]>::is_empty) {
                return None;
            }
            let cursor = body
                .get("next_cursor")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())?;
            let mut query = request.query.clone();
            query.push(("limit".into(), limit.to_string()));
            query.push(("cursor".into(), cursor.to_string()));
            Some(query)
        }
        PageStrategy::Keyset { page_size } => {
            let items = items?;
            if items.len() < page_size {
                return None;
            }
            let last = items.last()?;
            let start = last.get("date").and_then(value_id)?;
            let start_id = last.get("id").and_then(value_id)?;
            let mut query = request.query.clone();
            query.push(("start".into(), start));
            query.push(("start_id".into(), start_id));
            Some(query)
        }
    }
}

/// Items gathered by one or more walks.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Unique items in first-seen order.
    pub items: Vec<Value>,
    /// Error that ended the walk early, if any.
    pub error: Option<AppError>,
    /// Skipped malformed pages.
    pub warnings: Vec<String>,
    seen: HashSet<String>,
}

impl WalkOutcome {
    /// Drains `pages` into a fresh outcome.
    pub fn collect(pages: impl IntoIterator<Item = Result<Vec<Value>>>) -> Self {
        let mut outcome = Self::default();
        outcome.extend_from(pages);
        outcome
    }

    /// Drains `pages`, merging items into this outcome.
    ///
    /// Malformed pages are skipped with a warning; any other error stops
    /// this walk and is kept (the first error wins).
    pub fn extend_from(&mut self, pages: impl IntoIterator<Item = Result<Vec<Value>>>) {
        for page in pages {
            match page {
                Ok(items) => self.push_items(items),
                Err(AppError::MalformedResponse { message }) => {
                    tracing::warn!("Skipping malformed page: {message}");
                    self.warnings.push(message);
                }
                Err(err) => {
                    if self.error.is_none() {
                        self.error = Some(err);
                    }
                    break;
                }
            }
        }
    }

    fn push_items(&mut self, items: Vec<Value>) {
        for item in items {
            match item.get("id").and_then(value_id) {
                Some(id) => {
                    if self.seen.insert(id) {
                        self.items.push(item);
                    }
                }
                None => self.items.push(item),
            }
        }
    }

    /// Whether the walk ran to exhaustion without skipping pages.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.warnings.is_empty()
    }

    /// Returns the items, recording any problems as capture issues.
    ///
    /// # Errors
    /// Propagates an error that invalidates the whole run (rejected token).
    pub fn settle(self, resource: &str, issues: &mut Vec<CaptureIssue>) -> Result<Vec<Value>> {
        for warning in self.warnings {
            issues.push(CaptureIssue {
                resource: resource.to_string(),
                error: warning,
            });
        }
        if let Some(err) = self.error {
            if err.aborts_run() {
                return Err(err);
            }
            tracing::warn!(
                resource,
                kept = self.items.len(),
                "Walk stopped early: {err}"
            );
            issues.push(CaptureIssue {
                resource: resource.to_string(),
                error: err.to_string(),
            });
        }
        Ok(self.items)
    }
}

/// Walks `request` to exhaustion.
pub fn walk<T: Transport>(client: &ApiClient<T>, request: PageRequest) -> WalkOutcome {
    let resource = request.resource.clone();
    let mut walker = PageWalker::new(client, request);
    let outcome = WalkOutcome::collect(walker.by_ref());
    tracing::debug!(
        %resource,
        pages = walker.pages(),
        items = outcome.items.len(),
        complete = outcome.is_complete(),
        "Walk finished"
    );
    outcome
}
