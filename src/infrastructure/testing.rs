//! In-memory transport for tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::http::{HttpResponse, Query, Transport};
use crate::domain::{ApiConfig, Result};

/// API config with no pacing or backoff delays.
pub fn fast_config() -> ApiConfig {
    ApiConfig {
        base_url_v2: "https://api.test/v2".into(),
        base_url_v3: "https://api.test/v3".into(),
        request_delay_ms: 0,
        backoff_base_ms: 0,
        max_backoff_ms: 0,
        page_limit: 100,
        ..ApiConfig::default()
    }
}

struct Route {
    url: String,
    query: Query,
    responses: VecDeque<HttpResponse>,
}

/// Answers requests from scripted routes and records every call.
///
/// A route matches when the URL is equal and every scripted query pair is
/// present. Responses queued on a route are served in order; the last one
/// repeats. Unmatched requests get a 404.
#[derive(Default)]
pub struct FixtureTransport {
    routes: RefCell<Vec<Route>>,
    calls: RefCell<Vec<(String, Query)>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for `url` with the given query pairs.
    pub fn respond(self, url: &str, query: &[(&str, &str)], response: HttpResponse) -> Self {
        let query: Query = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        {
            let mut routes = self.routes.borrow_mut();
            match routes.iter_mut().find(|r| r.url == url && r.query == query) {
                Some(route) => route.responses.push_back(response),
                None => routes.push(Route {
                    url: url.to_string(),
                    query,
                    responses: VecDeque::from([response]),
                }),
            }
        }
        self
    }

    /// Queues a 200 JSON response.
    pub fn json(self, url: &str, query: &[(&str, &str)], body: &serde_json::Value) -> Self {
        self.respond(url, query, HttpResponse::ok(body.to_string()))
    }

    /// Every request made so far.
    pub fn calls(&self) -> Vec<(String, Query)> {
        self.calls.borrow().clone()
    }

    /// Number of requests whose URL contains `fragment`.
    pub fn count_calls(&self, fragment: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(url, _)| url.contains(fragment))
            .count()
    }
}

impl Transport for FixtureTransport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        self.calls
            .borrow_mut()
            .push((url.to_string(), query.to_vec()));

        let mut routes = self.routes.borrow_mut();
        // Most specific route first, so a cursor route beats the bare first-page route.
        let route = routes
            .iter_mut()
            .filter(|r| r.url == url && r.query.iter().all(|pair| query.contains(pair)))
            .max_by_key(|r| r.query.len());

        let response = match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front(),
            Some(route) => route.responses.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| HttpResponse::status(404)))
    }
}
