//! Blocking HTTP access to the ClickUp API with rate-limit handling.
//!
//! [`Transport`] performs a single GET; [`ApiClient`] layers pacing,
//! retry with backoff and JSON decoding on top of it.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde_json::Value;

use crate::domain::{ApiConfig, AppError, Result};

/// Query string as ordered key/value pairs.
pub type Query = Vec<(String, String)>;

/// Raw response of a single GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Retry-After` header in seconds, when the server sent one.
    pub retry_after: Option<u64>,
    /// Response body.
    pub body: String,
}

#[cfg(test)]
impl HttpResponse {
    /// A 200 response carrying `body`.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    /// A bodyless response with the given status.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }
}

/// Performs one GET request. Implementations must not retry.
pub trait Transport {
    /// Sends `GET url?query`.
    ///
    /// # Errors
    /// Returns [`AppError::Http`] when no response was received.
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        (**self).get(url, query)
    }
}

/// `reqwest` transport authenticated with a personal API token.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client sending `Authorization: <token>` on every request.
    ///
    /// # Errors
    /// Returns error if the token is not a valid header value or the client
    /// cannot be built.
    pub fn new(token: &str, config: &ApiConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(token).map_err(|_| AppError::Config {
            message: "API token contains characters not allowed in a header".into(),
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::http)?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(AppError::http)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().map_err(AppError::http)?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// What to do with the outcome of one attempt.
#[derive(Debug)]
enum RetryDecision {
    /// Successful response body.
    Done(String),
    /// Retry after the server-suggested wait, or the computed backoff.
    Retry {
        reason: String,
        wait: Option<Duration>,
    },
    /// Give up immediately.
    Fatal(AppError),
}

/// Classifies one attempt.
fn classify(outcome: Result<HttpResponse>) -> RetryDecision {
    let response = match outcome {
        Ok(response) => response,
        Err(err @ AppError::Http { .. }) => {
            return RetryDecision::Retry {
                reason: err.to_string(),
                wait: None,
            }
        }
        Err(err) => return RetryDecision::Fatal(err),
    };

    match response.status {
        200..=299 => RetryDecision::Done(response.body),
        429 => RetryDecision::Retry {
            reason: "rate limited (429)".into(),
            wait: response.retry_after.map(Duration::from_secs),
        },
        401 | 403 => RetryDecision::Fatal(AppError::Unauthorized {
            status: response.status,
            message: if response.status == 401 {
                "invalid API token, check CLICKUP_API_TOKEN".into()
            } else {
                snippet(&response.body)
            },
        }),
        500..=599 => RetryDecision::Retry {
            reason: format!("server error {}", response.status),
            wait: None,
        },
        status => RetryDecision::Fatal(AppError::Api {
            status,
            body: snippet(&response.body),
        }),
    }
}

/// First 200 characters of a body, for error messages.
fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Paced, retrying JSON client. One request in flight at a time.
pub struct ApiClient<T> {
    transport: T,
    config: ApiConfig,
}

impl<T: Transport> ApiClient<T> {
    /// Create a new client.
    #[must_use]
    pub const fn new(transport: T, config: ApiConfig) -> Self {
        Self { transport, config }
    }

    /// API configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// GETs `url` and decodes the body as JSON.
    ///
    /// Rate limits, 5xx and connection failures are retried up to
    /// `max_retries` times; the same request is repeated each time.
    ///
    /// # Errors
    /// - [`AppError::Unauthorized`] on 401/403, without retrying.
    /// - [`AppError::Api`] on any other non-success status.
    /// - [`AppError::RetriesExhausted`] when transient failures persist.
    /// - [`AppError::MalformedResponse`] when the body is not JSON.
    pub fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        let mut retries = 0u32;

        loop {
            pause(self.config.request_delay());

            let (reason, wait) = match classify(self.transport.get(url, query)) {
                RetryDecision::Done(body) => {
                    return serde_json::from_str(&body).map_err(|e| AppError::MalformedResponse {
                        message: format!("{url}: {e}"),
                    });
                }
                RetryDecision::Fatal(err) => return Err(err),
                RetryDecision::Retry { reason, wait } => (reason, wait),
            };

            if retries >= self.config.max_retries {
                return Err(AppError::RetriesExhausted {
                    attempts: retries,
                    last_error: reason,
                });
            }
            retries += 1;

            let delay = wait.unwrap_or_else(|| self.config.backoff(retries));
            tracing::warn!(
                url,
                attempt = retries,
                max = self.config.max_retries,
                wait_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "{reason}, retrying"
            );
            pause(delay);
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
