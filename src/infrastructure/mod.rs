//! Infrastructure layer - external adapters (HTTP, filesystem config).
//!
//! This layer handles all network I/O and external dependencies.

pub mod clickup;
pub mod config;
pub mod http;
#[cfg(test)]
pub mod testing;

pub use clickup::{ClickUpEndpoints, PageRequest, PageStrategy, ViewParent};
pub use config::{ensure_config_exists, load_config, resolve_token};
pub use http::{ApiClient, Query, ReqwestTransport, Transport};
#[cfg(test)]
pub use http::HttpResponse;
