//! HTTP client building with middleware.

mod client;
mod retry;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig};
pub use retry::BackoffPolicy;

/// User agent sent with every request to the blog platforms.
pub const USER_AGENT: &str = "obsidian.md";
