//! HTTP client builder for blog platform REST calls.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::{BackoffPolicy, USER_AGENT};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of retries of read requests.
    pub max_retries: u32,
    /// First backoff delay, doubled on every retry.
    pub base_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// HTTP client with middleware. The bearer header is attached per request from a
/// freshly checked token, never baked into the client.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for REST clients.
///
/// Produces two flavours: a retrying client for idempotent reads (taxonomy lookups,
/// blog discovery) and a single-attempt client for publish and media upload, which
/// must not be replayed.
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    pub fn with_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.config.base_delay = base_delay;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Build a client that retries transient failures with exponential backoff.
    pub fn build(&self) -> Result<AuthenticatedClient, reqwest::Error> {
        let policy = BackoffPolicy::new(self.config.max_retries)
            .with_base_delay(self.config.base_delay)
            .with_total_budget(self.config.timeout * (self.config.max_retries + 1));
        let client = ClientBuilder::new(self.base_client()?)
            .with(RetryTransientMiddleware::new_with_policy(policy))
            .build();
        Ok(client)
    }

    /// Build a client that sends every request exactly once.
    pub fn build_single_attempt(&self) -> Result<AuthenticatedClient, reqwest::Error> {
        Ok(ClientBuilder::new(self.base_client()?).build())
    }

    fn base_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
