//! # blog-auth
//!
//! Authentication for blog publishing targets:
//! - OAuth 2.0 authorization-code flow with PKCE (Google / Blogger, WordPress.com)
//! - Token freshness checks, refresh and a per-profile refresh manager
//! - Redirect capture, either through a loopback listener or a custom URI scheme handler
//! - HTTP client building with middleware
//!
//! ## Architecture
//!
//! This crate knows nothing about notes or posts. The `domain` crate drives it:
//! it persists tokens through [`oauth::token::Storage`] and obtains every
//! `Authorization` header through [`oauth::token::Manager::fresh_token`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blog_auth::{
//!     oauth::{Client, ProviderKind, token::{Manager, Storage}},
//!     oauth::PendingAuthorization,
//!     redirect::{LoopbackListener, ProtocolHandler},
//!     http::AuthenticatedClientBuilder,
//! };
//! ```

pub mod browser;
pub mod error;
pub mod http;
pub mod oauth;
pub mod redirect;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
