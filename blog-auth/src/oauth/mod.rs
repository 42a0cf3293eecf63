//! OAuth 2.0 authentication infrastructure.
//!
//! Provides the authorization code flow with PKCE for blog platforms.

mod client;
mod pkce;
mod provider;
mod state;

pub mod providers;
pub mod token;

pub use client::{AuthorizeParams, Client};
pub use pkce::{PkceChallenge, PkceVerifier, CHALLENGE_METHOD};
pub use provider::{ClientCredentials, ProviderEndpoints, ProviderKind};
pub use state::PendingAuthorization;
