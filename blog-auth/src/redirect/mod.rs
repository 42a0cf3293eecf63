//! Capture of the provider's redirect back to this application.
//!
//! Two strategies exist because not every host can open a local port:
//! [`LoopbackListener`] binds `127.0.0.1:0` and serves exactly one request, while
//! [`ProtocolHandler`] receives redirects through a custom URI scheme and acts on
//! the first delivery only.
//!
//! Both hand the query parameters to [`complete_authorization`], which checks them
//! against the [`PendingAuthorization`] and performs the code exchange.

mod loopback;
mod protocol;

use std::collections::HashMap;

use tracing::{debug, warn};
use url::Url;

use crate::error::{oauth_error, redirect_error, Error, OAuthErrorKind, RedirectErrorKind};
use crate::oauth::token::FreshToken;
use crate::oauth::{Client, PendingAuthorization};

pub use loopback::LoopbackListener;
pub use protocol::{HandleOutcome, PendingRedirect, ProtocolHandler};

/// Query parameters of an OAuth redirect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl RedirectParams {
    /// Extract the parameters from a full redirect URL.
    pub fn from_url(url: &Url) -> Self {
        let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        Self {
            code: params.remove("code"),
            state: params.remove("state"),
            error: params.remove("error"),
            error_description: params.remove("error_description"),
        }
    }

    pub fn parse(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| {
            redirect_error(
                RedirectErrorKind::MalformedRequest,
                &format!("Invalid redirect URL: {}", e),
            )
        })?;
        Ok(Self::from_url(&url))
    }
}

/// Turn a captured redirect into a token.
///
/// Checked in order: a provider `error` fails with `AuthorizationFailed`, a state
/// mismatch fails with `InvalidState` before any exchange (even when a code is
/// present), a code is exchanged, and anything else fails with `MissingCode`.
pub async fn complete_authorization(
    client: &Client,
    pending: &PendingAuthorization,
    params: &RedirectParams,
) -> Result<FreshToken, Error> {
    if let Some(error) = &params.error {
        let description = params
            .error_description
            .as_deref()
            .map(|d| d.replace('+', " "))
            .unwrap_or_else(|| "<no error description>".to_string());
        warn!("Provider rejected authorization: {} ({})", error, description);
        return Err(oauth_error(
            OAuthErrorKind::AuthorizationFailed,
            &format!("{}: {}", error, description),
        ));
    }

    pending.validate(params.state.as_deref())?;

    match &params.code {
        Some(code) => {
            debug!("Authorization code received, exchanging");
            client
                .get_token(code, pending.redirect_uri(), pending.verifier())
                .await
        }
        None => Err(oauth_error(
            OAuthErrorKind::MissingCode,
            "Redirect carried neither a code nor an error",
        )),
    }
}
