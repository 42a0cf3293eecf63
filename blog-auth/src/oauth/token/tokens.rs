//! OAuth token types.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Seconds subtracted from `expires_in` to absorb clock skew and request latency.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when a provider omits `expires_in` (WordPress.com issues
/// non-expiring tokens).
const NON_EXPIRING_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Some providers send `expires_in` as a string.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// A provider-issued token together with its computed absolute expiry.
///
/// Tokens are never mutated in place: a refresh produces a new value that replaces
/// the stored one. The access token is private so that the only way to read it is
/// through a [`FreshToken`].
#[derive(Debug, Clone)]
pub struct InternalToken {
    access_token: SecretString,
    pub token_type: String,
    pub expires_in: i64,
    refresh_token: Option<SecretString>,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

/// Unprotected copy of a token for persistence layers.
#[derive(Debug, Clone, PartialEq)]
pub struct PlainToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

impl InternalToken {
    /// Build a token from an endpoint response.
    ///
    /// `requested_at` is the instant the token request was sent, so latency eats into
    /// the margin rather than extending the token. When the response carries no refresh
    /// token, `previous_refresh` is kept.
    pub fn from_response(
        response: TokenResponse,
        requested_at: DateTime<Utc>,
        previous_refresh: Option<SecretString>,
    ) -> Self {
        let expires_in = response.expires_in.unwrap_or(NON_EXPIRING_SECS);
        let lifetime = (expires_in - EXPIRY_MARGIN_SECS).max(0);
        Self {
            access_token: SecretString::new(response.access_token),
            token_type: response.token_type,
            expires_in,
            refresh_token: response.refresh_token.map(SecretString::new).or(previous_refresh),
            scope: response.scope.unwrap_or_default(),
            expires_at: requested_at + Duration::seconds(lifetime),
        }
    }

    pub fn from_plain(plain: PlainToken) -> Self {
        Self {
            access_token: SecretString::new(plain.access_token),
            token_type: plain.token_type,
            expires_in: plain.expires_in,
            refresh_token: plain.refresh_token.map(SecretString::new),
            scope: plain.scope,
            expires_at: plain.expires_at,
        }
    }

    pub fn to_plain(&self) -> PlainToken {
        PlainToken {
            access_token: self.access_token.expose_secret().clone(),
            token_type: self.token_type.clone(),
            expires_in: self.expires_in,
            refresh_token: self
                .refresh_token
                .as_ref()
                .map(|token| token.expose_secret().clone()),
            scope: self.scope.clone(),
            expires_at: self.expires_at,
        }
    }

    /// True iff the computed expiry is still in the future.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }
}

impl PartialEq for InternalToken {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.expires_at == other.expires_at
            && self.refresh_token.as_ref().map(|t| t.expose_secret())
                == other.refresh_token.as_ref().map(|t| t.expose_secret())
    }
}

/// A token that passed the freshness check.
///
/// Only obtainable through `TryFrom<InternalToken>` (which runs the check) or from
/// the OAuth client. Holders must obtain one right before a request and never keep
/// it across later awaits as "still fresh".
#[derive(Debug, Clone, PartialEq)]
pub struct FreshToken(InternalToken);

impl FreshToken {
    pub fn access_token(&self) -> &SecretString {
        &self.0.access_token
    }

    pub fn token(&self) -> &InternalToken {
        &self.0
    }

    pub fn into_inner(self) -> InternalToken {
        self.0
    }

    /// `Authorization` header value, marked sensitive so it never shows up in debug output.
    pub fn authorization_header(&self) -> Result<HeaderValue, Error> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", self.0.access_token.expose_secret()))
                .map_err(|_| {
                    oauth_error(
                        OAuthErrorKind::InvalidToken,
                        "Access token is not a valid header value",
                    )
                })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl TryFrom<InternalToken> for FreshToken {
    /// The stale token is handed back so the caller can refresh it.
    type Error = InternalToken;

    fn try_from(token: InternalToken) -> Result<Self, Self::Error> {
        if token.is_fresh() {
            Ok(FreshToken(token))
        } else {
            Err(token)
        }
    }
}
