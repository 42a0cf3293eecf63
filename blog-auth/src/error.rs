//! Error types for the `blog-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for blog-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in blog-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    Token(TokenErrorKind),
    Redirect(RedirectErrorKind),
    Http(HttpErrorKind),
}

/// Errors from OAuth operations.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    /// The provider redirected back with an `error` parameter.
    AuthorizationFailed,
    TokenExchangeFailed,
    TokenRefreshFailed,
    /// The `state` returned by the provider does not match the one we sent.
    InvalidState,
    /// A token came back from the provider already past its computed expiry.
    InvalidToken,
    /// The redirect carried neither `code` nor `error`.
    MissingCode,
    ValidationFailed,
    BrowserLaunch,
    Network,
    InvalidResponse,
}

/// Errors from token management operations.
#[derive(Debug, PartialEq)]
pub enum TokenErrorKind {
    NotFound,
    Refresh,
    Storage,
}

/// Errors from redirect capture.
#[derive(Debug, PartialEq)]
pub enum RedirectErrorKind {
    Bind,
    AddressUnavailable,
    MalformedRequest,
    TimedOut,
    /// The completion latch was dropped before a redirect arrived.
    Closed,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl Error {
    /// Returns true for errors that mean the user must authorize again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::AuthorizationFailed)
                | ErrorKind::OAuth(OAuthErrorKind::MissingCode)
                | ErrorKind::OAuth(OAuthErrorKind::InvalidToken)
                | ErrorKind::Token(TokenErrorKind::NotFound)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind)?,
            ErrorKind::Token(kind) => write!(f, "Token error: {:?}", kind)?,
            ErrorKind::Redirect(kind) => write!(f, "Redirect error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Http(HttpErrorKind::Network),
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create token errors.
pub fn token_error(kind: TokenErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Token(kind),
    }
}

/// Helper function to create storage errors.
pub fn storage_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Token(TokenErrorKind::Storage),
    }
}

/// Helper function to create redirect errors.
pub fn redirect_error(kind: RedirectErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Redirect(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_source_message() {
        let err = oauth_error(OAuthErrorKind::InvalidState, "state mismatch");
        assert_eq!(err.to_string(), "OAuth error: InvalidState (state mismatch)");
    }

    #[test]
    fn test_requires_reauthorization() {
        assert!(oauth_error(OAuthErrorKind::AuthorizationFailed, "denied").requires_reauthorization());
        assert!(token_error(TokenErrorKind::NotFound, "none").requires_reauthorization());
        assert!(!oauth_error(OAuthErrorKind::Network, "down").requires_reauthorization());
    }
}
