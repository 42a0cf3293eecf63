//! Error types for the `domain` layer.
use blog_auth::error::{
    Error as BlogAuthError, ErrorKind as BlogAuthErrorKind, OAuthErrorKind, TokenErrorKind,
};
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `blog-auth`, and the binary is dependent
/// on `domain`, but the binary should not need to match on `blog-auth` error kinds.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// Something is missing from settings or from the command. Raised before any
    /// network call is made.
    Config(ConfigErrorKind),
    Auth(AuthErrorKind),
    Publish(PublishErrorKind),
    /// The host (vault, prompts, settings file) failed.
    Host(String),
    External(ExternalErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    MissingEndpoint,
    MissingBlogId,
    MissingCredentials,
    ProfileNotFound,
    DuplicateProfile,
    NoDefaultProfile,
    NoProfiles,
    NoActiveNote,
}

#[derive(Debug, PartialEq)]
pub enum AuthErrorKind {
    /// The profile holds no token, or the token can no longer be refreshed.
    NotAuthorized,
    /// The redirect's `state` did not match this attempt.
    StateMismatch,
    /// The provider answered the authorize step with an `error`.
    Rejected,
    Redirect,
    Other,
}

#[derive(Debug, PartialEq)]
pub enum PublishErrorKind {
    /// The user dismissed a dialog.
    Cancelled,
    /// The platform answered with an error result.
    Rejected {
        code: String,
        message: String,
        response: Option<Value>,
    },
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// A response did not have the expected shape.
    Parse,
    Other(String),
}

impl Error {
    /// True when the user has to run the authorize flow again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::Auth(AuthErrorKind::NotAuthorized)
                | DomainErrorKind::Auth(AuthErrorKind::Rejected)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            DomainErrorKind::Publish(PublishErrorKind::Rejected { code, message, .. }) => {
                write!(f, "Publish failed ({code}): {message}")?
            }
            DomainErrorKind::Publish(PublishErrorKind::Cancelled) => write!(f, "Cancelled")?,
            DomainErrorKind::Host(message) => write!(f, "Host error: {message}")?,
            kind => write!(f, "Domain Error: {kind:?}")?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
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
        // Errors that result from issues building the request. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Failed to build request".to_string(),
                )),
            }
        } else if err.is_decode() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Parse),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            other => Error {
                source: Some(Box::new(other)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Parse),
        }
    }
}

// This is where we translate errors from the `blog-auth` layer to the `domain` layer.
impl From<BlogAuthError> for Error {
    fn from(err: BlogAuthError) -> Self {
        let error_kind = match &err.error_kind {
            BlogAuthErrorKind::OAuth(OAuthErrorKind::AuthorizationFailed) => {
                DomainErrorKind::Auth(AuthErrorKind::Rejected)
            }
            _ if err.requires_reauthorization() => {
                DomainErrorKind::Auth(AuthErrorKind::NotAuthorized)
            }
            BlogAuthErrorKind::OAuth(OAuthErrorKind::InvalidState) => {
                DomainErrorKind::Auth(AuthErrorKind::StateMismatch)
            }
            BlogAuthErrorKind::OAuth(OAuthErrorKind::Network) | BlogAuthErrorKind::Http(_) => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            BlogAuthErrorKind::OAuth(OAuthErrorKind::InvalidResponse) => {
                DomainErrorKind::External(ExternalErrorKind::Parse)
            }
            BlogAuthErrorKind::OAuth(_) => DomainErrorKind::Auth(AuthErrorKind::Other),
            BlogAuthErrorKind::Token(TokenErrorKind::Storage) => {
                DomainErrorKind::Host(err.to_string())
            }
            BlogAuthErrorKind::Token(_) => DomainErrorKind::Auth(AuthErrorKind::NotAuthorized),
            BlogAuthErrorKind::Redirect(_) => DomainErrorKind::Auth(AuthErrorKind::Redirect),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Config(kind),
    }
}

/// Helper function to create authorization errors.
pub fn auth_error(kind: AuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Auth(kind),
    }
}

/// Helper function to create host errors.
pub fn host_error(message: impl Into<String>) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Host(message.into()),
    }
}

/// Helper function to create errors for responses that could not be understood.
pub fn parse_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::External(ExternalErrorKind::Parse),
    }
}

/// The platform rejected a publish.
pub fn rejected(code: String, message: String, response: Option<Value>) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Publish(PublishErrorKind::Rejected {
            code,
            message,
            response,
        }),
    }
}

pub fn cancelled() -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Publish(PublishErrorKind::Cancelled),
    }
}
