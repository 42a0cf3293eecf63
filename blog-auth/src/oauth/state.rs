//! CSRF state for a single authorization attempt.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::pkce::PkceVerifier;
use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Everything generated locally for one authorize round trip.
///
/// Created before the browser is opened and consumed by the redirect capture. The
/// verifier never leaves this struct except as the `code_verifier` of the exchange.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    state: String,
    verifier: PkceVerifier,
    redirect_uri: String,
    expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    /// Start a new attempt with a default TTL of 10 minutes.
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self::with_ttl(redirect_uri, Duration::minutes(10))
    }

    pub fn with_ttl(redirect_uri: impl Into<String>, ttl: Duration) -> Self {
        Self {
            state: generate_token(),
            verifier: PkceVerifier::generate(),
            redirect_uri: redirect_uri.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn verifier(&self) -> &PkceVerifier {
        &self.verifier
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Check the `state` echoed back by the provider.
    ///
    /// A missing, different or late state is an `InvalidState` error.
    pub fn validate(&self, returned: Option<&str>) -> Result<(), Error> {
        match returned {
            Some(state) if state == self.state => {
                if Utc::now() > self.expires_at {
                    return Err(oauth_error(
                        OAuthErrorKind::InvalidState,
                        "Authorization attempt expired",
                    ));
                }
                Ok(())
            }
            Some(_) => Err(oauth_error(
                OAuthErrorKind::InvalidState,
                "State parameter does not match",
            )),
            None => Err(oauth_error(
                OAuthErrorKind::InvalidState,
                "State parameter is missing",
            )),
        }
    }
}

/// Generate a cryptographically random state token.
fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_generate_state() {
        let pending = PendingAuthorization::new("http://127.0.0.1:8080/");
        assert_eq!(pending.state().len(), 64); // 32 bytes hex encoded
        assert_eq!(pending.redirect_uri(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_validate_matching_state() {
        let pending = PendingAuthorization::new("http://127.0.0.1/");
        let state = pending.state().to_string();
        assert!(pending.validate(Some(&state)).is_ok());
    }

    #[test]
    fn test_validate_mismatched_state() {
        let pending = PendingAuthorization::new("http://127.0.0.1/");
        let err = pending.validate(Some("forged")).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidState));
    }

    #[test]
    fn test_validate_missing_state() {
        let pending = PendingAuthorization::new("http://127.0.0.1/");
        assert!(pending.validate(None).is_err());
    }

    #[test]
    fn test_expired_state() {
        let pending = PendingAuthorization::with_ttl("http://127.0.0.1/", Duration::seconds(-1));
        let state = pending.state().to_string();
        assert!(pending.validate(Some(&state)).is_err());
    }
}
