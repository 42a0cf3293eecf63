//! OAuth 2.0 client: authorize URL, code exchange, refresh and validation.

use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::pkce::{PkceVerifier, CHALLENGE_METHOD};
use super::provider::{ClientCredentials, ProviderEndpoints, ProviderKind};
use super::state::PendingAuthorization;
use super::token::{FreshToken, InternalToken, TokenResponse};
use crate::browser::Browser;
use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::http::USER_AGENT;

/// Parameters of the browser authorize step.
#[derive(Debug, Clone)]
pub struct AuthorizeParams {
    pub redirect_uri: String,
    pub scope: Vec<String>,
    /// WordPress.com site hint, preselects the blog on the consent page.
    pub blog: Option<String>,
    pub code_verifier: PkceVerifier,
    pub state: String,
}

impl AuthorizeParams {
    /// Parameters for a pending attempt, using the provider's default scopes.
    pub fn for_pending(kind: ProviderKind, pending: &PendingAuthorization) -> Self {
        Self {
            redirect_uri: pending.redirect_uri().to_string(),
            scope: kind.default_scopes(),
            blog: None,
            code_verifier: pending.verifier().clone(),
            state: pending.state().to_string(),
        }
    }

    pub fn with_blog(mut self, blog: impl Into<String>) -> Self {
        self.blog = Some(blog.into());
        self
    }
}

/// Error body returned by token endpoints.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth 2.0 client bound to one provider and one registered application.
pub struct Client {
    kind: ProviderKind,
    credentials: ClientCredentials,
    endpoints: ProviderEndpoints,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a client with a default HTTP client (30 second timeout).
    pub fn new(
        kind: ProviderKind,
        credentials: ClientCredentials,
        endpoints: ProviderEndpoints,
    ) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_http_client(kind, credentials, endpoints, http_client))
    }

    pub fn with_http_client(
        kind: ProviderKind,
        credentials: ClientCredentials,
        endpoints: ProviderEndpoints,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            kind,
            credentials,
            endpoints,
            http_client,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Build the authorize URL the user is sent to.
    ///
    /// Only the S256 challenge of the verifier is included.
    pub fn authorization_url(&self, params: &AuthorizeParams) -> Result<Url, Error> {
        let mut url = Url::parse(&self.endpoints.authorize_url).map_err(|e| {
            oauth_error(
                OAuthErrorKind::AuthorizationFailed,
                &format!("Invalid authorize endpoint: {}", e),
            )
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.credentials.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &params.redirect_uri);
            if let Some(blog) = &params.blog {
                query.append_pair("blog", blog);
            }
            if !params.scope.is_empty() {
                query.append_pair("scope", &params.scope.join(" "));
            }
            query
                .append_pair("code_challenge", params.code_verifier.challenge().as_str())
                .append_pair("code_challenge_method", CHALLENGE_METHOD)
                .append_pair("state", &params.state);
        }
        Ok(url)
    }

    /// Open the authorize URL in the browser.
    ///
    /// The result arrives later through redirect capture.
    pub fn get_authorize_code(
        &self,
        browser: &dyn Browser,
        params: &AuthorizeParams,
    ) -> Result<(), Error> {
        let url = self.authorization_url(params)?;
        info!("Requesting {} authorization", self.kind.as_str());
        browser.open(url.as_str())
    }

    /// Exchange an authorization code for a token.
    ///
    /// The verifier (never the challenge) is the proof of possession.
    pub async fn get_token(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &PkceVerifier,
    ) -> Result<FreshToken, Error> {
        debug!("Exchanging authorization code with {}", self.kind.as_str());
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret().as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier.as_str()),
        ];
        let requested_at = Utc::now();
        let response = self
            .post_token_form(&form, OAuthErrorKind::TokenExchangeFailed)
            .await?;
        let token = InternalToken::from_response(response, requested_at, None);
        Self::check_fresh(token)
    }

    /// Obtain a new token with a refresh token.
    ///
    /// If the provider does not rotate the refresh token, the old one is kept.
    pub async fn refresh_token(&self, refresh_token: &SecretString) -> Result<FreshToken, Error> {
        debug!("Refreshing {} access token", self.kind.as_str());
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret().as_str()),
            ("refresh_token", refresh_token.expose_secret().as_str()),
        ];
        let requested_at = Utc::now();
        let response = self
            .post_token_form(&form, OAuthErrorKind::TokenRefreshFailed)
            .await?;
        let token = InternalToken::from_response(response, requested_at, Some(refresh_token.clone()));
        Self::check_fresh(token)
    }

    /// Return the token unchanged if fresh, otherwise refresh it.
    ///
    /// Every authenticated request goes through here.
    pub async fn ensure_fresh_token(&self, token: &InternalToken) -> Result<FreshToken, Error> {
        match FreshToken::try_from(token.clone()) {
            Ok(fresh) => Ok(fresh),
            Err(stale) => {
                let refresh_token = stale.refresh_token().ok_or_else(|| {
                    oauth_error(
                        OAuthErrorKind::InvalidToken,
                        "Token expired and no refresh token is available",
                    )
                })?;
                self.refresh_token(refresh_token).await
            }
        }
    }

    /// Ask the provider about a token. Diagnostic only.
    pub async fn validate_token(&self, token: &FreshToken) -> Result<serde_json::Value, Error> {
        let mut url = Url::parse(&self.endpoints.validate_url).map_err(|e| {
            oauth_error(
                OAuthErrorKind::ValidationFailed,
                &format!("Invalid validation endpoint: {}", e),
            )
        })?;
        {
            let mut query = url.query_pairs_mut();
            match self.kind {
                ProviderKind::Google => {
                    query.append_pair("access_token", token.access_token().expose_secret());
                }
                ProviderKind::WordPressCom => {
                    query
                        .append_pair("client_id", &self.credentials.client_id)
                        .append_pair("token", token.access_token().expose_secret());
                }
            }
        }

        let response = self.http_client.get(url).send().await.map_err(|e| {
            warn!("Token validation request failed: {:?}", e);
            oauth_error(OAuthErrorKind::Network, &format!("Validation request failed: {}", e))
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            oauth_error(OAuthErrorKind::Network, &format!("Failed to read response: {}", e))
        })?;
        if !status.is_success() {
            warn!("Token validation failed with status {}", status);
            return Err(oauth_error(
                OAuthErrorKind::ValidationFailed,
                &format!("Token validation failed ({}): {}", status, body),
            ));
        }
        serde_json::from_str(&body).map_err(|e| {
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("Failed to parse validation response: {}", e),
            )
        })
    }

    async fn post_token_form(
        &self,
        form: &[(&str, &str)],
        failure: OAuthErrorKind,
    ) -> Result<TokenResponse, Error> {
        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Token request to {} failed: {:?}", self.kind.as_str(), e);
                oauth_error(OAuthErrorKind::Network, &format!("Token request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token endpoint returned {}", status);
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                // A revoked or expired grant cannot be recovered by retrying.
                Ok(err) if err.error == "invalid_grant" => oauth_error(
                    OAuthErrorKind::InvalidToken,
                    &Self::describe(&err),
                ),
                Ok(err) => oauth_error(failure, &Self::describe(&err)),
                Err(_) => oauth_error(failure, &format!("Token endpoint returned {}: {}", status, body)),
            });
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            warn!("Failed to parse token response: {:?}", e);
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("Failed to parse token response: {}", e),
            )
        })
    }

    fn describe(err: &TokenErrorResponse) -> String {
        match &err.error_description {
            Some(description) => format!("{}: {}", err.error, description),
            None => err.error.clone(),
        }
    }

    fn check_fresh(token: InternalToken) -> Result<FreshToken, Error> {
        FreshToken::try_from(token).map_err(|_| {
            oauth_error(
                OAuthErrorKind::InvalidToken,
                "Provider returned a token that is already expired",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Duration as ChronoDuration;
    use mockito::{Matcher, Server};
    use std::sync::Mutex;

    fn client_for(server: &Server, kind: ProviderKind) -> Client {
        let endpoints = ProviderEndpoints {
            authorize_url: format!("{}/authorize", server.url()),
            token_url: format!("{}/token", server.url()),
            validate_url: format!("{}/tokeninfo", server.url()),
        };
        Client::new(kind, ClientCredentials::new("client-id", "client-secret"), endpoints).unwrap()
    }

    fn stale_token(refresh: Option<&str>) -> InternalToken {
        let response = TokenResponse {
            access_token: "stale-access".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: refresh.map(str::to_string),
            scope: None,
        };
        InternalToken::from_response(response, Utc::now() - ChronoDuration::hours(2), None)
    }

    struct RecordingBrowser(Mutex<Vec<String>>);

    impl Browser for RecordingBrowser {
        fn open(&self, url: &str) -> Result<(), Error> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_authorization_url_contains_pkce_and_state() {
        let server = Server::new_async().await;
        let client = client_for(&server, ProviderKind::WordPressCom);
        let verifier = PkceVerifier::from_string("verifier".to_string());
        let params = AuthorizeParams {
            redirect_uri: "http://127.0.0.1:4000/".to_string(),
            scope: vec!["a".to_string(), "b".to_string()],
            blog: None,
            code_verifier: verifier.clone(),
            state: "xyz".to_string(),
        }
        .with_blog("myblog.wordpress.com");

        let url = client.authorization_url(&params).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "client-id");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:4000/");
        assert_eq!(pairs["scope"], "a b");
        assert_eq!(pairs["blog"], "myblog.wordpress.com");
        assert_eq!(pairs["code_challenge"], verifier.challenge().as_str());
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["state"], "xyz");
        assert!(!url.as_str().contains("code_verifier"));
    }

    #[tokio::test]
    async fn test_get_authorize_code_opens_browser() {
        let server = Server::new_async().await;
        let client = client_for(&server, ProviderKind::Google);
        let pending = PendingAuthorization::new("http://127.0.0.1:1234/");
        let browser = RecordingBrowser(Mutex::new(Vec::new()));

        client
            .get_authorize_code(&browser, &AuthorizeParams::for_pending(ProviderKind::Google, &pending))
            .unwrap();

        let opened = browser.0.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].starts_with(&format!("{}/authorize?", server.url())));
        assert!(opened[0].contains(pending.state()));
    }

    #[tokio::test]
    async fn test_get_token_sends_verifier_and_returns_fresh_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
                Matcher::UrlEncoded("code_verifier".into(), "verifier".into()),
                Matcher::UrlEncoded("redirect_uri".into(), "http://127.0.0.1:9/".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"new-access","token_type":"Bearer","expires_in":3600,"refresh_token":"refresh","scope":"s"}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, ProviderKind::Google);
        let verifier = PkceVerifier::from_string("verifier".to_string());
        let token = client
            .get_token("the-code", "http://127.0.0.1:9/", &verifier)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(token.token().is_fresh());
        assert_eq!(token.access_token().expose_secret(), "new-access");
    }

    #[tokio::test]
    async fn test_get_token_rejects_already_expired_token() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"a","token_type":"Bearer","expires_in":60}"#)
            .create_async()
            .await;

        let client = client_for(&server, ProviderKind::Google);
        let verifier = PkceVerifier::generate();
        let err = client.get_token("c", "r", &verifier).await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidToken));
    }

    #[tokio::test]
    async fn test_get_token_provider_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_request","error_description":"bad"}"#)
            .create_async()
            .await;

        let client = client_for(&server, ProviderKind::Google);
        let err = client
            .get_token("c", "r", &PkceVerifier::generate())
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
    }

    #[tokio::test]
    async fn test_refresh_keeps_old_refresh_token_when_omitted() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "old-refresh".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"refreshed","token_type":"Bearer","expires_in":3600}"#)
            .create_async()
            .await;

        let client = client_for(&server, ProviderKind::Google);
        let token = client
            .refresh_token(&SecretString::new("old-refresh".to_string()))
            .await
            .unwrap();
        assert_eq!(
            token.token().refresh_token().unwrap().expose_secret(),
            "old-refresh"
        );
    }

    #[tokio::test]
    async fn test_refresh_invalid_grant_requires_reauthorization() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let client = client_for(&server, ProviderKind::Google);
        let err = client
            .refresh_token(&SecretString::new("revoked".to_string()))
            .await
            .unwrap_err();
        assert!(err.requires_reauthorization());
    }

    #[tokio::test]
    async fn test_ensure_fresh_token_returns_fresh_token_unchanged() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/token").expect(0).create_async().await;

        let client = client_for(&server, ProviderKind::Google);
        let response = TokenResponse {
            access_token: "fresh".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: Some("r".to_string()),
            scope: None,
        };
        let token = InternalToken::from_response(response, Utc::now(), None);

        let first = client.ensure_fresh_token(&token).await.unwrap();
        let second = client.ensure_fresh_token(&token).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.token(), &token);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_fresh_token_refreshes_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"refreshed","token_type":"Bearer","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, ProviderKind::Google);
        let stale = stale_token(Some("r"));
        let fresh = client.ensure_fresh_token(&stale).await.unwrap();

        mock.assert_async().await;
        assert!(fresh.token().expires_at > stale.expires_at);
        assert_eq!(fresh.access_token().expose_secret(), "refreshed");
    }

    #[tokio::test]
    async fn test_ensure_fresh_token_without_refresh_token() {
        let server = Server::new_async().await;
        let client = client_for(&server, ProviderKind::WordPressCom);
        let err = client
            .ensure_fresh_token(&stale_token(None))
            .await
            .unwrap_err();
        assert!(err.requires_reauthorization());
    }

    #[tokio::test]
    async fn test_validate_token_google_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/tokeninfo")
            .match_query(Matcher::UrlEncoded("access_token".into(), "fresh".into()))
            .with_status(200)
            .with_body(r#"{"scope":"s","expires_in":"100"}"#)
            .create_async()
            .await;

        let client = client_for(&server, ProviderKind::Google);
        let response = TokenResponse {
            access_token: "fresh".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: None,
            scope: None,
        };
        let fresh =
            FreshToken::try_from(InternalToken::from_response(response, Utc::now(), None)).unwrap();
        let info = client.validate_token(&fresh).await.unwrap();

        mock.assert_async().await;
        assert_eq!(info["scope"], "s");
    }
}
