//! REST clients for the blog platforms.
//!
//! One implementation of [`BlogClient`] per [`ApiType`]; the profile's discriminant
//! picks it. Every request obtains its `Authorization` header through
//! [`Credentials::header`], which runs the token freshness gate right before use.

pub mod blogger;
pub mod wordpress;

use std::sync::Arc;

use async_trait::async_trait;
use blog_auth::{
    http::AuthenticatedClient,
    oauth::{token::Manager, Client as OAuthClient},
};
use entity::post::{Media, PostParams, PostType, Term};
use entity::profile::ApiType;
use entity::publish_result::{MediaUploadResult, PublishResult, ReturnCode};
use log::*;
use reqwest::header::HeaderValue;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::Error;
use crate::token_storage::ProfileTokenStorage;

/// Multipart field name of an uploaded file. Both platforms want `media[]` for a
/// single file.
pub(crate) const MEDIA_FIELD: &str = "media[]";

#[async_trait]
pub trait BlogClient: Send + Sync {
    fn api_type(&self) -> ApiType;

    /// Create the post when `params.post_id` is absent, update it otherwise.
    ///
    /// Platform errors and unparsable responses come back as `PublishResult::Error`;
    /// `Err` is reserved for failures before a response exists.
    async fn publish(
        &self,
        title: &str,
        content: &str,
        params: &PostParams,
    ) -> Result<PublishResult, Error>;

    async fn get_categories(&self) -> Result<Vec<Term>, Error>;

    async fn get_post_types(&self) -> Result<Vec<PostType>, Error>;

    /// Find a tag by name, creating it if missing.
    async fn get_tag(&self, name: &str) -> Result<Term, Error>;

    async fn upload_media(&self, media: &Media) -> Result<MediaUploadResult, Error>;

    /// Page where the user can edit a published post.
    fn edit_url(&self, post_id: &str) -> String;

    /// Resolve tag names to what the publish call expects. Tags that fail to
    /// resolve are dropped.
    async fn resolve_tags(&self, names: &[String]) -> Vec<String> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            match self.get_tag(name).await {
                Ok(term) => ids.push(term.id),
                Err(e) => warn!("Dropping tag {}: {}", name, e),
            }
        }
        ids
    }
}

/// Source of `Authorization` headers for one profile.
#[derive(Clone)]
pub struct Credentials {
    manager: Arc<Manager<ProfileTokenStorage>>,
    oauth: Arc<OAuthClient>,
    profile_name: String,
}

impl Credentials {
    pub fn new(
        manager: Arc<Manager<ProfileTokenStorage>>,
        oauth: Arc<OAuthClient>,
        profile_name: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            oauth,
            profile_name: profile_name.into(),
        }
    }

    /// Header from a token checked (and refreshed if stale) just now.
    pub async fn header(&self) -> Result<HeaderValue, Error> {
        let fresh = self
            .manager
            .fresh_token(&self.oauth, &self.profile_name)
            .await?;
        Ok(fresh.authorization_header()?)
    }
}

/// Retrying client for reads, single-attempt client for writes.
#[derive(Clone)]
pub struct HttpClients {
    pub read: AuthenticatedClient,
    pub write: AuthenticatedClient,
}

/// Read a response body as JSON, keeping non-JSON bodies as a string value.
pub(crate) async fn response_body(response: reqwest::Response) -> Result<Value, Error> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Error result for a non-success HTTP status.
///
/// Google wraps errors as `{"error": {"code", "message"}}`, WordPress.com answers
/// `{"error": "<code>", "message"}`.
pub(crate) fn error_result(status: reqwest::StatusCode, body: Value) -> PublishResult {
    let (code, message) = error_fields(status, &body);
    warn!("Publish rejected with {}: {}", code, message);
    PublishResult::error(code, message, Some(body))
}

pub(crate) fn error_fields(status: reqwest::StatusCode, body: &Value) -> (String, String) {
    let default_message = status.canonical_reason().unwrap_or("Request failed").to_string();
    match body.get("error") {
        Some(Value::Object(error)) => (
            error
                .get("code")
                .map(value_to_string)
                .unwrap_or_else(|| status.as_u16().to_string()),
            error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(default_message),
        ),
        Some(Value::String(code)) => (
            code.clone(),
            body.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(default_message),
        ),
        _ => (status.as_u16().to_string(), default_message),
    }
}

pub(crate) fn unparsable(response: Value) -> PublishResult {
    PublishResult::error(
        ReturnCode::ServerInternalError,
        "Cannot parse the response from the server",
        Some(response),
    )
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Multipart form with the file under `media[]`.
pub(crate) fn media_form(media: &Media) -> Result<Form, Error> {
    let part = Part::bytes(media.content.clone())
        .file_name(media.file_name.clone())
        .mime_str(&media.mime_type)?;
    Ok(Form::new().part(MEDIA_FIELD, part))
}

/// Upload response shared by both platforms: `{"media": [{"link": ...}]}` or
/// `{"errors": {"error": {"message": ...}}}`.
pub(crate) fn media_result(status: reqwest::StatusCode, body: &Value) -> MediaUploadResult {
    if let Some(link) = body
        .get("media")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|first| first.get("link"))
        .and_then(Value::as_str)
    {
        return MediaUploadResult::Ok {
            url: link.to_string(),
        };
    }

    let message = body
        .pointer("/errors/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if status.is_success() {
                "Upload failed".to_string()
            } else {
                error_fields(status, body).1
            }
        });
    MediaUploadResult::Error {
        code: ReturnCode::ServerInternalError.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_google_error_shape() {
        let body = json!({"error": {"code": 403, "message": "Forbidden blog"}});
        assert_eq!(
            error_fields(StatusCode::FORBIDDEN, &body),
            ("403".to_string(), "Forbidden blog".to_string())
        );
    }

    #[test]
    fn test_wordpress_error_shape() {
        let body = json!({"error": "unauthorized", "message": "User cannot publish posts"});
        assert_eq!(
            error_fields(StatusCode::FORBIDDEN, &body),
            (
                "unauthorized".to_string(),
                "User cannot publish posts".to_string()
            )
        );
    }

    #[test]
    fn test_unknown_error_shape_uses_status() {
        let (code, message) = error_fields(StatusCode::BAD_GATEWAY, &Value::Null);
        assert_eq!(code, "502");
        assert_eq!(message, "Bad Gateway");
    }

    #[test]
    fn test_media_result_reads_first_link() {
        let body = json!({"media": [{"link": "https://img/cat.png"}, {"link": "other"}]});
        assert_eq!(
            media_result(StatusCode::OK, &body),
            MediaUploadResult::Ok {
                url: "https://img/cat.png".to_string()
            }
        );
    }

    #[test]
    fn test_media_result_reports_errors() {
        let body = json!({"media": [], "errors": {"error": {"message": "Too big"}}});
        assert_eq!(
            media_result(StatusCode::OK, &body),
            MediaUploadResult::Error {
                code: "ServerInternalError".to_string(),
                message: "Too big".to_string()
            }
        );
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use crate::settings::tests::settings_with;
    use crate::settings::Settings;
    use blog_auth::http::AuthenticatedClientBuilder;
    use blog_auth::oauth::{ClientCredentials, ProviderEndpoints, ProviderKind};
    use chrono::{Duration, Utc};
    use entity::profile::Profile;
    use entity::settings::PluginSettings;
    use entity::token::TokenRecord;

    pub(crate) fn fresh_record() -> TokenRecord {
        TokenRecord {
            access_token: "access-token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3599,
            refresh_token: Some("refresh-token".to_string()),
            scope: String::new(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    pub(crate) fn http_clients() -> HttpClients {
        let builder = AuthenticatedClientBuilder::new().with_max_retries(0);
        HttpClients {
            read: builder.build().unwrap(),
            write: builder.build_single_attempt().unwrap(),
        }
    }

    pub(crate) fn oauth_client(server: &mockito::Server) -> OAuthClient {
        let endpoints = ProviderEndpoints {
            authorize_url: format!("{}/authorize", server.url()),
            token_url: format!("{}/token", server.url()),
            validate_url: format!("{}/tokeninfo", server.url()),
        };
        OAuthClient::new(
            ProviderKind::Google,
            ClientCredentials::new("id", "secret"),
            endpoints,
        )
        .unwrap()
    }

    /// Settings holding one authorized profile.
    pub(crate) async fn authorized_settings(profile: Profile) -> Settings {
        let mut value = PluginSettings::default();
        let mut profile = profile;
        profile.oauth2_token = Some(fresh_record());
        value.profiles.push(profile);
        settings_with(value).await.0
    }

    pub(crate) async fn credentials_for(server: &mockito::Server, profile_name: &str) -> Credentials {
        let settings = authorized_settings(Profile::new(
            profile_name,
            ApiType::Blogger,
            "https://x.blogspot.com",
        ))
        .await;
        Credentials::new(
            Arc::new(Manager::new(ProfileTokenStorage::new(settings))),
            Arc::new(oauth_client(server)),
            profile_name,
        )
    }
}
