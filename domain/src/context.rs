//! The explicitly constructed application context.
//!
//! Created once at process start and passed by reference to whatever needs
//! configuration, settings, tokens, HTTP clients or rendering.

use std::sync::Arc;

use blog_auth::{
    http::AuthenticatedClientBuilder,
    oauth::{token::Manager, Client as OAuthClient, ClientCredentials, ProviderEndpoints, ProviderKind},
};
use entity::profile::{ApiType, Profile};
use entity::settings::PluginSettings;
use log::*;
use service::config::Config;

use crate::error::{auth_error, config_error, AuthErrorKind, ConfigErrorKind, Error};
use crate::gateway::{
    blogger::BloggerClient, wordpress::WordPressComClient, BlogClient, Credentials, HttpClients,
};
use crate::render::RenderContext;
use crate::settings::{Settings, SettingsStore};
use crate::token_storage::ProfileTokenStorage;

#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub settings: Settings,
    pub tokens: Arc<Manager<ProfileTokenStorage>>,
    pub http: HttpClients,
}

impl Context {
    pub fn new(config: Config, settings: Settings) -> Result<Self, Error> {
        let builder = AuthenticatedClientBuilder::new()
            .with_timeout(config.http_timeout())
            .with_max_retries(config.http_max_retries);
        let http = HttpClients {
            read: builder.build()?,
            write: builder.build_single_attempt()?,
        };
        let tokens = Arc::new(Manager::new(ProfileTokenStorage::new(settings.clone())));
        Ok(Self {
            config,
            settings,
            tokens,
            http,
        })
    }

    /// Load settings from `store` and build the context around them.
    pub async fn load(config: Config, store: Arc<dyn SettingsStore>) -> Result<Self, Error> {
        let settings = Settings::load(store).await?;
        Self::new(config, settings)
    }

    /// OAuth client for the provider behind `api_type`.
    ///
    /// Credentials from the configuration take precedence over those stored in
    /// settings.
    pub fn oauth_client(
        &self,
        api_type: ApiType,
        settings: &PluginSettings,
    ) -> Result<OAuthClient, Error> {
        let endpoints = &self.config.endpoints;
        let (kind, id, secret, provider_endpoints) = match api_type {
            ApiType::Blogger => (
                ProviderKind::Google,
                self.config
                    .google_client_id()
                    .or_else(|| settings.google_client_id.clone()),
                self.config
                    .google_client_secret()
                    .or_else(|| settings.google_client_secret.clone()),
                ProviderEndpoints {
                    authorize_url: endpoints.google_authorize_url.clone(),
                    token_url: endpoints.google_token_url.clone(),
                    validate_url: endpoints.google_validate_url.clone(),
                },
            ),
            ApiType::WordpressCom => (
                ProviderKind::WordPressCom,
                self.config
                    .wpcom_client_id()
                    .or_else(|| settings.wpcom_client_id.clone()),
                self.config
                    .wpcom_client_secret()
                    .or_else(|| settings.wpcom_client_secret.clone()),
                ProviderEndpoints {
                    authorize_url: endpoints.wpcom_authorize_url.clone(),
                    token_url: endpoints.wpcom_token_url.clone(),
                    validate_url: endpoints.wpcom_validate_url.clone(),
                },
            ),
        };

        match (id, secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok(
                OAuthClient::new(kind, ClientCredentials::new(id, secret), provider_endpoints)?,
            ),
            _ => Err(config_error(
                ConfigErrorKind::MissingCredentials,
                &format!("No OAuth client id and secret configured for {}", api_type),
            )),
        }
    }

    /// Credentials that hand out fresh `Authorization` headers for `profile`.
    pub async fn credentials(&self, profile: &Profile) -> Result<Credentials, Error> {
        let settings = self.settings.snapshot().await;
        let oauth = self.oauth_client(profile.api_type, &settings)?;
        Ok(Credentials::new(
            self.tokens.clone(),
            Arc::new(oauth),
            profile.name.clone(),
        ))
    }

    /// REST client for the profile's platform. Fails before any network call when
    /// the profile is incomplete.
    pub async fn blog_client(&self, profile: &Profile) -> Result<Box<dyn BlogClient>, Error> {
        if profile.endpoint.trim().is_empty() {
            return Err(config_error(
                ConfigErrorKind::MissingEndpoint,
                &format!("Profile {} has no endpoint", profile.name),
            ));
        }
        if profile.oauth2_token.is_none() {
            return Err(auth_error(
                AuthErrorKind::NotAuthorized,
                &format!("Profile {} is not authorized", profile.name),
            ));
        }
        let blog_id = profile.site_id().ok_or_else(|| {
            config_error(
                ConfigErrorKind::MissingBlogId,
                &format!("Profile {} has no blog id", profile.name),
            )
        })?;
        let credentials = self.credentials(profile).await?;

        debug!(
            "Building {} client for profile {}",
            profile.api_type, profile.name
        );
        let client: Box<dyn BlogClient> = match profile.api_type {
            ApiType::Blogger => Box::new(BloggerClient::new(
                self.config.endpoints.blogger_api_url.clone(),
                blog_id,
                credentials,
                self.http.clone(),
            )),
            ApiType::WordpressCom => Box::new(WordPressComClient::new(
                &self.config.endpoints.wpcom_api_url,
                &blog_id,
                profile.endpoint.clone(),
                credentials,
                self.http.clone(),
            )),
        };
        Ok(client)
    }

    pub async fn render_context(&self) -> RenderContext {
        RenderContext::new(self.settings.snapshot().await.enable_html)
    }
}
