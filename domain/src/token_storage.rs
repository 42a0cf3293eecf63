//! Settings-backed OAuth token storage.
//!
//! Implements `blog_auth::oauth::token::Storage` by keeping each profile's token on
//! the profile itself, so a refreshed token is saved together with the rest of the
//! settings.

use async_trait::async_trait;
use entity::token::TokenRecord;

use blog_auth::{
    error::{storage_error, Error},
    oauth::token::{InternalToken, PlainToken, Storage},
};

use crate::error::{config_error, ConfigErrorKind};
use crate::settings::Settings;

/// Token storage that reads and writes `Profile::oauth2_token`.
#[derive(Clone)]
pub struct ProfileTokenStorage {
    settings: Settings,
}

impl ProfileTokenStorage {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

pub(crate) fn to_record(token: &InternalToken) -> TokenRecord {
    let plain = token.to_plain();
    TokenRecord {
        access_token: plain.access_token,
        token_type: plain.token_type,
        expires_in: plain.expires_in,
        refresh_token: plain.refresh_token,
        scope: plain.scope,
        expires_at: plain.expires_at,
    }
}

pub(crate) fn from_record(record: &TokenRecord) -> InternalToken {
    InternalToken::from_plain(PlainToken {
        access_token: record.access_token.clone(),
        token_type: record.token_type.clone(),
        expires_in: record.expires_in,
        refresh_token: record.refresh_token.clone(),
        scope: record.scope.clone(),
        expires_at: record.expires_at,
    })
}

#[async_trait]
impl Storage for ProfileTokenStorage {
    async fn store(&self, profile_name: &str, token: InternalToken) -> Result<(), Error> {
        let record = to_record(&token);
        self.settings
            .update(|settings| {
                let profile = settings.find_profile_mut(profile_name).ok_or_else(|| {
                    config_error(
                        ConfigErrorKind::ProfileNotFound,
                        &format!("No profile named {}", profile_name),
                    )
                })?;
                profile.oauth2_token = Some(record);
                Ok(())
            })
            .await
            .map_err(|e| storage_error(&e.to_string()))
    }

    async fn get(&self, profile_name: &str) -> Result<Option<InternalToken>, Error> {
        let settings = self.settings.snapshot().await;
        Ok(settings
            .find_profile(profile_name)
            .and_then(|profile| profile.oauth2_token.as_ref())
            .map(from_record))
    }

    async fn delete(&self, profile_name: &str) -> Result<(), Error> {
        self.settings
            .update(|settings| {
                if let Some(profile) = settings.find_profile_mut(profile_name) {
                    profile.oauth2_token = None;
                }
                Ok(())
            })
            .await
            .map_err(|e| storage_error(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::tests::settings_with;
    use blog_auth::error::{ErrorKind, TokenErrorKind};
    use chrono::{Duration, TimeZone, Utc};
    use entity::profile::{ApiType, Profile};
    use entity::settings::PluginSettings;

    fn record() -> TokenRecord {
        TokenRecord {
            access_token: "access".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3599,
            refresh_token: Some("refresh".to_string()),
            scope: "https://www.googleapis.com/auth/blogger".to_string(),
            expires_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        }
    }

    async fn storage_with_profile() -> (ProfileTokenStorage, Settings) {
        let mut value = PluginSettings::default();
        value
            .profiles
            .push(Profile::new("blog", ApiType::Blogger, "https://x.blogspot.com"));
        let (settings, _store) = settings_with(value).await;
        (ProfileTokenStorage::new(settings.clone()), settings)
    }

    #[test]
    fn test_record_conversion_keeps_every_field() {
        let original = record();
        assert_eq!(to_record(&from_record(&original)), original);
    }

    #[tokio::test]
    async fn test_store_then_get() {
        let (storage, settings) = storage_with_profile().await;
        let token = from_record(&TokenRecord {
            expires_at: Utc::now() + Duration::hours(1),
            ..record()
        });

        storage.store("blog", token.clone()).await.unwrap();

        assert_eq!(storage.get("blog").await.unwrap(), Some(token));
        let snapshot = settings.snapshot().await;
        assert!(snapshot.find_profile("blog").unwrap().oauth2_token.is_some());
    }

    #[tokio::test]
    async fn test_store_for_unknown_profile_is_a_storage_error() {
        let (storage, _settings) = storage_with_profile().await;
        let err = storage
            .store("missing", from_record(&record()))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Token(TokenErrorKind::Storage));
    }

    #[tokio::test]
    async fn test_delete_clears_token() {
        let (storage, _settings) = storage_with_profile().await;
        storage.store("blog", from_record(&record())).await.unwrap();
        storage.delete("blog").await.unwrap();
        assert!(storage.get("blog").await.unwrap().is_none());
    }
}
