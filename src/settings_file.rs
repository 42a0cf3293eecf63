//! Settings persisted as a JSON file.

use std::path::PathBuf;

use async_trait::async_trait;
use domain::error::{host_error, Error};
use domain::settings::SettingsStore;
use entity::settings::PluginSettings;
use log::*;

pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> Result<Option<PluginSettings>, Error> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(host_error(format!(
                    "Failed to read settings from {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        debug!("Loaded settings from {}", self.path.display());
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Written to a sibling temp file, then renamed into place.
    async fn save(&self, settings: &PluginSettings) -> Result<(), Error> {
        let write_error =
            |e: std::io::Error| host_error(format!("Failed to save settings: {}", e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(write_error)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::settings::Settings;
    use entity::profile::{ApiType, Profile};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::new(dir.path().join("settings.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saved_settings_load_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let store = JsonSettingsStore::new(&path);

        let mut settings = PluginSettings::default();
        settings
            .profiles
            .push(Profile::new("blog", ApiType::WordpressCom, "https://me.wordpress.com"));
        store.save(&settings).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(settings));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"enableHtml": true}"#).unwrap();

        let settings = Settings::load(Arc::new(JsonSettingsStore::new(&path)))
            .await
            .unwrap()
            .snapshot()
            .await;

        assert!(settings.enable_html);
        assert!(settings.replace_media_links);
        assert!(settings.profiles.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonSettingsStore::new(&path).load().await.is_err());
    }
}
