//! Process-wide plugin settings and their persistence.

use std::sync::Arc;

use async_trait::async_trait;
use entity::settings::{PluginSettings, SettingsVersion};
use log::*;
use tokio::sync::RwLock;

use crate::error::Error;

/// Where settings live between runs.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<PluginSettings>, Error>;

    async fn save(&self, settings: &PluginSettings) -> Result<(), Error>;
}

/// Shared handle to the loaded settings. Every mutation is saved before it returns.
#[derive(Clone)]
pub struct Settings {
    inner: Arc<RwLock<PluginSettings>>,
    store: Arc<dyn SettingsStore>,
}

impl Settings {
    /// Load from `store`, falling back to defaults, and upgrade older versions.
    pub async fn load(store: Arc<dyn SettingsStore>) -> Result<Self, Error> {
        let settings = match store.load().await? {
            Some(settings) => upgrade(settings),
            None => {
                info!("No saved settings found, using defaults");
                PluginSettings::default()
            }
        };
        Ok(Self {
            inner: Arc::new(RwLock::new(settings)),
            store,
        })
    }

    /// A copy of the current settings.
    pub async fn snapshot(&self) -> PluginSettings {
        self.inner.read().await.clone()
    }

    /// Mutate and save. When `f` or the save fails, the previous settings are kept.
    pub async fn update<F, T>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut PluginSettings) -> Result<T, Error>,
    {
        let mut guard = self.inner.write().await;
        let mut next = guard.clone();
        let value = f(&mut next)?;
        if next != *guard {
            self.store.save(&next).await?;
            *guard = next;
            debug!("Settings saved");
        }
        Ok(value)
    }
}

fn upgrade(settings: PluginSettings) -> PluginSettings {
    match settings.version {
        SettingsVersion::V1 => settings,
    }
}
