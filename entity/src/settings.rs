use serde::{Deserialize, Serialize};

use crate::post::PostStatus;
use crate::profile::Profile;

/// Settings schema version.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, Default)]
pub enum SettingsVersion {
    #[serde(rename = "1")]
    #[default]
    V1,
}

/// Everything the publisher persists between runs.
///
/// Fields missing from a stored file take their defaults, so older files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginSettings {
    pub version: SettingsVersion,
    pub profiles: Vec<Profile>,
    pub default_post_status: PostStatus,
    /// Ask to open the post's edit page after a successful publish.
    pub show_edit_confirm: bool,
    /// Rewrite local image references to the uploaded URLs.
    pub replace_media_links: bool,
    pub remember_last_selected_categories: bool,
    /// Pass raw HTML in notes through to the rendered post.
    pub enable_html: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wpcom_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wpcom_client_secret: Option<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            version: SettingsVersion::V1,
            profiles: Vec::new(),
            default_post_status: PostStatus::Draft,
            show_edit_confirm: false,
            replace_media_links: true,
            remember_last_selected_categories: true,
            enable_html: false,
            google_client_id: None,
            google_client_secret: None,
            wpcom_client_id: None,
            wpcom_client_secret: None,
        }
    }
}

impl PluginSettings {
    pub fn find_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn find_profile_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }

    pub fn default_profile(&self) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.is_default)
    }
}
