//! OAuth provider kinds and the per-provider endpoint set.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Known OAuth providers for blog publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    WordPressCom,
}

impl ProviderKind {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::WordPressCom => "wordpress_com",
        }
    }

    /// Scopes requested by the authorize step.
    pub fn default_scopes(&self) -> Vec<String> {
        match self {
            ProviderKind::Google => vec![super::providers::google::BLOGGER_SCOPE.to_string()],
            ProviderKind::WordPressCom => vec![super::providers::wordpress::GLOBAL_SCOPE.to_string()],
        }
    }
}

/// The three OAuth endpoints a provider exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub validate_url: String,
}

/// Registered OAuth application credentials.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }
}
