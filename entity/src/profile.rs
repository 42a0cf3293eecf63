use serde::{Deserialize, Serialize};

use crate::token::TokenRecord;
use crate::CategoryId;

/// Which platform a profile publishes to. Chosen when the profile is created.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ApiType {
    #[default]
    Blogger,
    WordpressCom,
}

impl std::fmt::Display for ApiType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiType::Blogger => write!(fmt, "blogger"),
            ApiType::WordpressCom => write!(fmt, "wordpress-com"),
        }
    }
}

impl std::str::FromStr for ApiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blogger" => Ok(ApiType::Blogger),
            "wordpress-com" | "wpcom" => Ok(ApiType::WordpressCom),
            other => Err(format!("unknown api type: {}", other)),
        }
    }
}

/// A named blog target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub api_type: ApiType,
    /// Blog URL, e.g. `https://example.blogspot.com`.
    pub endpoint: String,
    /// Blogger blog id, or the WordPress.com site id/domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_token: Option<TokenRecord>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub last_selected_categories: Vec<CategoryId>,
}

impl Profile {
    pub fn new(name: impl Into<String>, api_type: ApiType, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_type,
            endpoint: endpoint.into(),
            blog_id: None,
            oauth2_token: None,
            is_default: false,
            last_selected_categories: Vec::new(),
        }
    }

    /// Blog id to address the platform API with. WordPress.com accepts the site
    /// domain when no numeric id has been stored.
    pub fn site_id(&self) -> Option<String> {
        match (&self.blog_id, self.api_type) {
            (Some(id), _) if !id.is_empty() => Some(id.clone()),
            (_, ApiType::WordpressCom) => site_domain(&self.endpoint),
            _ => None,
        }
    }
}

fn site_domain(endpoint: &str) -> Option<String> {
    let without_scheme = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let domain = without_scheme.split('/').next().unwrap_or_default();
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}
