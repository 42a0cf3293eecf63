use serde::{Deserialize, Serialize};

use crate::{CategoryId, PostId};

/// Title used when neither front matter nor file name provides one.
pub const DEFAULT_TITLE: &str = "A post from Obsidian!";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::Draft => write!(fmt, "draft"),
            PostStatus::Publish => write!(fmt, "publish"),
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "publish" => Ok(PostStatus::Publish),
            other => Err(format!("unknown post status: {}", other)),
        }
    }
}

/// WordPress post type name. Only `post` carries categories and tags.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PostType(pub String);

impl PostType {
    pub const POST: &'static str = "post";
    pub const PAGE: &'static str = "page";

    pub fn post() -> Self {
        Self(Self::POST.to_string())
    }

    pub fn is_post(&self) -> bool {
        self.0 == Self::POST
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PostType {
    fn default() -> Self {
        Self::post()
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

/// A taxonomy term (category or tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub taxonomy: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub count: i64,
}

/// One publish request, assembled per attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostParams {
    pub title: String,
    /// Markdown before media substitution, HTML once rendered.
    pub content: String,
    pub status: PostStatus,
    pub categories: Vec<CategoryId>,
    /// Tag names from front matter; WordPress.com term ids once resolved.
    pub tags: Vec<String>,
    /// Blogger labels.
    pub labels: Vec<String>,
    pub post_type: PostType,
    /// Present means update, absent means create.
    pub post_id: Option<PostId>,
    pub profile_name: String,
}

/// A file to upload to the platform's media library.
#[derive(Clone, PartialEq)]
pub struct Media {
    pub mime_type: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for Media {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Media")
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .field("len", &self.content.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_type_defaults_to_post() {
        assert!(PostType::default().is_post());
        assert!(!PostType(PostType::PAGE.to_string()).is_post());
    }

    #[test]
    fn post_status_parses() {
        assert_eq!("publish".parse::<PostStatus>().unwrap(), PostStatus::Publish);
        assert!("future".parse::<PostStatus>().is_err());
    }
}
