//! Note front matter as read by the publisher, and the patch written back.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{CategoryId, PostId};

pub const PROFILE_NAME: &str = "profileName";
pub const POST_ID: &str = "postId";
pub const POST_TYPE: &str = "postType";
pub const CATEGORIES: &str = "categories";

/// The front-matter keys the publisher understands. Other keys are left to the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatterData {
    pub title: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub post_id: Option<PostId>,
    pub profile_name: Option<String>,
    pub post_type: Option<String>,
    pub categories: Option<Vec<CategoryId>>,
    #[serde(deserialize_with = "list_or_single")]
    pub tags: Option<Vec<String>>,
    #[serde(deserialize_with = "list_or_single")]
    pub labels: Option<Vec<String>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Tags may be written as a YAML list or as one comma separated string.
fn list_or_single<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(s)) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    })
}

/// Field-level changes to a note's front matter, applied by the host in one write.
///
/// `None` removes a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatterPatch {
    changes: BTreeMap<String, Option<Value>>,
}

impl FrontMatterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.changes.insert(key.to_string(), Some(value.into()));
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.changes.insert(key.to_string(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Option<Value>> {
        self.changes.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Apply to a JSON object view of front matter.
    pub fn apply_to(&self, matter: &mut serde_json::Map<String, Value>) {
        for (key, value) in self.iter() {
            match value {
                Some(value) => {
                    matter.insert(key.to_string(), value.clone());
                }
                None => {
                    matter.remove(key);
                }
            }
        }
    }
}
