//! Plain data model shared by the publishing crates.
//!
//! Everything here is serde-serializable: profiles and settings are persisted as
//! JSON, front matter travels as YAML inside notes.

pub mod matter;
pub mod post;
pub mod profile;
pub mod publish_result;
pub mod settings;
pub mod token;

/// Provider-assigned post identifier. Blogger ids are long digit strings and
/// WordPress.com ids are integers, so both are kept as text.
pub type PostId = String;

/// WordPress.com category id.
pub type CategoryId = i64;
