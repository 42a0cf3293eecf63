//! What the publisher needs from the application hosting it.
//!
//! The domain never touches files, terminals or windows directly. A host provides
//! the active note, writes front matter back, resolves attachments and asks the
//! user questions through these traits.

use async_trait::async_trait;
use entity::matter::{FrontMatterPatch, MatterData};
use entity::post::{PostStatus, PostType, Term};
use entity::profile::Profile;
use entity::CategoryId;

use crate::error::Error;

/// The note being published.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Vault-relative path.
    pub path: String,
    /// File name without extension, the fallback post title.
    pub basename: String,
    pub matter: MatterData,
    /// Markdown without the front matter block.
    pub body: String,
}

/// A vault file an image reference resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub path: String,
    pub name: String,
}

#[async_trait]
pub trait Workspace: Send + Sync {
    /// `None` when no note is open.
    async fn active_note(&self) -> Result<Option<Note>, Error>;

    /// Apply all changes of `patch` to the note's front matter in one write.
    async fn apply_front_matter(&self, note: &Note, patch: &FrontMatterPatch)
        -> Result<(), Error>;

    /// Replace the note body, keeping its front matter.
    async fn replace_body(&self, note: &Note, body: &str) -> Result<(), Error>;

    /// Find the attachment an image link in `note` points at.
    async fn resolve_attachment(&self, link: &str, note: &Note)
        -> Result<Option<Attachment>, Error>;

    async fn read_binary(&self, attachment: &Attachment) -> Result<Vec<u8>, Error>;
}

/// Choices offered by the interactive publish dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishDialog {
    pub status: PostStatus,
    pub categories: Vec<Term>,
    pub selected_categories: Vec<CategoryId>,
    pub post_types: Vec<PostType>,
    pub selected_post_type: PostType,
}

/// What the user picked in the publish dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSelection {
    pub status: PostStatus,
    pub categories: Vec<CategoryId>,
    pub post_type: PostType,
}

#[async_trait]
pub trait Prompt: Send + Sync {
    /// Ask a yes/no question. `true` means the confirm button.
    async fn confirm(&self, message: &str, confirm_text: &str, cancel_text: &str)
        -> Result<bool, Error>;

    /// Let the user pick one of several profiles. `None` when dismissed.
    async fn choose_profile(&self, profiles: &[Profile]) -> Result<Option<String>, Error>;

    /// Show the publish dialog. `None` when dismissed.
    async fn publish_dialog(&self, dialog: PublishDialog)
        -> Result<Option<PublishSelection>, Error>;
}

/// Transient user notices.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}
