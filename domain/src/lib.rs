//! Publishing notes to Blogger and WordPress.com.
//!
//! The [`publish::PublishOrchestrator`] drives a publish from the active note to the
//! platform and back into the note's front matter. Everything the host provides
//! (notes, prompts, notices, settings storage) comes in through the traits in
//! [`host`] and [`settings`], and everything else through an explicit
//! [`context::Context`].

pub mod auth;
pub mod context;
pub mod error;
pub mod gateway;
pub mod host;
pub mod media;
pub mod profile;
pub mod publish;
pub mod render;
pub mod settings;
pub mod token_storage;
