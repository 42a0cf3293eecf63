//! Publishing a note: profile checks, front-matter reconciliation, image upload,
//! the platform call and the bookkeeping after it.
//!
//! [`PublishOrchestrator::publish_post`] is the single catch boundary. Every step
//! below it returns `Result`, and any error ends up as a user notice plus a
//! `PublishResult::Error`.

use blog_auth::browser::Browser;
use entity::matter::{self, FrontMatterPatch, MatterData};
use entity::post::{PostParams, PostType, DEFAULT_TITLE};
use entity::profile::{ApiType, Profile};
use entity::publish_result::{PublishResult, ReturnCode};
use entity::CategoryId;
use log::*;

use crate::context::Context;
use crate::error::{
    cancelled, config_error, rejected, ConfigErrorKind, DomainErrorKind, Error,
    ExternalErrorKind, PublishErrorKind,
};
use crate::gateway::BlogClient;
use crate::host::{Note, Notifier, Prompt, PublishDialog, Workspace};
use crate::media::MediaUploader;
use crate::profile;

/// Category selected when a profile has never remembered one (WordPress's
/// "Uncategorized").
const FALLBACK_CATEGORY: CategoryId = 1;

pub struct PublishOrchestrator<'a> {
    ctx: &'a Context,
    workspace: &'a dyn Workspace,
    prompt: &'a dyn Prompt,
    notifier: &'a dyn Notifier,
    browser: &'a dyn Browser,
}

impl<'a> PublishOrchestrator<'a> {
    pub fn new(
        ctx: &'a Context,
        workspace: &'a dyn Workspace,
        prompt: &'a dyn Prompt,
        notifier: &'a dyn Notifier,
        browser: &'a dyn Browser,
    ) -> Self {
        Self {
            ctx,
            workspace,
            prompt,
            notifier,
            browser,
        }
    }

    /// Publish the active note with the default profile and default status,
    /// without asking anything.
    pub async fn publish_with_default_profile(&self) -> PublishResult {
        let settings = self.ctx.settings.snapshot().await;
        match profile::find_default(&self.ctx.settings).await {
            Ok(profile) => {
                let defaults = PostParams {
                    status: settings.default_post_status,
                    profile_name: profile.name.clone(),
                    ..Default::default()
                };
                self.publish_post(profile, Some(defaults)).await
            }
            Err(e) => self.fail(e),
        }
    }

    /// Publish the active note with the named profile, or one the user picks, and
    /// let the user adjust status, categories and post type first.
    pub async fn publish(&self, profile_name: Option<&str>) -> PublishResult {
        let profile = match profile_name {
            Some(name) => profile::find(&self.ctx.settings, name).await,
            None => profile::choose(&self.ctx.settings, self.prompt).await,
        };
        match profile {
            Ok(profile) => self.publish_post(profile, None).await,
            Err(e) => self.fail(e),
        }
    }

    /// Publish with `profile`. With `defaults` the interactive dialog is skipped.
    pub async fn publish_post(&self, profile: Profile, defaults: Option<PostParams>) -> PublishResult {
        match self.try_to_publish(&profile, defaults).await {
            Ok(result) => result,
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, e: Error) -> PublishResult {
        let mut message = e.to_string();
        if e.requires_reauthorization() {
            message.push_str(". Authorize the profile again.");
        }
        error!("Publish failed: {}", message);
        self.notifier.error(&message);

        match e.error_kind {
            DomainErrorKind::Publish(PublishErrorKind::Rejected {
                code,
                message,
                response,
            }) => PublishResult::Error {
                code,
                message,
                response,
            },
            DomainErrorKind::External(ExternalErrorKind::Parse) => {
                PublishResult::error(ReturnCode::ServerInternalError, message, None)
            }
            _ => PublishResult::error(ReturnCode::Error, message, None),
        }
    }

    async fn try_to_publish(
        &self,
        profile: &Profile,
        defaults: Option<PostParams>,
    ) -> Result<PublishResult, Error> {
        if profile.endpoint.trim().is_empty() {
            return Err(config_error(
                ConfigErrorKind::MissingEndpoint,
                &format!("Profile {} has no endpoint", profile.name),
            ));
        }
        let note = self.workspace.active_note().await?.ok_or_else(|| {
            config_error(ConfigErrorKind::NoActiveNote, "Open a note to publish")
        })?;
        let client = self.ctx.blog_client(profile).await?;

        let matter = self.reconcile_profile(profile, note.matter.clone()).await?;

        let params = match defaults {
            Some(defaults) => read_front_matter(&note, &matter, defaults),
            None => self.collect_params(client.as_ref(), profile, &note, &matter).await?,
        };
        let params = self.resolve_taxonomy(client.as_ref(), params).await;

        let settings = self.ctx.settings.snapshot().await;
        let uploader = MediaUploader::new(
            client.as_ref(),
            self.workspace,
            self.notifier,
            settings.replace_media_links,
        );
        let content = uploader.upload_images(&note, &note.body).await;
        if content != note.body {
            self.workspace.replace_body(&note, &content).await?;
        }

        let title = if params.title.is_empty() {
            DEFAULT_TITLE
        } else {
            params.title.as_str()
        };
        let html = self.ctx.render_context().await.render(&content);
        let result = client.publish(title, &html, &params).await?;

        let (post_id, categories) = match &result {
            PublishResult::Ok {
                post_id,
                categories,
                ..
            } => (post_id.clone(), categories.clone()),
            PublishResult::Error {
                code,
                message,
                response,
            } => return Err(rejected(code.clone(), message.clone(), response.clone())),
        };
        info!("Published {} as post {}", note.path, post_id);

        let patch = build_front_matter_patch(client.api_type(), &profile.name, &post_id, &params);
        self.workspace.apply_front_matter(&note, &patch).await?;

        if settings.remember_last_selected_categories {
            if let Some(categories) = categories {
                self.remember_categories(&profile.name, categories).await?;
            }
        }

        self.notifier.info("Published successfully");

        if settings.show_edit_confirm {
            self.offer_edit_page(client.as_ref(), &post_id).await;
        }
        Ok(result)
    }

    /// When the note was published with another profile, ask which one wins.
    /// Publishing with the current profile starts a new post there.
    async fn reconcile_profile(
        &self,
        profile: &Profile,
        mut matter: MatterData,
    ) -> Result<MatterData, Error> {
        let Some(previous) = matter.profile_name.clone() else {
            return Ok(matter);
        };
        if previous == profile.name {
            return Ok(matter);
        }

        let use_current = self
            .prompt
            .confirm(
                &format!(
                    "This note was published with profile {}, not {}.",
                    previous, profile.name
                ),
                &format!("Publish with {}", profile.name),
                &format!("Keep {}", previous),
            )
            .await?;
        if use_current {
            debug!(
                "Switching note from profile {} to {}, dropping post id",
                previous, profile.name
            );
            matter.post_id = None;
            matter.categories = Some(remembered_categories(profile));
        }
        Ok(matter)
    }

    async fn collect_params(
        &self,
        client: &dyn BlogClient,
        profile: &Profile,
        note: &Note,
        matter: &MatterData,
    ) -> Result<PostParams, Error> {
        let settings = self.ctx.settings.snapshot().await;
        let categories = client.get_categories().await?;
        let mut post_types = client.get_post_types().await?;
        if post_types.is_empty() {
            post_types.push(PostType::post());
        }

        let dialog = PublishDialog {
            status: settings.default_post_status,
            categories,
            selected_categories: matter
                .categories
                .clone()
                .unwrap_or_else(|| remembered_categories(profile)),
            post_types,
            selected_post_type: matter
                .post_type
                .clone()
                .map(PostType)
                .unwrap_or_default(),
        };
        let selection = self
            .prompt
            .publish_dialog(dialog)
            .await?
            .ok_or_else(cancelled)?;

        let mut params = read_front_matter(
            note,
            matter,
            PostParams {
                status: selection.status,
                profile_name: profile.name.clone(),
                ..Default::default()
            },
        );
        params.post_type = selection.post_type;
        if params.post_type.is_post() {
            params.categories = selection.categories;
        } else {
            params.categories.clear();
            params.tags.clear();
        }
        Ok(params)
    }

    /// Turn tag names into what the platform expects. Only posts carry them.
    async fn resolve_taxonomy(&self, client: &dyn BlogClient, mut params: PostParams) -> PostParams {
        if params.post_type.is_post() && !params.tags.is_empty() {
            params.tags = client.resolve_tags(&params.tags).await;
        }
        params
    }

    async fn remember_categories(
        &self,
        profile_name: &str,
        categories: Vec<CategoryId>,
    ) -> Result<(), Error> {
        self.ctx
            .settings
            .update(|s| {
                if let Some(profile) = s.find_profile_mut(profile_name) {
                    profile.last_selected_categories = categories;
                }
                Ok(())
            })
            .await
    }

    async fn offer_edit_page(&self, client: &dyn BlogClient, post_id: &str) {
        let open = match self
            .prompt
            .confirm("The post was published. Open it for editing?", "Open", "Close")
            .await
        {
            Ok(open) => open,
            Err(e) => {
                warn!("Edit confirmation failed: {}", e);
                false
            }
        };
        if open {
            let url = client.edit_url(post_id);
            if let Err(e) = self.browser.open(&url) {
                warn!("Could not open {}: {}", url, e);
                self.notifier.error(&format!("Could not open {}", url));
            }
        }
    }
}

fn remembered_categories(profile: &Profile) -> Vec<CategoryId> {
    if profile.last_selected_categories.is_empty() {
        vec![FALLBACK_CATEGORY]
    } else {
        profile.last_selected_categories.clone()
    }
}

/// Merge what the note declares into `params`.
///
/// The title is the note name unless front matter has one. Categories and tags
/// are only read for the `post` type.
pub fn read_front_matter(note: &Note, matter: &MatterData, params: PostParams) -> PostParams {
    let mut params = params;
    params.title = matter
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| note.basename.clone());
    params.content = note.body.clone();
    if let Some(post_id) = &matter.post_id {
        params.post_id = Some(post_id.clone());
    }
    if let Some(profile_name) = &matter.profile_name {
        params.profile_name = profile_name.clone();
    }
    params.post_type = matter.post_type.clone().map(PostType).unwrap_or_default();
    if params.post_type.is_post() {
        if let Some(categories) = &matter.categories {
            params.categories = categories.clone();
        }
        if let Some(tags) = &matter.tags {
            params.tags = tags.clone();
        }
    }
    params.labels = matter
        .labels
        .clone()
        .or_else(|| matter.tags.clone())
        .unwrap_or_default();
    params
}

/// Front-matter changes recorded after a successful publish.
pub fn build_front_matter_patch(
    api_type: ApiType,
    profile_name: &str,
    post_id: &str,
    params: &PostParams,
) -> FrontMatterPatch {
    let patch = FrontMatterPatch::new()
        .set(matter::PROFILE_NAME, profile_name)
        .set(matter::POST_ID, post_id);
    match api_type {
        ApiType::Blogger => patch,
        ApiType::WordpressCom => {
            let patch = patch.set(matter::POST_TYPE, params.post_type.as_str());
            if params.post_type.is_post() {
                patch.set(matter::CATEGORIES, params.categories.clone())
            } else {
                patch
            }
        }
    }
}
