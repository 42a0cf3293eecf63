//! Authorizing profiles against their platform.
//!
//! The authorize flow opens the browser on the provider's consent page and then
//! waits for the redirect, either on a loopback port or through the custom URI
//! scheme handler. A failed attempt never leaves a half-valid token behind.

use blog_auth::browser::Browser;
use blog_auth::oauth::token::FreshToken;
use blog_auth::oauth::{AuthorizeParams, Client as OAuthClient, PendingAuthorization};
use blog_auth::redirect::{complete_authorization, LoopbackListener, ProtocolHandler};
use entity::profile::{ApiType, Profile};
use log::*;
use serde_json::Value;

use crate::context::Context;
use crate::error::{AuthErrorKind, DomainErrorKind, Error};
use crate::gateway::blogger::fetch_blog_id;
use crate::profile;

/// How the provider's redirect reaches this process.
pub enum RedirectStrategy<'a> {
    /// Bind `127.0.0.1` on an OS-assigned port.
    Loopback,
    /// The host delivers custom-scheme URLs to this handler.
    Protocol(&'a ProtocolHandler),
}

/// Run the authorize flow for `profile_name` and store the token on the profile.
/// Blogger profiles without a blog id get it looked up from their endpoint.
pub async fn authorize(
    ctx: &Context,
    profile_name: &str,
    browser: &dyn Browser,
    strategy: RedirectStrategy<'_>,
) -> Result<Profile, Error> {
    let profile = profile::find(&ctx.settings, profile_name).await?;
    let settings = ctx.settings.snapshot().await;
    let client = ctx.oauth_client(profile.api_type, &settings)?;

    let token = match obtain_token(ctx, &profile, &client, browser, strategy).await {
        Ok(token) => token,
        Err(e) => {
            forget_token_after(ctx, &profile.name, &e).await;
            return Err(e);
        }
    };
    ctx.tokens
        .store_token(&profile.name, token.into_inner())
        .await?;
    info!("Profile {} authorized", profile.name);

    if profile.api_type == ApiType::Blogger && profile.blog_id.is_none() {
        let credentials = ctx.credentials(&profile).await?;
        let blog_id = fetch_blog_id(
            &ctx.http,
            &ctx.config.endpoints.blogger_api_url,
            &credentials,
            &profile.endpoint,
        )
        .await?;
        info!("Profile {} publishes to blog {}", profile.name, blog_id);
        ctx.settings
            .update(|s| {
                if let Some(p) = s.find_profile_mut(&profile.name) {
                    p.blog_id = Some(blog_id);
                }
                Ok(())
            })
            .await?;
    }

    profile::find(&ctx.settings, &profile.name).await
}

async fn obtain_token(
    ctx: &Context,
    profile: &Profile,
    client: &OAuthClient,
    browser: &dyn Browser,
    strategy: RedirectStrategy<'_>,
) -> Result<FreshToken, Error> {
    let timeout = ctx.config.authorize_timeout();
    match strategy {
        RedirectStrategy::Loopback => {
            let listener = LoopbackListener::bind().await?.with_timeout(timeout);
            let pending = PendingAuthorization::new(listener.redirect_uri());
            client.get_authorize_code(browser, &authorize_params(profile, client, &pending))?;
            let token = listener
                .capture(|redirect| async move {
                    complete_authorization(client, &pending, &redirect).await
                })
                .await?;
            Ok(token)
        }
        RedirectStrategy::Protocol(handler) => {
            let pending = PendingAuthorization::new(handler.redirect_uri());
            let redirect = handler.arm();
            client.get_authorize_code(browser, &authorize_params(profile, client, &pending))?;
            let params = redirect.wait(Some(timeout)).await?;
            Ok(complete_authorization(client, &pending, &params).await?)
        }
    }
}

fn authorize_params(
    profile: &Profile,
    client: &OAuthClient,
    pending: &PendingAuthorization,
) -> AuthorizeParams {
    let params = AuthorizeParams::for_pending(client.kind(), pending);
    match profile.api_type {
        ApiType::WordpressCom => params.with_blog(profile.endpoint.clone()),
        ApiType::Blogger => params,
    }
}

/// Clear the stored token when the provider refused or the attempt left nothing
/// usable. A state mismatch is someone else's redirect and leaves it alone.
async fn forget_token_after(ctx: &Context, profile_name: &str, e: &Error) {
    if e.error_kind == DomainErrorKind::Auth(AuthErrorKind::StateMismatch) {
        warn!("Authorization for {} ignored a foreign redirect", profile_name);
        return;
    }
    if e.requires_reauthorization() {
        warn!("Authorization for {} failed, clearing its token", profile_name);
        if let Err(clear_err) = ctx.tokens.delete_token(profile_name).await {
            error!("Failed to clear token of {}: {}", profile_name, clear_err);
        }
    }
}

/// Ask the provider about the profile's token, refreshing it first if stale.
pub async fn validate(ctx: &Context, profile_name: &str) -> Result<Value, Error> {
    let profile = profile::find(&ctx.settings, profile_name).await?;
    let settings = ctx.settings.snapshot().await;
    let client = ctx.oauth_client(profile.api_type, &settings)?;
    let fresh = ctx.tokens.fresh_token(&client, &profile.name).await?;
    Ok(client.validate_token(&fresh).await?)
}

/// Forget the profile's token.
pub async fn deauthorize(ctx: &Context, profile_name: &str) -> Result<(), Error> {
    let profile = profile::find(&ctx.settings, profile_name).await?;
    ctx.tokens.delete_token(&profile.name).await?;
    info!("Profile {} deauthorized", profile.name);
    Ok(())
}
