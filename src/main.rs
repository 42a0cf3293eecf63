use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use blog_auth::browser::SystemBrowser;
use blog_auth::redirect::{HandleOutcome, ProtocolHandler};
use clap::{Parser, Subcommand};
use domain::auth::{self, RedirectStrategy};
use domain::context::Context;
use domain::error::Error;
use domain::profile;
use domain::publish::PublishOrchestrator;
use entity::profile::{ApiType, Profile};
use log::*;
use service::{
    config::{load_dotenv, Config},
    logging::Logger,
};

mod settings_file;
mod terminal;
mod vault;

use settings_file::JsonSettingsStore;
use terminal::{TerminalNotifier, TerminalPrompt};
use vault::FsWorkspace;

/// Publish Obsidian notes to Blogger and WordPress.com.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authorize a profile with its platform and store the token
    Authorize { profile: String },
    /// Publish a note
    Publish {
        /// Path of the note, relative to the vault or the working directory
        note: PathBuf,
        /// Publish with this profile instead of asking
        #[arg(long)]
        profile: Option<String>,
        /// Publish with the default profile and status without asking anything
        #[arg(long, conflicts_with = "profile")]
        default: bool,
    },
    /// Check a profile's token against the platform
    Validate { profile: String },
    /// Forget a profile's token
    Deauthorize { profile: String },
    /// List profiles
    Profiles,
    /// Add a profile
    AddProfile {
        name: String,
        #[arg(long)]
        api_type: ApiType,
        /// Blog URL, e.g. https://example.blogspot.com
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        blog_id: Option<String>,
        #[arg(long)]
        default: bool,
    },
    /// Remove a profile and its token
    RemoveProfile { name: String },
    /// Make a profile the default
    SetDefault { name: String },
}

#[tokio::main]
async fn main() {
    load_dotenv();
    let cli = Cli::parse();
    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

/// Runs one command. `Ok(false)` means the command reported its own failure.
async fn run(cli: Cli) -> Result<bool, Error> {
    let store = Arc::new(JsonSettingsStore::new(cli.config.settings_path.clone()));
    let ctx = Context::load(cli.config, store).await?;

    match cli.command {
        Command::Authorize { profile } => {
            let profile = authorize(&ctx, &profile).await?;
            println!("Profile {} authorized", profile.name);
        }
        Command::Publish {
            note,
            profile,
            default,
        } => {
            let workspace = FsWorkspace::new(ctx.config.vault_path.clone(), note);
            let prompt = TerminalPrompt::stdio();
            let notifier = TerminalNotifier;
            let browser = SystemBrowser;
            let orchestrator =
                PublishOrchestrator::new(&ctx, &workspace, &prompt, &notifier, &browser);

            let result = if default {
                orchestrator.publish_with_default_profile().await
            } else {
                orchestrator.publish(profile.as_deref()).await
            };
            if let Some(post_id) = result.post_id() {
                println!("Post id: {}", post_id);
            }
            return Ok(result.is_ok());
        }
        Command::Validate { profile } => {
            let info = auth::validate(&ctx, &profile).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Deauthorize { profile } => {
            auth::deauthorize(&ctx, &profile).await?;
            println!("Profile {} deauthorized", profile);
        }
        Command::Profiles => {
            let settings = ctx.settings.snapshot().await;
            if settings.profiles.is_empty() {
                println!("No profiles");
            }
            for profile in &settings.profiles {
                println!(
                    "{}{} [{}] {}{}",
                    if profile.is_default { "* " } else { "  " },
                    profile.name,
                    profile.api_type,
                    profile.endpoint,
                    if profile.oauth2_token.is_some() {
                        ""
                    } else {
                        " (not authorized)"
                    }
                );
            }
        }
        Command::AddProfile {
            name,
            api_type,
            endpoint,
            blog_id,
            default,
        } => {
            let mut new_profile = Profile::new(name, api_type, endpoint);
            new_profile.blog_id = blog_id;
            new_profile.is_default = default;
            profile::add(&ctx.settings, new_profile).await?;
        }
        Command::RemoveProfile { name } => {
            profile::delete(&ctx.settings, &name).await?;
        }
        Command::SetDefault { name } => {
            profile::set_default(&ctx.settings, &name).await?;
        }
    }
    Ok(true)
}

/// On `--mobile` the redirect comes back through the custom URI scheme: the
/// platform hands the URL over on standard input, one per line.
async fn authorize(ctx: &Context, profile_name: &str) -> Result<Profile, Error> {
    let browser = SystemBrowser;
    if !ctx.config.mobile {
        return auth::authorize(ctx, profile_name, &browser, RedirectStrategy::Loopback).await;
    }

    let handler = Arc::new(ProtocolHandler::new(ctx.config.protocol_redirect_uri.clone()));
    println!("Paste the redirect URL when the browser hands it back:");
    deliver_redirects(handler.clone());
    auth::authorize(
        ctx,
        profile_name,
        &browser,
        RedirectStrategy::Protocol(&handler),
    )
    .await
}

/// Feeds stdin lines to `handler` from a plain thread, so a pending read never
/// holds up runtime shutdown.
fn deliver_redirects(handler: Arc<ProtocolHandler>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match handler.handle(line) {
                Ok(HandleOutcome::Delivered) => debug!("Redirect delivered"),
                Ok(HandleOutcome::Ignored) => debug!("Redirect ignored"),
                Err(e) => warn!("Not a redirect URL: {e}"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_publish_command_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "blog_publisher_rs",
            "--settings-path",
            "s.json",
            "--mobile",
            "publish",
            "notes/hello.md",
            "--profile",
            "blog",
        ])
        .unwrap();

        assert_eq!(cli.config.settings_path, PathBuf::from("s.json"));
        assert!(cli.config.mobile);
        match cli.command {
            Command::Publish {
                note,
                profile,
                default,
            } => {
                assert_eq!(note, PathBuf::from("notes/hello.md"));
                assert_eq!(profile.as_deref(), Some("blog"));
                assert!(!default);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_add_profile_parses_api_type() {
        let cli = Cli::try_parse_from([
            "blog_publisher_rs",
            "add-profile",
            "wp",
            "--api-type",
            "wordpress-com",
            "--endpoint",
            "https://me.wordpress.com",
        ])
        .unwrap();
        match cli.command {
            Command::AddProfile {
                api_type, default, ..
            } => {
                assert_eq!(api_type, ApiType::WordpressCom);
                assert!(!default);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from([
            "blog_publisher_rs",
            "add-profile",
            "x",
            "--api-type",
            "medium",
            "--endpoint",
            "https://x",
        ])
        .is_err());
    }

    #[test]
    #[serial]
    fn test_default_and_profile_conflict() {
        assert!(Cli::try_parse_from([
            "blog_publisher_rs",
            "publish",
            "n.md",
            "--default",
            "--profile",
            "blog",
        ])
        .is_err());
    }

    #[tokio::test]
    #[serial]
    async fn test_profile_commands_persist_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        let path = settings_path.to_string_lossy().to_string();
        let args = |extra: &[&str]| {
            let mut args = vec!["blog_publisher_rs", "--settings-path", path.as_str()];
            args.extend_from_slice(extra);
            Cli::try_parse_from(args).unwrap()
        };

        assert!(run(args(&[
            "add-profile",
            "a",
            "--api-type",
            "blogger",
            "--endpoint",
            "https://a.blogspot.com",
        ]))
        .await
        .unwrap());
        run(args(&[
            "add-profile",
            "b",
            "--api-type",
            "wordpress-com",
            "--endpoint",
            "https://b.wordpress.com",
        ]))
        .await
        .unwrap();
        run(args(&["set-default", "b"])).await.unwrap();
        run(args(&["remove-profile", "a"])).await.unwrap();

        let saved: entity::settings::PluginSettings =
            serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
        assert_eq!(saved.profiles.len(), 1);
        assert_eq!(saved.profiles[0].name, "b");
        assert!(saved.profiles[0].is_default);
    }
}
