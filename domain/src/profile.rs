//! Profile management. Every operation saves settings before returning.

use entity::profile::Profile;
use log::*;

use crate::error::{cancelled, config_error, ConfigErrorKind, Error};
use crate::host::Prompt;
use crate::settings::Settings;

fn not_found(name: &str) -> Error {
    config_error(
        ConfigErrorKind::ProfileNotFound,
        &format!("No profile named {}", name),
    )
}

/// Add a profile. The first profile always becomes the default, and a new
/// default takes the flag from the previous one.
pub async fn add(settings: &Settings, profile: Profile) -> Result<(), Error> {
    let name = profile.name.clone();
    settings
        .update(|s| {
            if s.find_profile(&profile.name).is_some() {
                return Err(config_error(
                    ConfigErrorKind::DuplicateProfile,
                    &format!("A profile named {} already exists", profile.name),
                ));
            }
            let mut profile = profile;
            if s.profiles.is_empty() {
                profile.is_default = true;
            }
            if profile.is_default {
                s.profiles.iter_mut().for_each(|p| p.is_default = false);
            }
            s.profiles.push(profile);
            Ok(())
        })
        .await?;
    info!("Added profile {}", name);
    Ok(())
}

/// Replace the profile called `name` with `profile`, keeping its position.
pub async fn replace(settings: &Settings, name: &str, profile: Profile) -> Result<(), Error> {
    settings
        .update(|s| {
            if profile.name != name && s.find_profile(&profile.name).is_some() {
                return Err(config_error(
                    ConfigErrorKind::DuplicateProfile,
                    &format!("A profile named {} already exists", profile.name),
                ));
            }
            let index = s
                .profiles
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| not_found(name))?;
            if profile.is_default {
                s.profiles.iter_mut().for_each(|p| p.is_default = false);
            }
            s.profiles[index] = profile;
            Ok(())
        })
        .await
}

/// Remove a profile together with its token. When it was the default, the first
/// remaining profile becomes the default.
pub async fn delete(settings: &Settings, name: &str) -> Result<Profile, Error> {
    let removed = settings
        .update(|s| {
            let index = s
                .profiles
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| not_found(name))?;
            let removed = s.profiles.remove(index);
            if removed.is_default {
                if let Some(first) = s.profiles.first_mut() {
                    first.is_default = true;
                }
            }
            Ok(removed)
        })
        .await?;
    info!("Deleted profile {}", name);
    Ok(removed)
}

/// Make `name` the only default profile.
pub async fn set_default(settings: &Settings, name: &str) -> Result<(), Error> {
    settings
        .update(|s| {
            if s.find_profile(name).is_none() {
                return Err(not_found(name));
            }
            for profile in s.profiles.iter_mut() {
                profile.is_default = profile.name == name;
            }
            Ok(())
        })
        .await
}

pub async fn find(settings: &Settings, name: &str) -> Result<Profile, Error> {
    settings
        .snapshot()
        .await
        .find_profile(name)
        .cloned()
        .ok_or_else(|| not_found(name))
}

pub async fn find_default(settings: &Settings) -> Result<Profile, Error> {
    settings
        .snapshot()
        .await
        .default_profile()
        .cloned()
        .ok_or_else(|| {
            config_error(
                ConfigErrorKind::NoDefaultProfile,
                "No default profile is set",
            )
        })
}

/// Pick the profile to publish with: the only one, or the user's choice.
pub async fn choose(settings: &Settings, prompt: &dyn Prompt) -> Result<Profile, Error> {
    let profiles = settings.snapshot().await.profiles;
    match profiles.len() {
        0 => Err(config_error(
            ConfigErrorKind::NoProfiles,
            "Create a profile before publishing",
        )),
        1 => Ok(profiles[0].clone()),
        _ => {
            let name = prompt.choose_profile(&profiles).await?.ok_or_else(cancelled)?;
            profiles
                .into_iter()
                .find(|p| p.name == name)
                .ok_or_else(|| not_found(&name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, PublishErrorKind};
    use crate::gateway::tests_support::fresh_record;
    use crate::host::{PublishDialog, PublishSelection};
    use crate::settings::tests::settings_with;
    use async_trait::async_trait;
    use entity::profile::ApiType;
    use entity::settings::PluginSettings;

    fn blogger(name: &str) -> Profile {
        Profile::new(name, ApiType::Blogger, format!("https://{}.blogspot.com", name))
    }

    async fn empty() -> Settings {
        settings_with(PluginSettings::default()).await.0
    }

    fn defaults(settings: &PluginSettings) -> Vec<&str> {
        settings
            .profiles
            .iter()
            .filter(|p| p.is_default)
            .map(|p| p.name.as_str())
            .collect()
    }

    struct ChoosingPrompt(Option<&'static str>);

    #[async_trait]
    impl Prompt for ChoosingPrompt {
        async fn confirm(&self, _: &str, _: &str, _: &str) -> Result<bool, Error> {
            Ok(true)
        }
        async fn choose_profile(&self, _: &[Profile]) -> Result<Option<String>, Error> {
            Ok(self.0.map(str::to_string))
        }
        async fn publish_dialog(&self, _: PublishDialog) -> Result<Option<PublishSelection>, Error> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_first_profile_becomes_default() {
        let settings = empty().await;
        add(&settings, blogger("a")).await.unwrap();
        add(&settings, blogger("b")).await.unwrap();
        assert_eq!(defaults(&settings.snapshot().await), vec!["a"]);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_rejected() {
        let settings = empty().await;
        add(&settings, blogger("a")).await.unwrap();
        let err = add(&settings, blogger("a")).await.unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Config(ConfigErrorKind::DuplicateProfile)
        );
        assert_eq!(settings.snapshot().await.profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_set_default_leaves_exactly_one() {
        let settings = empty().await;
        for name in ["a", "b", "c"] {
            add(&settings, blogger(name)).await.unwrap();
        }
        set_default(&settings, "c").await.unwrap();
        assert_eq!(defaults(&settings.snapshot().await), vec!["c"]);
        assert!(set_default(&settings, "zzz").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_token_and_moves_default() {
        let settings = empty().await;
        let mut first = blogger("a");
        first.oauth2_token = Some(fresh_record());
        add(&settings, first).await.unwrap();
        add(&settings, blogger("b")).await.unwrap();

        let removed = delete(&settings, "a").await.unwrap();

        assert!(removed.oauth2_token.is_some());
        let snapshot = settings.snapshot().await;
        assert!(snapshot.find_profile("a").is_none());
        assert_eq!(defaults(&snapshot), vec!["b"]);
    }

    #[tokio::test]
    async fn test_replace_keeps_position() {
        let settings = empty().await;
        add(&settings, blogger("a")).await.unwrap();
        add(&settings, blogger("b")).await.unwrap();

        let mut renamed = blogger("renamed");
        renamed.blog_id = Some("42".to_string());
        replace(&settings, "a", renamed).await.unwrap();

        let snapshot = settings.snapshot().await;
        assert_eq!(snapshot.profiles[0].name, "renamed");
        assert_eq!(snapshot.profiles[0].blog_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_choose_with_no_profiles() {
        let err = choose(&empty().await, &ChoosingPrompt(None))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, DomainErrorKind::Config(ConfigErrorKind::NoProfiles));
    }

    #[tokio::test]
    async fn test_single_profile_is_chosen_without_asking() {
        let settings = empty().await;
        add(&settings, blogger("only")).await.unwrap();
        let profile = choose(&settings, &ChoosingPrompt(None)).await.unwrap();
        assert_eq!(profile.name, "only");
    }

    #[tokio::test]
    async fn test_several_profiles_ask_the_user() {
        let settings = empty().await;
        add(&settings, blogger("a")).await.unwrap();
        add(&settings, blogger("b")).await.unwrap();

        let profile = choose(&settings, &ChoosingPrompt(Some("b"))).await.unwrap();
        assert_eq!(profile.name, "b");

        let err = choose(&settings, &ChoosingPrompt(None)).await.unwrap_err();
        assert_eq!(err.error_kind, DomainErrorKind::Publish(PublishErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn test_find_default_without_profiles() {
        let err = find_default(&empty().await).await.unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Config(ConfigErrorKind::NoDefaultProfile)
        );
    }
}
