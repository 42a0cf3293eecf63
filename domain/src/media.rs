//! Local image detection and upload substitution.

use std::sync::OnceLock;

use entity::post::Media;
use entity::publish_result::{MediaUploadResult, ReturnCode};
use log::*;
use mime_sniffer::MimeTypeSniffer;
use regex::Regex;
use url::Url;

use crate::gateway::BlogClient;
use crate::host::{Note, Notifier, Workspace};

/// An image reference found in note content.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    /// The matched markdown, replaced verbatim on substitution.
    pub original: String,
    pub src: String,
    pub alt_text: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    /// Already remote; never uploaded.
    pub src_is_url: bool,
}

fn inline_image() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[(.*?)(?:\|(\d+)(?:x(\d+))?)?\]\((.*?)\)").ok())
        .as_ref()
}

fn wiki_embed() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[\[(.*?)(?:\|(\d+)(?:x(\d+))?)?\]\]").ok())
        .as_ref()
}

fn is_url(src: &str) -> bool {
    Url::parse(src).is_ok()
}

/// All inline-link images (`![alt|WxH](src)`), then all wiki embeds (`![[src|WxH]]`).
pub fn find_images(content: &str) -> Vec<ImageRef> {
    let group = |caps: &regex::Captures, i: usize| caps.get(i).map(|m| m.as_str().to_string());

    let inline = inline_image()
        .into_iter()
        .flat_map(|re| re.captures_iter(content))
        .map(|caps| {
            let src = group(&caps, 4).unwrap_or_default();
            ImageRef {
                original: caps[0].to_string(),
                src_is_url: is_url(&src),
                src,
                alt_text: group(&caps, 1),
                width: group(&caps, 2),
                height: group(&caps, 3),
            }
        });
    let wiki = wiki_embed()
        .into_iter()
        .flat_map(|re| re.captures_iter(content))
        .map(|caps| {
            let src = group(&caps, 1).unwrap_or_default();
            ImageRef {
                original: caps[0].to_string(),
                src_is_url: is_url(&src),
                src,
                alt_text: None,
                width: group(&caps, 2),
                height: group(&caps, 3),
            }
        });
    inline.chain(wiki).collect()
}

/// Uploads the local images of a note and rewrites their references.
pub struct MediaUploader<'a> {
    client: &'a dyn BlogClient,
    workspace: &'a dyn Workspace,
    notifier: &'a dyn Notifier,
    replace_links: bool,
}

impl<'a> MediaUploader<'a> {
    pub fn new(
        client: &'a dyn BlogClient,
        workspace: &'a dyn Workspace,
        notifier: &'a dyn Notifier,
        replace_links: bool,
    ) -> Self {
        Self {
            client,
            workspace,
            notifier,
            replace_links,
        }
    }

    /// Upload every local image in `content` and return the content with successful
    /// uploads substituted (when link replacement is on).
    ///
    /// A failing image gets a notice and keeps its original reference.
    pub async fn upload_images(&self, note: &Note, content: &str) -> String {
        let mut content = content.to_string();
        for image in find_images(&content) {
            if image.src_is_url {
                continue;
            }
            if let Some(replacement) = self.upload_one(note, &image).await {
                if self.replace_links {
                    content = content.replacen(&image.original, &replacement, 1);
                }
            }
        }
        content
    }

    async fn upload_one(&self, note: &Note, image: &ImageRef) -> Option<String> {
        let attachment = match self.workspace.resolve_attachment(&image.src, note).await {
            Ok(Some(attachment)) => attachment,
            Ok(None) => {
                warn!("Image {} not found in vault, leaving it as is", image.src);
                return None;
            }
            Err(e) => {
                self.notifier
                    .error(&format!("Failed to upload {}: {}", image.src, e));
                return None;
            }
        };

        let content = match self.workspace.read_binary(&attachment).await {
            Ok(content) => content,
            Err(e) => {
                self.notifier
                    .error(&format!("Failed to upload {}: {}", attachment.name, e));
                return None;
            }
        };
        let mime_type = content
            .sniff_mime_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let media = Media {
            mime_type,
            file_name: attachment.name.clone(),
            content,
        };

        match self.client.upload_media(&media).await {
            Ok(MediaUploadResult::Ok { url }) => {
                info!("Uploaded {} to {}", attachment.name, url);
                Some(format!("![{}]({})", attachment.name, url))
            }
            Ok(MediaUploadResult::Error { code, message }) => {
                if code == ReturnCode::ServerInternalError.to_string() {
                    self.notifier.error(&message);
                } else {
                    self.notifier
                        .error(&format!("Failed to upload {}", attachment.name));
                }
                None
            }
            Err(e) => {
                self.notifier.error(&e.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{host_error, Error};
    use crate::host::Attachment;
    use async_trait::async_trait;
    use entity::matter::{FrontMatterPatch, MatterData};
    use entity::post::{PostParams, PostType, Term};
    use entity::profile::ApiType;
    use entity::publish_result::PublishResult;
    use std::sync::Mutex;

    #[test]
    fn wiki_embed_with_size() {
        let images = find_images("![[cat.png|300x200]]");
        assert_eq!(
            images,
            vec![ImageRef {
                original: "![[cat.png|300x200]]".to_string(),
                src: "cat.png".to_string(),
                alt_text: None,
                width: Some("300".to_string()),
                height: Some("200".to_string()),
                src_is_url: false,
            }]
        );
    }

    #[test]
    fn inline_url_image_is_remote() {
        let images = find_images("![alt](https://x/y.png)");
        assert_eq!(images.len(), 1);
        assert!(images[0].src_is_url);
        assert_eq!(images[0].alt_text.as_deref(), Some("alt"));
        assert_eq!(images[0].width, None);
    }

    #[test]
    fn width_only_hint() {
        let images = find_images("![logo|120](img/logo.png) and ![[pic.png|64]]");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].width.as_deref(), Some("120"));
        assert_eq!(images[0].height, None);
        assert_eq!(images[0].src, "img/logo.png");
        assert_eq!(images[1].width.as_deref(), Some("64"));
    }

    #[derive(Default)]
    struct FakeVault {
        missing: Vec<String>,
    }

    #[async_trait]
    impl Workspace for FakeVault {
        async fn active_note(&self) -> Result<Option<Note>, Error> {
            Ok(None)
        }
        async fn apply_front_matter(&self, _: &Note, _: &FrontMatterPatch) -> Result<(), Error> {
            Ok(())
        }
        async fn replace_body(&self, _: &Note, _: &str) -> Result<(), Error> {
            Ok(())
        }
        async fn resolve_attachment(
            &self,
            link: &str,
            _: &Note,
        ) -> Result<Option<Attachment>, Error> {
            if self.missing.iter().any(|m| m == link) {
                return Ok(None);
            }
            Ok(Some(Attachment {
                path: format!("attachments/{}", link),
                name: link.to_string(),
            }))
        }
        async fn read_binary(&self, attachment: &Attachment) -> Result<Vec<u8>, Error> {
            if attachment.name == "unreadable.png" {
                return Err(host_error("permission denied"));
            }
            Ok(b"\x89PNG\r\n\x1a\n rest of the image".to_vec())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        errors: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn info(&self, _: &str) {}
        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    #[derive(Default)]
    struct FakeClient {
        uploads: Mutex<Vec<Media>>,
    }

    #[async_trait]
    impl BlogClient for FakeClient {
        fn api_type(&self) -> ApiType {
            ApiType::WordpressCom
        }
        async fn publish(&self, _: &str, _: &str, _: &PostParams) -> Result<PublishResult, Error> {
            unreachable!()
        }
        async fn get_categories(&self) -> Result<Vec<Term>, Error> {
            Ok(Vec::new())
        }
        async fn get_post_types(&self) -> Result<Vec<PostType>, Error> {
            Ok(Vec::new())
        }
        async fn get_tag(&self, _: &str) -> Result<Term, Error> {
            unreachable!()
        }
        async fn upload_media(&self, media: &Media) -> Result<MediaUploadResult, Error> {
            self.uploads.lock().unwrap().push(media.clone());
            if media.file_name == "broken.png" {
                return Ok(MediaUploadResult::Error {
                    code: "ServerInternalError".to_string(),
                    message: "Upload failed".to_string(),
                });
            }
            Ok(MediaUploadResult::Ok {
                url: format!("https://img/{}", media.file_name),
            })
        }
        fn edit_url(&self, post_id: &str) -> String {
            post_id.to_string()
        }
    }

    fn note() -> Note {
        Note {
            path: "note.md".to_string(),
            basename: "note".to_string(),
            matter: MatterData::default(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn replaces_uploaded_wiki_embed() {
        let (vault, notifier, client) = (
            FakeVault::default(),
            RecordingNotifier::default(),
            FakeClient::default(),
        );
        let uploader = MediaUploader::new(&client, &vault, &notifier, true);

        let content = uploader.upload_images(&note(), "Hello ![[pic.png]]").await;

        assert_eq!(content, "Hello ![pic.png](https://img/pic.png)");
        let uploads = client.uploads.lock().unwrap();
        assert_eq!(uploads[0].mime_type, "image/png");
    }

    #[tokio::test]
    async fn remote_images_are_never_uploaded() {
        let (vault, notifier, client) = (
            FakeVault::default(),
            RecordingNotifier::default(),
            FakeClient::default(),
        );
        let uploader = MediaUploader::new(&client, &vault, &notifier, true);

        let content = uploader
            .upload_images(&note(), "![alt](https://x/y.png)")
            .await;

        assert_eq!(content, "![alt](https://x/y.png)");
        assert!(client.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_keeps_reference_and_continues() {
        let (vault, notifier, client) = (
            FakeVault::default(),
            RecordingNotifier::default(),
            FakeClient::default(),
        );
        let uploader = MediaUploader::new(&client, &vault, &notifier, true);

        let content = uploader
            .upload_images(&note(), "![[broken.png]] ![[unreadable.png]] ![[ok.png]]")
            .await;

        assert_eq!(
            content,
            "![[broken.png]] ![[unreadable.png]] ![ok.png](https://img/ok.png)"
        );
        assert_eq!(notifier.errors.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn uploads_without_replacing_when_disabled() {
        let vault = FakeVault {
            missing: vec!["gone.png".to_string()],
        };
        let (notifier, client) = (RecordingNotifier::default(), FakeClient::default());
        let uploader = MediaUploader::new(&client, &vault, &notifier, false);

        let content = uploader
            .upload_images(&note(), "![[pic.png]] ![[gone.png]]")
            .await;

        assert_eq!(content, "![[pic.png]] ![[gone.png]]");
        assert_eq!(client.uploads.lock().unwrap().len(), 1);
    }
}
