//! A vault on the local file system: one note to publish and the attachments
//! around it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domain::error::{host_error, Error};
use domain::host::{Attachment, Note, Workspace};
use entity::matter::{FrontMatterPatch, MatterData};
use log::*;
use serde_yaml::{Mapping, Value as YamlValue};
use walkdir::WalkDir;

/// Serves the note given on the command line as the active note.
pub struct FsWorkspace {
    root: PathBuf,
    note: PathBuf,
}

impl FsWorkspace {
    /// `note` is taken relative to the working directory, falling back to the vault
    /// root when no such file exists there.
    pub fn new(root: impl Into<PathBuf>, note: impl AsRef<Path>) -> Self {
        let root = root.into();
        let note = note.as_ref();
        let note = if note.is_absolute() || note.exists() {
            note.to_path_buf()
        } else {
            root.join(note)
        };
        Self { root, note }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    async fn read_note_file(&self) -> Result<String, Error> {
        tokio::fs::read_to_string(&self.note)
            .await
            .map_err(|e| host_error(format!("Failed to read {}: {}", self.note.display(), e)))
    }

    async fn write_note_file(&self, content: &str) -> Result<(), Error> {
        tokio::fs::write(&self.note, content)
            .await
            .map_err(|e| host_error(format!("Failed to write {}: {}", self.note.display(), e)))
    }
}

/// Split note content at the `---` fences into (front matter, body). Content
/// without a complete front matter block is all body.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let mut lines = content.split_inclusive('\n');
    let start = match lines.next() {
        Some(first) if first.trim_end() == "---" => first.len(),
        _ => return (None, content),
    };

    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return (
                Some(&content[start..offset]),
                &content[offset + line.len()..],
            );
        }
        offset += line.len();
    }
    (None, content)
}

fn parse_matter(yaml: &str) -> Result<MatterData, Error> {
    if yaml.trim().is_empty() {
        return Ok(MatterData::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| host_error(format!("Invalid front matter: {}", e)))
}

fn parse_mapping(yaml: Option<&str>) -> Result<Mapping, Error> {
    match yaml {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml)
            .map_err(|e| host_error(format!("Invalid front matter: {}", e))),
        _ => Ok(Mapping::new()),
    }
}

fn join_note(yaml: &str, body: &str) -> String {
    format!("---\n{}---\n{}", yaml, body)
}

#[async_trait]
impl Workspace for FsWorkspace {
    async fn active_note(&self) -> Result<Option<Note>, Error> {
        if !tokio::fs::try_exists(&self.note).await.unwrap_or(false) {
            warn!("Note {} does not exist", self.note.display());
            return Ok(None);
        }
        let content = self.read_note_file().await?;
        let (yaml, body) = split_front_matter(&content);
        let matter = parse_matter(yaml.unwrap_or_default())?;
        let basename = self
            .note
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Some(Note {
            path: self.relative(&self.note),
            basename,
            matter,
            body: body.to_string(),
        }))
    }

    async fn apply_front_matter(&self, note: &Note, patch: &FrontMatterPatch) -> Result<(), Error> {
        if patch.is_empty() {
            return Ok(());
        }
        let content = self.read_note_file().await?;
        let (yaml, body) = split_front_matter(&content);
        let mut mapping = parse_mapping(yaml)?;

        for (key, value) in patch.iter() {
            let key = YamlValue::String(key.to_string());
            match value {
                Some(value) => {
                    let value = serde_yaml::to_value(value)
                        .map_err(|e| host_error(format!("Invalid front matter value: {}", e)))?;
                    mapping.insert(key, value);
                }
                None => {
                    mapping.remove(&key);
                }
            }
        }

        let yaml = serde_yaml::to_string(&mapping)
            .map_err(|e| host_error(format!("Failed to write front matter: {}", e)))?;
        debug!("Updating front matter of {}", note.path);
        self.write_note_file(&join_note(&yaml, body)).await
    }

    async fn replace_body(&self, note: &Note, body: &str) -> Result<(), Error> {
        let content = self.read_note_file().await?;
        let updated = match split_front_matter(&content) {
            (Some(yaml), _) => join_note(yaml, body),
            (None, _) => body.to_string(),
        };
        debug!("Replacing body of {}", note.path);
        self.write_note_file(&updated).await
    }

    /// Looks next to the note, then at the vault root, then anywhere in the vault
    /// for a file with the same name.
    async fn resolve_attachment(&self, link: &str, _note: &Note) -> Result<Option<Attachment>, Error> {
        let link = link.trim().replace("%20", " ");
        if link.is_empty() {
            return Ok(None);
        }

        let note_dir = self.note.parent().unwrap_or(self.root.as_path());
        let found = [note_dir.join(&link), self.root.join(&link)]
            .into_iter()
            .find(|candidate| candidate.is_file());
        let found = match found {
            Some(path) => Some(path),
            None => {
                let root = self.root.clone();
                let file_name = Path::new(&link).file_name().map(|n| n.to_os_string());
                match file_name {
                    Some(file_name) => tokio::task::spawn_blocking(move || {
                        WalkDir::new(root)
                            .into_iter()
                            .filter_map(Result::ok)
                            .find(|entry| {
                                entry.file_type().is_file()
                                    && entry.file_name() == file_name.as_os_str()
                            })
                            .map(|entry| entry.into_path())
                    })
                    .await
                    .map_err(|e| host_error(format!("Attachment search failed: {}", e)))?,
                    None => None,
                }
            }
        };

        Ok(found.map(|path| Attachment {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| link.clone()),
            path: self.relative(&path),
        }))
    }

    async fn read_binary(&self, attachment: &Attachment) -> Result<Vec<u8>, Error> {
        let path = self.root.join(&attachment.path);
        tokio::fs::read(&path)
            .await
            .map_err(|e| host_error(format!("Failed to read {}: {}", path.display(), e)))
    }
}
