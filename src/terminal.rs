//! Questions and notices on the terminal.

use async_trait::async_trait;
use domain::error::{host_error, Error};
use domain::host::{Notifier, Prompt, PublishDialog, PublishSelection};
use entity::post::{PostStatus, PostType};
use entity::profile::Profile;
use entity::CategoryId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

/// Answers prompts from a line-oriented reader. End of input dismisses the
/// current question.
pub struct TerminalPrompt<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl TerminalPrompt<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    async fn say(&self, text: &str) -> Result<(), Error> {
        let mut output = self.output.lock().await;
        output.write_all(text.as_bytes()).await.map_err(io_error)?;
        output.flush().await.map_err(io_error)
    }

    /// `None` at end of input.
    async fn ask(&self, question: &str) -> Result<Option<String>, Error> {
        self.say(question).await?;
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(io_error)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

fn io_error(e: std::io::Error) -> Error {
    host_error(format!("Terminal error: {}", e))
}

fn is_dismissal(answer: &str) -> bool {
    matches!(answer, "q" | "quit")
}

fn parse_categories(answer: &str) -> Option<Vec<CategoryId>> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| id.parse().ok())
        .collect()
}

#[async_trait]
impl<R, W> Prompt for TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, message: &str, confirm_text: &str, cancel_text: &str) -> Result<bool, Error> {
        let question = format!("{}\n  [y] {}  [n] {}: ", message, confirm_text, cancel_text);
        Ok(match self.ask(&question).await? {
            Some(answer) => {
                let answer = answer.to_lowercase();
                answer == "y" || answer == "yes" || answer == confirm_text.to_lowercase()
            }
            None => false,
        })
    }

    async fn choose_profile(&self, profiles: &[Profile]) -> Result<Option<String>, Error> {
        let mut listing = String::from("Choose a profile:\n");
        for (i, profile) in profiles.iter().enumerate() {
            let marker = if profile.is_default { " (default)" } else { "" };
            listing.push_str(&format!(
                "  {}) {} [{}] {}{}\n",
                i + 1,
                profile.name,
                profile.api_type,
                profile.endpoint,
                marker
            ));
        }
        self.say(&listing).await?;

        loop {
            let answer = match self.ask("Profile number or name: ").await? {
                Some(answer) if !answer.is_empty() && !is_dismissal(&answer) => answer,
                _ => return Ok(None),
            };
            if let Some(profile) = answer
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| profiles.get(i))
            {
                return Ok(Some(profile.name.clone()));
            }
            if profiles.iter().any(|p| p.name == answer) {
                return Ok(Some(answer));
            }
            self.say(&format!("No profile {}\n", answer)).await?;
        }
    }

    /// Empty answers keep the preselected value, `q` dismisses the dialog.
    async fn publish_dialog(&self, dialog: PublishDialog) -> Result<Option<PublishSelection>, Error> {
        let mut selection = PublishSelection {
            status: dialog.status,
            categories: dialog.selected_categories.clone(),
            post_type: dialog.selected_post_type.clone(),
        };

        loop {
            let question = format!("Status (draft/publish) [{}]: ", selection.status);
            match self.ask(&question).await? {
                None => return Ok(None),
                Some(answer) if is_dismissal(&answer) => return Ok(None),
                Some(answer) if answer.is_empty() => break,
                Some(answer) => match answer.parse::<PostStatus>() {
                    Ok(status) => {
                        selection.status = status;
                        break;
                    }
                    Err(e) => self.say(&format!("{}\n", e)).await?,
                },
            }
        }

        if dialog.post_types.len() > 1 {
            let names: Vec<&str> = dialog.post_types.iter().map(PostType::as_str).collect();
            loop {
                let question = format!("Post type ({}) [{}]: ", names.join("/"), selection.post_type);
                match self.ask(&question).await? {
                    None => return Ok(None),
                    Some(answer) if is_dismissal(&answer) => return Ok(None),
                    Some(answer) if answer.is_empty() => break,
                    Some(answer) if names.contains(&answer.as_str()) => {
                        selection.post_type = PostType(answer);
                        break;
                    }
                    Some(answer) => self.say(&format!("Unknown post type {}\n", answer)).await?,
                }
            }
        }

        if selection.post_type.is_post() && !dialog.categories.is_empty() {
            let mut listing = String::from("Categories:\n");
            for term in &dialog.categories {
                listing.push_str(&format!("  {}) {}\n", term.id, term.name));
            }
            self.say(&listing).await?;

            let current: Vec<String> = selection.categories.iter().map(|c| c.to_string()).collect();
            loop {
                let question = format!("Category ids, comma separated [{}]: ", current.join(","));
                match self.ask(&question).await? {
                    None => return Ok(None),
                    Some(answer) if is_dismissal(&answer) => return Ok(None),
                    Some(answer) if answer.is_empty() => break,
                    Some(answer) => match parse_categories(&answer) {
                        Some(categories) => {
                            selection.categories = categories;
                            break;
                        }
                        None => self.say("Category ids are numbers\n").await?,
                    },
                }
            }
        }

        Ok(Some(selection))
    }
}

/// Prints notices: information to stdout, errors to stderr.
#[derive(Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message);
    }
}
