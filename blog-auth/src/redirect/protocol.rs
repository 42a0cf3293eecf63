//! Custom URI scheme redirect handler.
//!
//! Host platforms that cannot open local ports deliver the redirect by invoking a
//! registered protocol handler. Such registrations cannot be removed and may fire
//! more than once for the same redirect, so the handler is a single-use latch per
//! authorization attempt: the first delivery wins and later ones are ignored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::RedirectParams;
use crate::error::{redirect_error, Error, RedirectErrorKind};

/// What happened to a delivered redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Handed to the waiting authorization attempt.
    Delivered,
    /// No attempt is waiting, or this attempt already received its redirect.
    Ignored,
}

/// Long-lived handler for redirects arriving through a custom URI scheme.
pub struct ProtocolHandler {
    redirect_uri: String,
    sender: Mutex<Option<oneshot::Sender<RedirectParams>>>,
    consumed: AtomicBool,
}

/// The receiving side of one armed attempt.
pub struct PendingRedirect {
    receiver: oneshot::Receiver<RedirectParams>,
}

impl ProtocolHandler {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            sender: Mutex::new(None),
            consumed: AtomicBool::new(true),
        }
    }

    /// The custom-scheme redirect URI, e.g. `obsidian://blogger-oauth2`.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Prepare for a new authorization attempt.
    ///
    /// A previously armed attempt that never received its redirect is abandoned; its
    /// [`PendingRedirect`] resolves with `RedirectErrorKind::Closed`.
    pub fn arm(&self) -> PendingRedirect {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.sender.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(tx);
        self.consumed.store(false, Ordering::SeqCst);
        PendingRedirect { receiver: rx }
    }

    /// Deliver a redirect URL from the host.
    ///
    /// Only the first call after [`ProtocolHandler::arm`] is delivered.
    pub fn handle(&self, url: &str) -> Result<HandleOutcome, Error> {
        let params = RedirectParams::parse(url)?;

        if self.consumed.swap(true, Ordering::SeqCst) {
            debug!("Ignoring duplicate protocol redirect");
            return Ok(HandleOutcome::Ignored);
        }

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        match sender {
            Some(tx) => match tx.send(params) {
                Ok(()) => Ok(HandleOutcome::Delivered),
                Err(_) => {
                    warn!("Protocol redirect arrived after the authorization attempt ended");
                    Ok(HandleOutcome::Ignored)
                }
            },
            None => {
                warn!("Protocol redirect arrived but no authorization is waiting");
                Ok(HandleOutcome::Ignored)
            }
        }
    }
}

impl PendingRedirect {
    /// Wait for the redirect, optionally bounded by `timeout`.
    pub async fn wait(self, timeout: Option<Duration>) -> Result<RedirectParams, Error> {
        let closed = |_| {
            redirect_error(
                RedirectErrorKind::Closed,
                "Authorization attempt was superseded before a redirect arrived",
            )
        };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.receiver)
                .await
                .map_err(|_| {
                    redirect_error(
                        RedirectErrorKind::TimedOut,
                        "Timed out waiting for the authorization redirect",
                    )
                })?
                .map_err(closed),
            None => self.receiver.await.map_err(closed),
        }
    }
}
