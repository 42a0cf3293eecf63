//! Launching the user's system browser.

use tracing::debug;

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Opens URLs outside the process.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> Result<(), Error>;
}

/// Uses the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), Error> {
        debug!("Opening browser at {}", url);
        webbrowser::open(url).map_err(|e| {
            oauth_error(
                OAuthErrorKind::BrowserLaunch,
                &format!("Failed to open browser: {}", e),
            )
        })
    }
}
