//! Loopback HTTP listener that captures one OAuth redirect.

use std::future::Future;
use std::time::Duration;

use pulldown_cmark_escape::{escape_html, FmtWriter};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use super::RedirectParams;
use crate::error::{redirect_error, Error, RedirectErrorKind};

const PAGE_TITLE: &str = "Blogger OAuth2";
const SUCCESS_MESSAGE: &str = "Authorization complete. You can close this window.";
/// How long one connection may take to send its request head.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Ephemeral listener on `127.0.0.1` with an OS-assigned port.
///
/// The listener is consumed by [`LoopbackListener::capture`], so the socket is
/// closed exactly once whatever the outcome.
pub struct LoopbackListener {
    listener: TcpListener,
    port: u16,
    timeout: Option<Duration>,
}

impl LoopbackListener {
    /// Bind `127.0.0.1:0`.
    pub async fn bind() -> Result<Self, Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(|e| {
            redirect_error(
                RedirectErrorKind::Bind,
                &format!("Failed to bind loopback listener: {}", e),
            )
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| {
                redirect_error(
                    RedirectErrorKind::AddressUnavailable,
                    &format!("Local server address not available: {}", e),
                )
            })?
            .port();
        info!("Listening for OAuth redirect on 127.0.0.1:{}", port);
        Ok(Self {
            listener,
            port,
            timeout: None,
        })
    }

    /// Give up waiting after `timeout`; by default the listener waits indefinitely.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The redirect URI to register in the authorize request.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Wait for the redirect to `/`, run `handler` on its parameters and answer the
    /// browser with a page describing the outcome.
    ///
    /// Connections are read concurrently, so a browser's idle preconnect cannot
    /// hold up the redirect behind it. Requests for other paths (the favicon)
    /// get a 404; empty, malformed or slow requests get a 400. Neither ends the
    /// capture. The handler's error is shown in the page and returned.
    pub async fn capture<F, Fut, T>(self, handler: F) -> Result<T, Error>
    where
        F: FnOnce(RedirectParams) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let timeout = self.timeout;
        let capture = self.serve(handler);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, capture).await.map_err(|_| {
                warn!("No OAuth redirect received within {:?}", limit);
                redirect_error(
                    RedirectErrorKind::TimedOut,
                    "Timed out waiting for the authorization redirect",
                )
            })?,
            None => capture.await,
        }
    }

    async fn serve<F, Fut, T>(self, handler: F) -> Result<T, Error>
    where
        F: FnOnce(RedirectParams) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut pending = JoinSet::new();
        let (mut socket, target) = loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (socket, peer) = accepted.map_err(|e| {
                        redirect_error(
                            RedirectErrorKind::Closed,
                            &format!("Loopback listener failed: {}", e),
                        )
                    })?;
                    debug!("Redirect connection from {}", peer);
                    pending.spawn(read_request(socket));
                }
                Some(joined) = pending.join_next() => {
                    let (mut socket, read) = match joined {
                        Ok(joined) => joined,
                        Err(e) => {
                            debug!("Redirect connection task failed: {}", e);
                            continue;
                        }
                    };
                    match read {
                        Ok(target) if target.path() == "/" => break (socket, target),
                        Ok(target) => {
                            debug!("No redirect at {}", target.path());
                            respond(&mut socket, "404 Not Found", "").await;
                        }
                        Err(e) => {
                            debug!("Ignoring bad redirect request: {}", e);
                            let page = render_page(&e.to_string());
                            respond(&mut socket, "400 Bad Request", &page).await;
                        }
                    }
                }
            }
        };
        // Connections still being read are aborted
        drop(pending);

        let result = handler(RedirectParams::from_url(&target)).await;
        let message = match &result {
            Ok(_) => SUCCESS_MESSAGE.to_string(),
            Err(e) => format!("Authorization failed: {}", e),
        };
        respond(&mut socket, "200 OK", &render_page(&message)).await;
        // Dropping `self` here closes the listener
        result
    }
}

/// Read one connection's request, giving up after [`READ_TIMEOUT`].
async fn read_request(mut socket: TcpStream) -> (TcpStream, Result<Url, Error>) {
    let read = match tokio::time::timeout(READ_TIMEOUT, read_request_target(&mut socket)).await {
        Ok(read) => read,
        Err(_) => Err(redirect_error(
            RedirectErrorKind::MalformedRequest,
            "Timed out reading request",
        )),
    };
    (socket, read)
}

/// Read the request line and resolve its target against the loopback origin.
async fn read_request_target(socket: &mut TcpStream) -> Result<Url, Error> {
    let mut reader = BufReader::new(socket);
    let mut line = String::new();
    reader.read_line(&mut line).await.map_err(|e| {
        redirect_error(
            RedirectErrorKind::MalformedRequest,
            &format!("Failed to read request: {}", e),
        )
    })?;

    // Drain headers so the client sees an orderly response
    if !line.trim().is_empty() {
        loop {
            let mut header = String::new();
            match reader.read_line(&mut header).await {
                Ok(0) => break,
                Ok(_) if header.trim().is_empty() => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }

    let mut parts = line.split_whitespace();
    let target = match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => target,
        _ => {
            return Err(redirect_error(
                RedirectErrorKind::MalformedRequest,
                &format!("Unexpected request line: {}", line.trim()),
            ))
        }
    };

    Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(target))
        .map_err(|e| {
            redirect_error(
                RedirectErrorKind::MalformedRequest,
                &format!("Invalid request target: {}", e),
            )
        })
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = socket.write_all(response.as_bytes()).await {
        warn!("Failed to answer redirect request: {}", e);
    }
    if let Err(e) = socket.shutdown().await {
        debug!("Failed to close redirect connection: {}", e);
    }
}

fn render_page(message: &str) -> String {
    format!(
        "<html>\n<head>\n  <title>{title}</title>\n</head>\n<body>\n  <h1>{title}</h1>\n  <p>{message}</p>\n</body>\n</html>",
        title = PAGE_TITLE,
        message = escaped(message)
    )
}

fn escaped(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    match escape_html(FmtWriter(&mut out), text) {
        Ok(()) => out,
        Err(_) => String::new(),
    }
}
