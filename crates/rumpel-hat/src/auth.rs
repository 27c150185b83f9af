//! HAT login and credential storage
//!
//! ## Components
//!
//! - [`KeyringCredentialStore`] - Token storage in the system keyring
//! - [`LocalCallbackServer`] - Minimal HTTP server for the login redirect
//! - [`login_url`] - Builds the `hatlogin` URL for a domain
//! - [`BrowserAuthSurface`] - Opens the browser and waits for the token

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rumpel_core::domain::{AccessToken, HatDomain};
use rumpel_core::ports::{AuthResult, AuthSurface, CredentialStore, USER_TOKEN_KEY};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// Keyring service name for stored credentials
pub const KEYRING_SERVICE: &str = "rumpel";

/// Path the login redirect is sent to
const CALLBACK_PATH: &str = "/callback";

// ============================================================================
// KeyringCredentialStore
// ============================================================================

/// Stores secrets in the system keyring
///
/// The user token is stored with the HAT domain as the keyring username;
/// any other key is stored as `{domain}/{key}`.
pub struct KeyringCredentialStore {
    service: String,
    domain: String,
}

impl KeyringCredentialStore {
    pub fn new(domain: &HatDomain) -> Self {
        Self::with_service(KEYRING_SERVICE, domain)
    }

    pub fn with_service(service: impl Into<String>, domain: &HatDomain) -> Self {
        Self {
            service: service.into(),
            domain: domain.as_str().to_string(),
        }
    }

    fn username(&self, key: &str) -> String {
        if key == USER_TOKEN_KEY {
            self.domain.clone()
        } else {
            format!("{}/{}", self.domain, key)
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.username(key))
            .context("Failed to create keyring entry")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                debug!(key, domain = %self.domain, "Loaded credential from keyring");
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(key, domain = %self.domain, "No credential in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store credential in keyring")?;
        debug!(key, domain = %self.domain, "Stored credential in keyring");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                info!(key, domain = %self.domain, "Cleared credential from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// Login URL
// ============================================================================

/// Builds `https://{domain}/hatlogin?name={service}&redirect={redirect}`
pub fn login_url(domain: &HatDomain, service_name: &str, redirect: &str) -> Result<String> {
    let url = url::Url::parse_with_params(
        &format!("{}/hatlogin", domain.base_url()),
        &[("name", service_name), ("redirect", redirect)],
    )
    .context("Failed to build HAT login URL")?;
    Ok(url.to_string())
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// What the login redirect carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The HAT issued a token
    Token(AccessToken),
    /// The redirect arrived without a token (login refused or abandoned)
    Denied,
}

/// HTTP listener on `127.0.0.1` receiving the login redirect
///
/// Binding happens before the browser is opened, so the redirect can never
/// race the listener.
pub struct LocalCallbackServer {
    listener: TcpListener,
    port: u16,
}

impl LocalCallbackServer {
    /// Binds the listener; port `0` picks a free port
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind callback server to 127.0.0.1:{port}"))?;
        let port = listener
            .local_addr()
            .context("Failed to read callback server address")?
            .port();

        info!(port, "Login callback server listening");
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The URL the HAT should redirect to
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    /// Serves connections until one request to the callback path arrives
    ///
    /// Other paths (e.g. `/favicon.ico`) get a 404 and are ignored.
    pub async fn wait(self) -> Result<CallbackOutcome> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::header::{HeaderValue, CONTENT_TYPE};
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;

        let (tx, mut rx) = oneshot::channel::<CallbackOutcome>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        loop {
            tokio::select! {
                received = &mut rx => {
                    let outcome = received
                        .context("Callback server channel closed without a result")?;
                    info!(authorized = matches!(outcome, CallbackOutcome::Token(_)), "Received login callback");
                    return Ok(outcome);
                }
                accepted = self.listener.accept() => {
                    let (stream, _addr) = accepted
                        .context("Failed to accept connection on callback server")?;
                    let io = TokioIo::new(stream);
                    let tx = tx.clone();

                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let uri = req.uri().to_string();
                            debug!(path = %req.uri().path(), "Callback server received request");

                            let (status, html) = match parse_callback(&uri) {
                                Some(outcome) => {
                                    let html = match outcome {
                                        CallbackOutcome::Token(_) => success_html(),
                                        CallbackOutcome::Denied => {
                                            error_html("The HAT did not return a token")
                                        }
                                    };
                                    if let Some(sender) = tx.lock().await.take() {
                                        let _ = sender.send(outcome);
                                    }
                                    (StatusCode::OK, html)
                                }
                                None => (StatusCode::NOT_FOUND, error_html("Unknown page")),
                            };

                            let mut response = Response::new(Full::new(Bytes::from(html)));
                            *response.status_mut() = status;
                            response.headers_mut().insert(
                                CONTENT_TYPE,
                                HeaderValue::from_static("text/html; charset=utf-8"),
                            );
                            Ok::<_, hyper::Error>(response)
                        }
                    });

                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            warn!("Callback server connection error: {}", e);
                        }
                    });
                }
            }
        }
    }
}

/// Reads the callback outcome from a request URI
///
/// `None` for requests outside the callback path.
fn parse_callback(uri: &str) -> Option<CallbackOutcome> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let token = url
        .query_pairs()
        .find(|(key, _)| *key == "token")
        .and_then(|(_, value)| AccessToken::new(value.into_owned()).ok());

    Some(match token {
        Some(token) => CallbackOutcome::Token(token),
        None => CallbackOutcome::Denied,
    })
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Rumpel - Logged in</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Logged in</h1>
    <p>Your HAT accepted the login. You can close this window and return to Rumpel.</p>
    <script>setTimeout(function() { window.close(); }, 3000);</script>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Rumpel - Login failed</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Login failed</h1>
    <p>{}</p>
    <p>Close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// BrowserAuthSurface
// ============================================================================

/// Interactive HAT login through the system browser
///
/// 1. Binds the local callback server
/// 2. Opens `https://{domain}/hatlogin` with the callback as redirect
/// 3. Waits for the redirect, up to the login timeout
pub struct BrowserAuthSurface {
    service_name: String,
    callback_port: u16,
    timeout: Duration,
}

impl BrowserAuthSurface {
    pub fn new(service_name: impl Into<String>, callback_port: u16, timeout: Duration) -> Self {
        Self {
            service_name: service_name.into(),
            callback_port,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl AuthSurface for BrowserAuthSurface {
    async fn reauthorize(&self, domain: &HatDomain) -> Result<AuthResult> {
        info!(%domain, "Starting HAT login");

        // Step 1: Listen for the redirect
        let server = LocalCallbackServer::bind(self.callback_port).await?;

        // Step 2: Open the login page
        let url = login_url(domain, &self.service_name, &server.redirect_uri())?;
        if let Err(e) = webbrowser::open(&url) {
            warn!(error = %e, %url, "Could not open a browser, open the login URL manually");
        }

        // Step 3: Wait for the HAT to send the user back
        match tokio::time::timeout(self.timeout, server.wait()).await {
            Ok(outcome) => match outcome? {
                CallbackOutcome::Token(token) => {
                    info!(%domain, "HAT login completed");
                    Ok(AuthResult::Authorized(token))
                }
                CallbackOutcome::Denied => {
                    info!(%domain, "HAT login returned without a token");
                    Ok(AuthResult::Cancelled)
                }
            },
            Err(_) => {
                warn!(%domain, timeout_secs = self.timeout.as_secs(), "HAT login timed out");
                Ok(AuthResult::Cancelled)
            }
        }
    }
}
