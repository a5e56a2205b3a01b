use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::browser::{BrowserLauncher, SystemBrowser};
use super::error::AuthError;
use super::gateway::AuthGateway;
use super::prompt::{LoginPrompt, StderrPrompt};
use super::store::CredentialStore;
use super::subscription::TokenChannel;
use crate::util::retry::RetryPolicy;

const NOT_LOGGED_IN: &str = "No authentication token found. Run `caido-mcp login` first";

/// Decides which credential to hand out: the stored one, a refreshed one, or
/// one obtained through a new device-flow login.
///
/// Collaborators are injected so the policy can run against in-memory fakes.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use caido_mcp::auth::{Authenticator, FileCredentialStore, WebSocketTokenChannel};
/// use caido_mcp::client::CaidoClient;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), caido_mcp::error::CaidoError> {
/// let client = CaidoClient::new("http://localhost:8080")?;
/// let channel = WebSocketTokenChannel::new(client.websocket_endpoint());
/// let auth = Authenticator::new(
///     Arc::new(FileCredentialStore::new_default()),
///     Arc::new(client),
///     Arc::new(channel),
/// );
/// let bearer = auth.ensure_authenticated(&CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    gateway: Arc<dyn AuthGateway>,
    channel: Arc<dyn TokenChannel>,
    prompt: Arc<dyn LoginPrompt>,
    browser: Arc<dyn BrowserLauncher>,
    retry: RetryPolicy,
    guard: Mutex<()>,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        gateway: Arc<dyn AuthGateway>,
        channel: Arc<dyn TokenChannel>,
    ) -> Self {
        Self {
            store,
            gateway,
            channel,
            prompt: Arc::new(StderrPrompt),
            browser: Arc::new(SystemBrowser),
            retry: RetryPolicy::default(),
            guard: Mutex::new(()),
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn LoginPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    /// Retry policy for the refresh call in [`access_token`](Self::access_token).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Return a usable access token, logging in interactively if needed.
    ///
    /// The common path is a single store read. An expired credential is
    /// refreshed when possible; a failed refresh falls back to the device
    /// flow instead of failing.
    pub async fn ensure_authenticated(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, AuthError> {
        let _guard = self.guard.lock().await;

        if let Some(stored) = self.store.load()? {
            if !self.store.is_expired(&stored) {
                tracing::debug!(expires_at = %stored.expires_at, "Using stored credential");
                return Ok(stored.access_token);
            }
            match stored.refresh_token() {
                Some(refresh_token) => match self.gateway.refresh(cancel, refresh_token).await {
                    Ok(refreshed) => {
                        self.store.save(&refreshed)?;
                        tracing::info!(expires_at = %refreshed.expires_at, "Refreshed credential");
                        return Ok(refreshed.access_token);
                    }
                    Err(AuthError::Cancelled) => return Err(AuthError::Cancelled),
                    Err(error) => {
                        tracing::warn!(%error, "Token refresh failed; starting a new login");
                    }
                },
                None => tracing::info!("Stored credential expired and cannot be refreshed"),
            }
        }

        self.device_flow(cancel).await
    }

    async fn device_flow(&self, cancel: &CancellationToken) -> Result<String, AuthError> {
        let request = self
            .gateway
            .start_device_flow(cancel)
            .await
            .map_err(AuthError::flow_start)?;
        tracing::info!(
            request_id = %request.id,
            expires_at = %request.expires_at,
            "Waiting for device authorization"
        );

        self.prompt.show_instructions(&request);
        if let Err(error) = self.browser.open(&request.verification_url) {
            tracing::debug!(%error, "Could not open browser");
            self.prompt.browser_unavailable(&request.verification_url);
        }

        let credential = self
            .channel
            .await_token(&request.id, cancel)
            .await
            .map_err(AuthError::authentication)?;

        self.store.save(&credential)?;
        self.prompt.authenticated();
        Ok(credential.access_token)
    }

    /// Non-interactive accessor for long-running processes.
    ///
    /// Never starts a device flow: without a stored credential, or with an
    /// expired one that has no refresh token, it fails with
    /// [`AuthError::NotLoggedIn`]. A refreshed credential that cannot be
    /// saved is still returned.
    pub async fn access_token(&self, cancel: &CancellationToken) -> Result<String, AuthError> {
        let _guard = self.guard.lock().await;

        let stored = self
            .store
            .load()?
            .ok_or_else(|| AuthError::NotLoggedIn(NOT_LOGGED_IN.to_string()))?;
        if !self.store.is_expired(&stored) {
            return Ok(stored.access_token);
        }

        let refresh_token = stored.refresh_token().ok_or_else(|| {
            AuthError::NotLoggedIn(
                "Authentication token expired and cannot be refreshed. Run `caido-mcp login` again"
                    .to_string(),
            )
        })?;

        let refreshed = self
            .retry
            .execute(cancel, || self.gateway.refresh(cancel, refresh_token))
            .await
            .map_err(|error| match error {
                AuthError::Cancelled => AuthError::Cancelled,
                other => AuthError::authentication(other),
            })?;

        if let Err(error) = self.store.save(&refreshed) {
            tracing::warn!(%error, "Failed to save refreshed credential");
        } else {
            tracing::info!(expires_at = %refreshed.expires_at, "Refreshed credential");
        }
        Ok(refreshed.access_token)
    }
}
