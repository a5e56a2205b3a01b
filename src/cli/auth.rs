//! CLI handlers for login, token, status, and logout.
//!
//! Everything except the bearer printed by `token` goes to stderr.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::{AuthError, Authenticator, CredentialStore, NoBrowser, WebSocketTokenChannel};
use crate::client::CaidoClient;
use crate::config::CaidoConfig;
use crate::error::CaidoError;
use crate::util::cancel::deadline_token;

fn authenticator(config: &CaidoConfig, client: CaidoClient) -> Authenticator {
    let channel = WebSocketTokenChannel::new(client.websocket_endpoint());
    Authenticator::new(
        Arc::new(config.credential_store()),
        Arc::new(client),
        Arc::new(channel),
    )
}

/// Handle `caido-mcp login`.
pub async fn handle_login(
    config: &CaidoConfig,
    timeout: Option<u64>,
    no_browser: bool,
    cancel: &CancellationToken,
) -> Result<(), CaidoError> {
    let client = CaidoClient::from_config(config)?;
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.login_timeout());
    eprintln!("Authenticating with Caido at {}...", client.base_url());

    let mut auth = authenticator(config, client.clone());
    if no_browser {
        auth = auth.with_browser(Arc::new(NoBrowser));
    }

    let deadline = deadline_token(cancel, timeout);
    let token = auth.ensure_authenticated(&deadline).await?;
    deadline.cancel();

    if let Err(err) = client.with_token(token).verify_access(cancel).await {
        tracing::warn!(error = %err, "Stored token was not accepted");
        return Err(err.into());
    }

    eprintln!("Token verified successfully!");
    eprintln!("Stored at {}", config.credential_store().path().display());
    Ok(())
}

/// Handle `caido-mcp token`.
pub async fn handle_token(
    config: &CaidoConfig,
    cancel: &CancellationToken,
) -> Result<(), CaidoError> {
    let client = CaidoClient::from_config(config)?;
    let token = authenticator(config, client).access_token(cancel).await?;
    println!("{token}");
    Ok(())
}

/// Handle `caido-mcp status`.
pub fn handle_status(config: &CaidoConfig) -> Result<(), CaidoError> {
    let store = config.credential_store();
    eprintln!("Credential file: {}", store.path().display());
    eprintln!("{}", status_line(&store)?);
    Ok(())
}

/// Handle `caido-mcp logout`.
pub fn handle_logout(config: &CaidoConfig) -> Result<(), CaidoError> {
    config.credential_store().delete()?;
    eprintln!("Logged out");
    Ok(())
}

fn status_line(store: &dyn CredentialStore) -> Result<String, AuthError> {
    let Some(credential) = store.load()? else {
        return Ok("Not logged in. Run `caido-mcp login`".to_string());
    };
    let expires = credential.expires_at.format("%Y-%m-%d %H:%M UTC");
    if !store.is_expired(&credential) {
        return Ok(format!("Logged in (expires {expires})"));
    }
    let hint = if credential.refresh_token().is_some() {
        " (will refresh on next use)"
    } else {
        ""
    };
    Ok(format!("Token expired at {expires}{hint}"))
}
