//! Configuration system (layered: explicit > env > `.env` > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{CredentialStoreConfig, FileCredentialStore};
use crate::error::CaidoError;

pub const ENV_URL: &str = "CAIDO_URL";
pub const ENV_HOME: &str = "CAIDO_MCP_HOME";
pub const ENV_LOGIN_TIMEOUT: &str = "CAIDO_LOGIN_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT: &str = "CAIDO_REQUEST_TIMEOUT_SECS";

const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime configuration for the authentication flow.
///
/// Resolution order:
/// 1. Explicit setters (CLI flags)
/// 2. Environment variables (`CAIDO_URL`, `CAIDO_MCP_HOME`, ...)
/// 3. A `.env` file in the working directory
/// 4. Built-in defaults
#[derive(Debug, Clone)]
pub struct CaidoConfig {
    base_url: Option<String>,
    credential_dir: PathBuf,
    login_timeout: Duration,
    request_timeout: Duration,
}

impl Default for CaidoConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CaidoConfig {
    /// Defaults only; no environment lookups.
    pub fn new() -> Self {
        Self {
            base_url: None,
            credential_dir: CredentialStoreConfig::default_dir(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = Some(url);
        }
        if let Some(dir) = lookup(ENV_HOME).filter(|v| !v.trim().is_empty()) {
            config.credential_dir = PathBuf::from(dir);
        }
        if let Some(timeout) = lookup(ENV_LOGIN_TIMEOUT).and_then(|v| parse_secs(ENV_LOGIN_TIMEOUT, &v)) {
            config.login_timeout = timeout;
        }
        if let Some(timeout) =
            lookup(ENV_REQUEST_TIMEOUT).and_then(|v| parse_secs(ENV_REQUEST_TIMEOUT, &v))
        {
            config.request_timeout = timeout;
        }
        config
    }

    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.base_url = Some(url.into());
    }

    pub fn set_credential_dir(&mut self, dir: impl Into<PathBuf>) {
        self.credential_dir = dir.into();
    }

    pub fn set_login_timeout(&mut self, timeout: Duration) {
        self.login_timeout = timeout;
    }

    /// The configured instance URL, normalized.
    pub fn base_url(&self) -> Result<String, CaidoError> {
        let raw = self.base_url.as_deref().ok_or_else(|| {
            CaidoError::Configuration(format!(
                "Caido URL is required. Set --url or the {ENV_URL} environment variable"
            ))
        })?;
        normalize_base_url(raw)
    }

    pub fn graphql_endpoint(&self) -> Result<String, CaidoError> {
        Ok(graphql_endpoint_for(&self.base_url()?))
    }

    pub fn websocket_endpoint(&self) -> Result<String, CaidoError> {
        Ok(websocket_endpoint_for(&self.base_url()?))
    }

    pub fn credential_dir(&self) -> &PathBuf {
        &self.credential_dir
    }

    pub fn login_timeout(&self) -> Duration {
        self.login_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn credential_store(&self) -> FileCredentialStore {
        FileCredentialStore::new(CredentialStoreConfig::new(self.credential_dir.clone()))
    }
}

fn parse_secs(key: &str, value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!(key, value, "Ignoring invalid timeout");
            None
        }
    }
}

/// Trim whitespace and trailing slashes; only http(s) URLs are accepted.
pub fn normalize_base_url(raw: &str) -> Result<String, CaidoError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let lower = trimmed.to_ascii_lowercase();
    let has_host = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .map(|rest| !rest.is_empty())
        .unwrap_or(false);
    if !has_host {
        return Err(CaidoError::Configuration(format!(
            "Invalid Caido URL '{raw}': expected http://host[:port] or https://host[:port]"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn graphql_endpoint_for(base_url: &str) -> String {
    format!("{}/graphql", base_url.trim_end_matches('/'))
}

/// Subscription endpoint: `http` becomes `ws`, `https` becomes `wss`.
pub fn websocket_endpoint_for(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let mapped = if let Some(rest) = strip_scheme(base, "https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = strip_scheme(base, "http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{mapped}/ws/graphql")
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = url.get(..scheme.len())?;
    if prefix.eq_ignore_ascii_case(scheme) {
        url.get(scheme.len()..)
    } else {
        None
    }
}
