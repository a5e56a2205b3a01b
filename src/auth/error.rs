use std::fmt;

use thiserror::Error;

/// How the remote gateway failed.
///
/// `Network` failures are worth retrying; `Rejected` means the server refused
/// the request and the user has to authenticate again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    Network,
    Rejected,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

/// Errors produced while loading, renewing or obtaining a credential.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read credential: {0}")]
    StorageRead(String),
    #[error("Failed to write credential: {0}")]
    StorageWrite(String),
    #[error("Credential has no access token")]
    MissingAccessToken,
    #[error("Gateway error ({kind}): {message}")]
    Gateway {
        kind: GatewayErrorKind,
        message: String,
    },
    #[error("Subscription protocol error: {0}")]
    Protocol(String),
    #[error("Authentication failed: {0}")]
    IssuanceFailed(String),
    #[error("Authentication cancelled")]
    Cancelled,
    #[error("Failed to start authentication flow: {source}")]
    FlowStart {
        #[source]
        source: Box<AuthError>,
    },
    #[error("Failed to get authentication token: {source}. Run `caido-mcp login` again")]
    Authentication {
        #[source]
        source: Box<AuthError>,
    },
    #[error("{0}")]
    NotLoggedIn(String),
}

impl AuthError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Gateway {
            kind: GatewayErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Gateway {
            kind: GatewayErrorKind::Rejected,
            message: message.into(),
        }
    }

    /// Classify an HTTP failure status. Timeouts and rate limits are
    /// transient; any other 4xx means the server refused the request.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if is_refusal_status(status) {
            Self::rejected(message)
        } else {
            Self::network(message)
        }
    }

    pub fn flow_start(source: AuthError) -> Self {
        Self::FlowStart {
            source: Box::new(source),
        }
    }

    pub fn authentication(source: AuthError) -> Self {
        Self::Authentication {
            source: Box::new(source),
        }
    }

    /// Only transport-level gateway failures are retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway {
                kind: GatewayErrorKind::Network,
                ..
            }
        )
    }

    /// True if this error, or any error it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::FlowStart { source } | Self::Authentication { source } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => Self::from_status(status.as_u16(), error.to_string()),
            None => Self::network(error.to_string()),
        }
    }
}

fn is_refusal_status(status: u16) -> bool {
    (400..500).contains(&status) && status != 408 && status != 429
}
