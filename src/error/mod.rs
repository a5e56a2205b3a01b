//! Error types for caido-mcp.

use thiserror::Error;

use crate::auth::{AuthError, GatewayErrorKind};

/// Primary error type for CLI and configuration operations.
#[derive(Error, Debug)]
pub enum CaidoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Network,
    Authentication,
    Protocol,
    Cancelled,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    RunLogin,
    CheckConfiguration,
    CheckFilePermissions,
    None,
}

impl CaidoError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Http(_) => ErrorCategory::Network,
            Self::Auth(auth) => auth_category(auth),
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(auth) => auth.is_retryable(),
            Self::Http(_) => true,
            _ => false,
        }
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        if self.is_retryable() {
            return RecoverySuggestion::RetryWithBackoff;
        }
        match self.category() {
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Storage => RecoverySuggestion::CheckFilePermissions,
            ErrorCategory::Authentication | ErrorCategory::Protocol => RecoverySuggestion::RunLogin,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Cancelled => RecoverySuggestion::None,
        }
    }
}

fn auth_category(error: &AuthError) -> ErrorCategory {
    match error {
        AuthError::StorageRead(_) | AuthError::StorageWrite(_) => ErrorCategory::Storage,
        AuthError::Gateway {
            kind: GatewayErrorKind::Network,
            ..
        } => ErrorCategory::Network,
        AuthError::Protocol(_) => ErrorCategory::Protocol,
        AuthError::Cancelled => ErrorCategory::Cancelled,
        AuthError::FlowStart { source } | AuthError::Authentication { source } => {
            match auth_category(source) {
                ErrorCategory::Cancelled => ErrorCategory::Cancelled,
                ErrorCategory::Network => ErrorCategory::Network,
                ErrorCategory::Storage => ErrorCategory::Storage,
                _ => ErrorCategory::Authentication,
            }
        }
        AuthError::Gateway { .. }
        | AuthError::IssuanceFailed(_)
        | AuthError::MissingAccessToken
        | AuthError::NotLoggedIn(_) => ErrorCategory::Authentication,
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CaidoError>;
